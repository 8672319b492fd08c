//! Parser tests for operators, literals and postfix chains

use sable_parser::ast::{BinaryOp, Literal, MapKey, Stmt, UnaryOp};
use sable_parser::{parse, Expr};

fn expr(source: &str) -> Expr {
    let result = parse(source);
    assert!(result.is_ok(), "Failed to parse: {:?}", result.err());
    match result.unwrap().stmts.into_iter().next() {
        Some(Stmt::Expr(e)) => e,
        other => panic!("Expected expression statement, got {:?}", other),
    }
}

fn int(e: &Expr) -> i64 {
    match e {
        Expr::Constant { value: Literal::Int(v), .. } => *v,
        other => panic!("Expected int constant, got {:?}", other),
    }
}

#[test]
fn test_precedence() {
    match expr("1 + 2 * 3") {
        Expr::Binary { op: BinaryOp::Add, left, right, .. } => {
            assert_eq!(int(&left), 1);
            assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. }));
        }
        other => panic!("Expected addition, got {:?}", other),
    }

    match expr("a || b && c") {
        Expr::Binary { op: BinaryOp::Or, right, .. } => {
            assert!(matches!(*right, Expr::Binary { op: BinaryOp::And, .. }));
        }
        other => panic!("Expected ||, got {:?}", other),
    }
}

#[test]
fn test_power_is_right_associative() {
    match expr("2 ** 3 ** 2") {
        Expr::Binary { op: BinaryOp::Pow, left, right, .. } => {
            assert_eq!(int(&left), 2);
            assert!(matches!(*right, Expr::Binary { op: BinaryOp::Pow, .. }));
        }
        other => panic!("Expected power, got {:?}", other),
    }
}

#[test]
fn test_longest_operator_wins() {
    assert!(matches!(expr("a === b"), Expr::Binary { op: BinaryOp::StrictEq, .. }));
    assert!(matches!(expr("a !== b"), Expr::Binary { op: BinaryOp::StrictNotEq, .. }));
    assert!(matches!(expr("a <= b"), Expr::Binary { op: BinaryOp::LessEq, .. }));
    assert!(matches!(expr("a << b"), Expr::Binary { op: BinaryOp::Shl, .. }));
    assert!(matches!(expr("a >= b"), Expr::Binary { op: BinaryOp::GreaterEq, .. }));
    assert!(matches!(expr("a ?? b"), Expr::Binary { op: BinaryOp::Nullish, .. }));
    assert!(matches!(expr("a - -b"), Expr::Binary { op: BinaryOp::Sub, .. }));
}

#[test]
fn test_unary_and_ternary() {
    match expr("!a ? -1 : ~2") {
        Expr::Ternary { cond, then, otherwise, .. } => {
            assert!(matches!(*cond, Expr::Unary { op: UnaryOp::Not, .. }));
            assert!(matches!(*then, Expr::Unary { op: UnaryOp::Neg, .. }));
            assert!(matches!(*otherwise, Expr::Unary { op: UnaryOp::BitNot, .. }));
        }
        other => panic!("Expected ternary, got {:?}", other),
    }
}

#[test]
fn test_number_literals() {
    assert_eq!(int(&expr("0x1F")), 31);
    assert_eq!(int(&expr("0010")), 8);
    assert_eq!(int(&expr("1_000")), 1000);
    assert!(matches!(expr("1.5e3"), Expr::Constant { value: Literal::Float(f), .. } if f == 1500.0));
}

#[test]
fn test_string_literals() {
    assert!(matches!(
        expr("\"a\\tb\""),
        Expr::Constant { value: Literal::Str(s), .. } if s == "a\tb"
    ));
    assert!(matches!(
        expr("'ab'"),
        Expr::Constant { value: Literal::Str(s), .. } if s == "ab"
    ));
    assert!(matches!(
        expr("`x`"),
        Expr::Constant { value: Literal::Str(s), .. } if s == "x"
    ));
}

#[test]
fn test_optional_chain_marks_first_link() {
    match expr("a?.b.c") {
        Expr::Selector { object, optional, first, name, .. } => {
            assert_eq!(name, "c");
            assert!(!optional);
            assert!(first);
            assert!(matches!(*object, Expr::Selector { optional: true, first: false, .. }));
        }
        other => panic!("Expected selector, got {:?}", other),
    }

    match expr("a.b(1)") {
        Expr::Call { first, optional, .. } => {
            assert!(!first);
            assert!(!optional);
        }
        other => panic!("Expected call, got {:?}", other),
    }

    assert!(matches!(expr("f?.(1)"), Expr::Call { optional: true, first: true, .. }));
    assert!(matches!(expr("m?.[k]"), Expr::Index { optional: true, first: true, .. }));
}

#[test]
fn test_call_with_spread() {
    match expr("f(1, ...rest)") {
        Expr::Call { args, spread, .. } => {
            assert_eq!(args.len(), 2);
            assert!(spread);
        }
        other => panic!("Expected call, got {:?}", other),
    }
    assert!(parse("f(...a, b)").is_err());
}

#[test]
fn test_collections() {
    match expr("[1, [2], {a: 1, \"b\": 2, 3: 4, [k]: 5, c}]") {
        Expr::Array { items, .. } => {
            assert_eq!(items.len(), 3);
            match &items[2] {
                Expr::Map { entries, .. } => {
                    assert_eq!(entries.len(), 5);
                    assert_eq!(entries[0].0, MapKey::Str("a".into()));
                    assert_eq!(entries[1].0, MapKey::Str("b".into()));
                    assert_eq!(entries[2].0, MapKey::Int(3));
                    assert!(matches!(entries[3].0, MapKey::Expr(_)));
                    assert!(matches!(&entries[4].1, Expr::Ident { name, .. } if name == "c"));
                }
                other => panic!("Expected map, got {:?}", other),
            }
        }
        other => panic!("Expected array, got {:?}", other),
    }
}

#[test]
fn test_functions_and_new() {
    match expr("(a, b) => a + b") {
        Expr::Function(f) => {
            assert_eq!(f.params.len(), 2);
            assert!(matches!(f.body[0], Stmt::Return { value: Some(_), .. }));
        }
        other => panic!("Expected function, got {:?}", other),
    }

    assert!(matches!(expr("x => { return x }"), Expr::Function(_)));
    assert!(matches!(expr("function (n: number) { return n }"), Expr::Function(_)));

    match expr("new pkg.Point(1, 2)") {
        Expr::New { class, args, .. } => {
            assert_eq!(args.len(), 2);
            assert!(matches!(*class, Expr::Selector { .. }));
        }
        other => panic!("Expected new, got {:?}", other),
    }
}

#[test]
fn test_keywords_are_not_identifiers() {
    assert!(parse("let if = 1").is_err());
    // but property names can be anything
    assert!(matches!(expr("a.default"), Expr::Selector { .. }));
    // and identifiers may start with a keyword
    assert!(matches!(expr("letter"), Expr::Ident { .. }));
}
