use super::helpers::{compile, execute};
use sable_types::Value;

#[test]
fn test_for_loop() {
    let src = "let a = 0; for (let i = 0; i < 10; i++) a++; return a";
    assert_eq!(execute(src).unwrap(), Value::Int(10));
}

#[test]
fn test_while_with_break_and_continue() {
    let src = r#"
        let i = 0
        let sum = 0
        while (true) {
            i++
            if (i > 10) break
            if (i % 2 == 0) continue
            sum += i
        }
        return sum
    "#;
    assert_eq!(execute(src).unwrap(), Value::Int(25));
}

#[test]
fn test_for_of_and_for_in() {
    let src = r#"
        let total = 0
        for (let v of [1, 2, 3]) total += v
        for (let k in [10, 20]) total += k
        return total
    "#;
    assert_eq!(execute(src).unwrap(), Value::Int(7));
}

#[test]
fn test_for_in_over_map() {
    let src = r#"
        let m = {a: 1, b: 2, c: 3}
        let sum = 0
        for (let k in m) sum += m[k]
        return sum
    "#;
    assert_eq!(execute(src).unwrap(), Value::Int(6));
}

#[test]
fn test_labeled_break() {
    let src = r#"
        let count = 0
        outer: for (let i = 0; i < 5; i++) {
            for (let j = 0; j < 5; j++) {
                if (j == 2) continue outer
                if (i == 3) break outer
                count++
            }
        }
        return count
    "#;
    assert_eq!(execute(src).unwrap(), Value::Int(6));
}

#[test]
fn test_if_else_chain() {
    let src = r#"
        function grade(n) {
            if (n > 90) {
                return "a"
            } else if (n > 80) {
                return "b"
            } else {
                return "c"
            }
        }
        return grade(95) + grade(85) + grade(10)
    "#;
    assert_eq!(execute(src).unwrap(), Value::from("abc"));
}

#[test]
fn test_switch() {
    let src = r#"
        function name(n) {
            let r = ""
            switch (n) {
                case 1:
                    r = "one"
                    break
                case 2:
                case 3:
                    r = "few"
                    break
                default:
                    r = "many"
            }
            return r
        }
        return name(1) + name(3) + name(9)
    "#;
    assert_eq!(execute(src).unwrap(), Value::from("onefewmany"));
}

#[test]
fn test_duplicate_case_is_rejected() {
    let err = execute("switch (1) { case 1: break; case 1: break }").unwrap_err();
    assert!(err.contains("Duplicate case"), "{}", err);
}

#[test]
fn test_block_scopes() {
    let src = r#"
        let a = 1
        {
            let a = 2
            a++
        }
        return a
    "#;
    assert_eq!(execute(src).unwrap(), Value::Int(1));
}

#[test]
fn test_scope_end_never_precedes_declaration() {
    let src = r#"
        let a = 1
        if (a) {
            a = 2
            const k = 3
        }
        function f(x) {
            for (let i = 0; i < x; i++) { const j = i }
            { const empty = 1 }
            return x
        }
        return a + f(2)
    "#;
    let program = compile(src).unwrap();
    for f in &program.functions {
        for r in &f.registers {
            assert!(
                r.end_pc.map_or(true, |end| end >= r.start_pc),
                "{}.{} lives in [{}, {:?})",
                f.name,
                r.name,
                r.start_pc,
                r.end_pc
            );
        }
    }
    assert_eq!(execute(src).unwrap(), Value::Int(4));
}
