use super::helpers::{execute, run_error};
use sable_types::Value;

#[test]
fn test_constructor_and_method() {
    let source = r#"
        class Point {
            x = 0
            y = 0
            constructor(x, y) {
                this.x = x
                this.y = y
            }
            sum() {
                return this.x + this.y
            }
        }
        let p = new Point(3, 4)
        return p.sum()
    "#;
    assert_eq!(execute(source).unwrap(), Value::Int(7));
}

#[test]
fn test_field_initializers_without_constructor() {
    let source = r#"
        class Box {
            value = 10
            tags = []
        }
        let a = new Box()
        let b = new Box()
        a.tags.push(1)
        return a.value + b.tags.length
    "#;
    assert_eq!(execute(source).unwrap(), Value::Int(10));
}

#[test]
fn test_empty_class() {
    let source = r#"
        class Empty {}
        let e = new Empty()
        e.extra = 5
        return e.extra
    "#;
    assert_eq!(execute(source).unwrap(), Value::Int(5));
}

#[test]
fn test_private_field() {
    let source = r#"
        class Account {
            private secret = 1
            reveal() {
                return this.secret
            }
        }
        let a = new Account()
        return a.secret
    "#;
    assert_eq!(run_error(source), "Attempted to access a private field: secret");
}

#[test]
fn test_private_members_inside_class() {
    let source = r#"
        class Account {
            private secret = 20
            private double() {
                return this.secret * 2
            }
            reveal() {
                return this.double() + 2
            }
        }
        return new Account().reveal()
    "#;
    assert_eq!(execute(source).unwrap(), Value::Int(42));
}

#[test]
fn test_private_method() {
    let source = r#"
        class Account {
            private double() {
                return 2
            }
        }
        let a = new Account()
        return a.double()
    "#;
    assert_eq!(run_error(source), "Attempted to access a private method: double");
}

#[test]
fn test_method_as_value() {
    let source = r#"
        class Counter {
            n = 1
            next() {
                this.n++
                return this.n
            }
        }
        let c = new Counter()
        let f = c.next
        f()
        return f()
    "#;
    assert_eq!(execute(source).unwrap(), Value::Int(3));
}

#[test]
fn test_enum_values() {
    let source = r#"
        enum Color { Red, Green = 5, Blue }
        return Color.Blue * 100 + Color.Green * 10 + Color[0]
    "#;
    assert_eq!(execute(source).unwrap(), Value::Int(650));
}

#[test]
fn test_string_enum() {
    let source = r#"
        enum Mode { Read = "r", Write = "w" }
        return Mode.Read + Mode.Write
    "#;
    assert_eq!(execute(source).unwrap(), Value::from("rw"));
}

#[test]
fn test_enum_out_of_range() {
    let err = run_error("enum Color { Red }\nreturn Color[3]");
    assert_eq!(err, "invalid enum index: Color 3 [1]");
}

#[test]
fn test_enum_invalid_key() {
    let err = execute("enum Color { Red }\nreturn Color.Pink").unwrap_err();
    assert!(err.contains("Invalid enum key: Color.Pink"), "{}", err);
}
