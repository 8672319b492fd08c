use super::helpers::execute;
use sable_types::Value;

#[test]
fn test_counter() {
    let src = r#"
        function counter() {
            let n = 0
            return () => {
                n++
                return n
            }
        }
        let c = counter()
        let first = c()
        let second = c()
        return first * 10 + second
    "#;
    assert_eq!(execute(src).unwrap(), Value::Int(12));
}

#[test]
fn test_counters_are_independent() {
    let src = r#"
        function counter() {
            let n = 0
            return () => { n++; return n }
        }
        let a = counter()
        let b = counter()
        a()
        a()
        return a() * 10 + b()
    "#;
    assert_eq!(execute(src).unwrap(), Value::Int(31));
}

#[test]
fn test_closures_share_variables() {
    let src = r#"
        function pair() {
            let v = 1
            let get = () => v
            let set = (x) => { v = x }
            return [get, set]
        }
        let p = pair()
        let get = p[0]
        let set = p[1]
        set(7)
        return get()
    "#;
    assert_eq!(execute(src).unwrap(), Value::Int(7));
}

#[test]
fn test_nested_capture() {
    let src = r#"
        function outer() {
            let a = 1
            function middle() {
                let b = 2
                return () => a + b
            }
            return middle()
        }
        return outer()()
    "#;
    assert_eq!(execute(src).unwrap(), Value::Int(3));
}

#[test]
fn test_recursive_closure() {
    let src = r#"
        function outer() {
            let base = 10
            function sum(n) {
                if (n == 0) return base
                return n + sum(n - 1)
            }
            return sum(3)
        }
        return outer()
    "#;
    assert_eq!(execute(src).unwrap(), Value::Int(16));
}
