use super::helpers::execute_modules;
use sable_types::Value;

#[test]
fn test_call_imported_function() {
    let result = execute_modules(&[
        ("/foo.ts", "export function bar() { return 42 }"),
        ("/main.ts", "import \"./foo\"\nfunction main() { return foo.bar() }"),
    ]);
    assert_eq!(result.unwrap(), Value::Int(42));
}

#[test]
fn test_star_import_alias() {
    let result = execute_modules(&[
        ("/lib/math.ts", "export let base = 5\nexport function twice(x) { return x * 2 }"),
        (
            "/main.ts",
            "import * as m from \"./lib/math\"\nfunction main() { return m.twice(m.base) }",
        ),
    ]);
    assert_eq!(result.unwrap(), Value::Int(10));
}

#[test]
fn test_named_import() {
    let result = execute_modules(&[
        ("/foo.ts", "export function bar() { return 3 }"),
        ("/main.ts", "import { bar } from \"./foo\"\nfunction main() { return bar() + 1 }"),
    ]);
    assert_eq!(result.unwrap(), Value::Int(4));
}

#[test]
fn test_not_exported() {
    let err = execute_modules(&[
        ("/foo.ts", "function bar() { return 1 }"),
        ("/main.ts", "import \"./foo\"\nfoo.bar()"),
    ])
    .unwrap_err();
    assert!(err.contains("is not exported"), "{}", err);
}

#[test]
fn test_undeclared_member() {
    let err = execute_modules(&[
        ("/foo.ts", "export function bar() { return 1 }"),
        ("/main.ts", "import \"./foo\"\nfoo.baz()"),
    ])
    .unwrap_err();
    assert!(err.contains("Undeclared identifier"), "{}", err);
}

#[test]
fn test_module_init_runs_before_main() {
    let result = execute_modules(&[
        ("/foo.ts", "export let v = 0\nfunction init() { v = 7 }"),
        ("/main.ts", "import \"./foo\"\nfunction main() { return foo.v }"),
    ]);
    assert_eq!(result.unwrap(), Value::Int(7));
}

#[test]
fn test_module_globals_are_private() {
    let result = execute_modules(&[
        ("/foo.ts", "let count = 0\nexport function next() { count++; return count }"),
        ("/main.ts", "import \"./foo\"\nfunction main() { foo.next(); return foo.next() }"),
    ]);
    assert_eq!(result.unwrap(), Value::Int(2));
}

#[test]
fn test_missing_module() {
    let err = execute_modules(&[("/main.ts", "import \"./nope\"\nfunction main() { }")]).unwrap_err();
    assert!(err.starts_with("Parse error"), "{}", err);
}
