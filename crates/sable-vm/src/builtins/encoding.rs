//! JSON encoding

use crate::error::VmError;
use crate::vm::Vm;
use sable_types::Value;

/// `JSON.stringify(value)` through the value's export tree.
pub fn vm_json_stringify(_vm: &mut Vm, _this: &Value, args: &[Value]) -> Result<Value, VmError> {
    let json = args[0].export(0);
    serde_json::to_string(&json)
        .map(Value::from)
        .map_err(|e| VmError::new(format!("JSON.stringify: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::NativeRegistry;
    use crate::bytecode::Program;
    use sable_types::sync::Arc;
    use std::collections::HashMap;

    #[test]
    fn test_stringify_nested() {
        let mut vm = Vm::new(Arc::new(Program::new(Arc::new(NativeRegistry::new()))));
        let mut m = HashMap::new();
        m.insert(Value::from("a"), Value::array(vec![Value::Int(1), Value::Null]));
        let out = vm_json_stringify(&mut vm, &Value::Null, &[Value::map(m)]).unwrap();
        assert_eq!(out.to_string(), r#"{"a":[1,null]}"#);
    }
}
