//! A compiled program: every function, class, enum and constant of a module
//! graph, plus the native functions it was compiled against.

use super::address::Address;
use super::function::{find_attribute, parse_permissions, Class, EnumList, Function};
use crate::builtins::NativeRegistry;
use parking_lot::Mutex;
use sable_types::sync::Arc;
use sable_types::{TraceLine, Value};
use std::collections::HashMap;

pub struct Program {
    pub functions: Vec<Function>,
    pub classes: Vec<Class>,
    pub enums: Vec<EnumList>,
    pub constants: Vec<Value>,
    /// Source files referenced by instruction positions.
    pub files: Vec<String>,
    /// Attributes of every compiled file.
    pub attributes: Vec<String>,
    pub natives: Arc<NativeRegistry>,
    // name -> function index, built on first lookup
    function_index: Mutex<Option<HashMap<String, usize>>>,
}

impl Program {
    pub fn new(natives: Arc<NativeRegistry>) -> Self {
        Self {
            functions: Vec::new(),
            classes: Vec::new(),
            enums: Vec::new(),
            constants: Vec::new(),
            files: Vec::new(),
            attributes: Vec::new(),
            natives,
            function_index: Mutex::new(None),
        }
    }

    /// Looks up a function by its registered name. Class methods are not
    /// reachable this way.
    pub fn function(&self, name: &str) -> Option<&Function> {
        let mut index = self.function_index.lock();
        let map = index.get_or_insert_with(|| {
            self.functions
                .iter()
                .filter(|f| !f.is_class)
                .map(|f| (f.name.clone(), f.index))
                .collect()
        });
        map.get(name).and_then(|&i| self.functions.get(i))
    }

    /// Drops the cached name index after functions were added.
    pub(crate) fn invalidate_index(&self) {
        *self.function_index.lock() = None;
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        find_attribute(&self.attributes, name)
    }

    pub fn permissions(&self) -> Vec<String> {
        parse_permissions(&self.attributes)
    }

    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions().iter().any(|p| p == name || p == "trusted")
    }

    /// Adds a constant to the pool, reusing an equal one of the same type.
    pub fn add_constant(&mut self, value: Value) -> Address {
        let existing = self
            .constants
            .iter()
            .position(|k| k.value_type() == value.value_type() && k.strict_equals(&value));
        match existing {
            Some(i) => Address::constant(i),
            None => {
                self.constants.push(value);
                Address::constant(self.constants.len() - 1)
            }
        }
    }

    pub fn file_index(&mut self, file: &str) -> usize {
        match self.files.iter().position(|f| f == file) {
            Some(i) => i,
            None => {
                self.files.push(file.to_string());
                self.files.len() - 1
            }
        }
    }

    /// Maps a pc to a source line. Generated instructions carry line 0 and
    /// report the closest preceding real position.
    pub fn to_trace_line(&self, func: usize, pc: usize) -> TraceLine {
        let f = &self.functions[func];
        let mut line = TraceLine {
            function: f.name.clone(),
            file: None,
            line: 0,
        };
        if f.positions.is_empty() {
            return line;
        }

        let mut i = pc.min(f.positions.len() - 1);
        loop {
            let p = f.positions[i];
            if p.line > 0 || i == 0 {
                line.line = p.line;
                line.file = self.files.get(p.file).filter(|s| !s.is_empty()).cloned();
                return line;
            }
            i -= 1;
        }
    }

    pub fn class_index(&self, name: &str) -> Option<usize> {
        self.classes.iter().position(|c| c.name == name)
    }

    pub fn enum_index(&self, name: &str) -> Option<usize> {
        self.enums.iter().position(|e| e.name == name)
    }

    /// The value of a global register as declared in the global function.
    pub(crate) fn global_register(&self, name: &str) -> Option<usize> {
        self.functions.first().and_then(|g| {
            g.registers
                .iter()
                .rev()
                .find(|r| r.name == name)
                .map(|r| r.index)
        })
    }
}

impl Clone for Program {
    fn clone(&self) -> Self {
        Self {
            functions: self.functions.clone(),
            classes: self.classes.clone(),
            enums: self.enums.clone(),
            constants: self.constants.clone(),
            files: self.files.clone(),
            attributes: self.attributes.clone(),
            natives: Arc::clone(&self.natives),
            function_index: Mutex::new(None),
        }
    }
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("functions", &self.functions.len())
            .field("classes", &self.classes.len())
            .field("enums", &self.enums.len())
            .field("constants", &self.constants.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{FunctionKind, Position};

    fn program() -> Program {
        Program::new(Arc::new(NativeRegistry::new()))
    }

    #[test]
    fn test_constants_are_deduplicated_by_type() {
        let mut p = program();
        let a = p.add_constant(Value::Int(1));
        let b = p.add_constant(Value::Float(1.0));
        let c = p.add_constant(Value::Int(1));
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(p.constants.len(), 2);
    }

    #[test]
    fn test_trace_line_skips_generated_code() {
        let mut p = program();
        let file = p.file_index("/main.ts");
        let mut f = Function::new("main", 0, FunctionKind::Main);
        f.positions = vec![
            Position { file, line: 3, column: 1 },
            Position { file, line: 0, column: 0 },
            Position { file, line: 0, column: 0 },
        ];
        p.functions.push(f);

        let line = p.to_trace_line(0, 2);
        assert_eq!(line.line, 3);
        assert_eq!(line.to_string(), "/main.ts:3");
    }

    #[test]
    fn test_function_lookup_skips_methods() {
        let mut p = program();
        p.functions.push(Function::new("foo", 0, FunctionKind::User));
        let mut m = Function::new("bar", 1, FunctionKind::User);
        m.is_class = true;
        p.functions.push(m);

        assert!(p.function("foo").is_some());
        assert!(p.function("bar").is_none());

        p.functions.push(Function::new("baz", 2, FunctionKind::User));
        p.invalidate_index();
        assert!(p.function("baz").is_some());
    }
}
