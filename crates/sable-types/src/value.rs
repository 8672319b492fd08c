use crate::error::ScriptError;
use crate::object::{HostObject, Object};
use crate::sync::{shared, Arc, Shared};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Depth after which `export` stops descending into containers.
pub const MAX_EXPORT_RECURSION: usize = 200;

/// Runtime tag of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Null,
    Undefined,
    Int,
    Float,
    Bool,
    Rune,
    Bytes,
    String,
    Array,
    Map,
    Function,
    NativeFunction,
    Enum,
    Object,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueType::Null => "null",
            ValueType::Undefined => "undefined",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
            ValueType::Rune => "rune",
            ValueType::Bytes => "bytes",
            ValueType::String => "string",
            ValueType::Array => "array",
            ValueType::Map => "map",
            ValueType::Function => "function",
            ValueType::NativeFunction => "native function",
            ValueType::Enum => "enum",
            ValueType::Object => "object",
        };
        f.write_str(s)
    }
}

/// A runtime value.
///
/// Arrays and maps are shared by reference: `let b = a` aliases the same
/// container. `PartialEq`/`Hash` implement strict equality so values can be
/// used as map keys; loose equality is [`Value::equals`].
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Undefined,
    Int(i64),
    Float(f64),
    Bool(bool),
    Rune(char),
    Bytes(Arc<[u8]>),
    String(Arc<str>),
    Array(Shared<Vec<Value>>),
    Map(Shared<HashMap<Value, Value>>),
    /// Index into the program's function table.
    Function(usize),
    /// Index into the native function registry.
    NativeFunction(usize),
    /// Index into the program's enum table.
    Enum(usize),
    Object(Object),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(shared(items))
    }

    pub fn map(entries: HashMap<Value, Value>) -> Value {
        Value::Map(shared(entries))
    }

    pub fn string(s: impl AsRef<str>) -> Value {
        Value::String(Arc::from(s.as_ref()))
    }

    pub fn bytes(b: &[u8]) -> Value {
        Value::Bytes(Arc::from(b))
    }

    pub fn error(err: ScriptError) -> Value {
        Value::Object(Object::Error(Arc::new(err)))
    }

    pub fn host(obj: Arc<dyn HostObject>) -> Value {
        Value::Object(Object::Host(obj))
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Undefined => ValueType::Undefined,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Bool(_) => ValueType::Bool,
            Value::Rune(_) => ValueType::Rune,
            Value::Bytes(_) => ValueType::Bytes,
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Map(_) => ValueType::Map,
            Value::Function(_) => ValueType::Function,
            Value::NativeFunction(_) => ValueType::NativeFunction,
            Value::Enum(_) => ValueType::Enum,
            Value::Object(_) => ValueType::Object,
        }
    }

    /// Type name used in error messages; objects report their own name.
    pub fn type_name(&self) -> String {
        match self {
            Value::Object(o) => o.type_name().to_string(),
            v => v.value_type().to_string(),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Null | Value::Undefined)
    }

    pub fn is_nil_or_empty(&self) -> bool {
        match self {
            Value::Null | Value::Undefined => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Truthiness used by conditional jumps.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            v => !v.is_nil_or_empty(),
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Integer coercion. Null and undefined are zero.
    pub fn to_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) => Some(*f as i64),
            Value::Rune(r) => Some(*r as i64),
            Value::Bool(b) => Some(*b as i64),
            Value::Null | Value::Undefined => Some(0),
            _ => None,
        }
    }

    pub fn to_float(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Rune(r) => Some(*r as u32 as f64),
            Value::Null | Value::Undefined => Some(0.0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&Arc<ScriptError>> {
        match self {
            Value::Object(Object::Error(e)) => Some(e),
            _ => None,
        }
    }

    /// Number of allocation units charged when the value is written.
    pub fn size(&self) -> usize {
        match self {
            Value::String(s) => s.len(),
            _ => 1,
        }
    }

    /// Strict equality: same tag and same representation.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) | (Value::Undefined, Value::Undefined) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Rune(a), Value::Rune(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Function(a), Value::Function(b))
            | (Value::NativeFunction(a), Value::NativeFunction(b))
            | (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => a.same(b),
            _ => false,
        }
    }

    /// Loose equality with scripting-language coercions: null equals
    /// undefined, ints compare with floats numerically and with bools as 0/1,
    /// and a one-character string equals the matching rune.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null | Value::Undefined, Value::Null | Value::Undefined) => true,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Int(a), Value::Rune(r)) | (Value::Rune(r), Value::Int(a)) => {
                *a == *r as i64
            }
            (Value::Int(a), Value::Bool(b)) | (Value::Bool(b), Value::Int(a)) => {
                (*b && *a == 1) || (!*b && *a == 0)
            }
            (Value::String(s), Value::Rune(r)) | (Value::Rune(r), Value::String(s)) => {
                let mut chars = s.chars();
                chars.next() == Some(*r) && chars.next().is_none()
            }
            (Value::Object(Object::Host(h)), v) => self.strict_equals(other) || h.equals(v),
            (v, Value::Object(Object::Host(h))) => h.equals(v),
            _ => self.strict_equals(other),
        }
    }

    /// Exports the value into a host-visible JSON tree.
    pub fn export(&self, depth: usize) -> serde_json::Value {
        use serde_json::Value as Json;

        if depth > MAX_EXPORT_RECURSION {
            return Json::String("[Export Error: max recursion exceeded]".to_string());
        }
        let depth = depth + 1;

        match self {
            Value::Null | Value::Undefined => Json::Null,
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Bool(b) => Json::Bool(*b),
            Value::Rune(r) => Json::String(r.to_string()),
            Value::String(s) => Json::String(s.to_string()),
            Value::Bytes(b) => Json::Array(b.iter().map(|x| Json::from(*x)).collect()),
            Value::Array(a) => Json::Array(a.read().iter().map(|v| v.export(depth)).collect()),
            Value::Map(m) => Json::Object(
                m.read()
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.export(depth)))
                    .collect(),
            ),
            Value::Enum(i) => Json::String(format!("[enum({})]", i)),
            Value::Function(i) => Json::String(format!("[function({})]", i)),
            Value::NativeFunction(i) => Json::String(format!("[native function({})]", i)),
            Value::Object(Object::Instance(inst)) => Json::Object(
                inst.read()
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.export(depth)))
                    .collect(),
            ),
            Value::Object(Object::Error(e)) => Json::String(e.message.clone()),
            Value::Object(Object::Host(h)) => h.export(depth),
            Value::Object(o) => Json::String(format!("[{}]", o.type_name())),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // Bitwise so that NaN keys are usable and Eq stays reflexive.
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            _ => self.strict_equals(other),
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null | Value::Undefined => {}
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Rune(r) => r.hash(state),
            Value::Bytes(b) => b.hash(state),
            Value::String(s) => s.hash(state),
            Value::Array(a) => (Arc::as_ptr(a) as *const u8 as usize).hash(state),
            Value::Map(m) => (Arc::as_ptr(m) as *const u8 as usize).hash(state),
            Value::Function(i) | Value::NativeFunction(i) | Value::Enum(i) => i.hash(state),
            Value::Object(o) => o.identity().hash(state),
        }
    }
}

/// Formats a float with six decimals, trimming trailing zeros.
fn format_float(f: f64) -> String {
    let s = format!("{:.6}", f);
    match s.split_once('.') {
        Some((int, dec)) => {
            let dec = dec.trim_end_matches('0');
            if dec.is_empty() {
                int.to_string()
            } else {
                format!("{}.{}", int, dec)
            }
        }
        None => s,
    }
}

/// Chain of containers currently being formatted.
struct Path<'a> {
    id: usize,
    parent: Option<&'a Path<'a>>,
}

impl Path<'_> {
    fn contains(&self, id: usize) -> bool {
        self.id == id || self.parent.is_some_and(|p| p.contains(id))
    }
}

/// A value formatted inside one or more containers. Containers already on the
/// path, or nested deeper than `MAX_EXPORT_RECURSION`, print as `[...]`.
struct Nested<'a> {
    value: &'a Value,
    path: Option<&'a Path<'a>>,
    depth: usize,
}

fn nested<'a>(value: &'a Value, path: Option<&'a Path<'a>>, depth: usize) -> Nested<'a> {
    Nested { value, path, depth }
}

fn container_id(value: &Value) -> Option<usize> {
    match value {
        Value::Array(a) => Some(Arc::as_ptr(a) as *const () as usize),
        Value::Map(m) => Some(Arc::as_ptr(m) as *const () as usize),
        _ => None,
    }
}

impl Nested<'_> {
    fn write(&self, f: &mut fmt::Formatter<'_>, debug: bool) -> fmt::Result {
        let Some(id) = container_id(self.value) else {
            return if debug {
                write_debug_scalar(self.value, f)
            } else {
                write_scalar(self.value, f)
            };
        };
        if self.depth > MAX_EXPORT_RECURSION || self.path.is_some_and(|p| p.contains(id)) {
            return f.write_str("[...]");
        }
        let here = Path { id, parent: self.path };
        let depth = self.depth + 1;
        match self.value {
            Value::Array(a) => {
                let items = a.read();
                if debug {
                    return f
                        .debug_list()
                        .entries(items.iter().map(|v| nested(v, Some(&here), depth)))
                        .finish();
                }
                f.write_str("[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    nested(v, Some(&here), depth).write(f, false)?;
                }
                f.write_str("]")
            }
            Value::Map(m) if debug => {
                let entries = m.read();
                f.debug_map()
                    .entries(
                        entries
                            .iter()
                            .map(|(k, v)| (nested(k, Some(&here), depth), nested(v, Some(&here), depth))),
                    )
                    .finish()
            }
            Value::Map(_) => f.write_str("[map]"),
            v => write_scalar(v, f),
        }
    }
}

impl fmt::Debug for Nested<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, true)
    }
}

fn write_scalar(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::Null => f.write_str("null"),
        Value::Undefined => f.write_str("undefined"),
        Value::Int(i) => write!(f, "{}", i),
        Value::Float(x) => f.write_str(&format_float(*x)),
        Value::Bool(b) => write!(f, "{}", b),
        Value::Rune(r) => write!(f, "{}", r),
        Value::String(s) => f.write_str(s),
        Value::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
        Value::Array(_) => f.write_str("[array]"),
        Value::Map(_) => f.write_str("[map]"),
        Value::Function(_) => f.write_str("[function]"),
        Value::NativeFunction(_) => f.write_str("[native function]"),
        Value::Enum(_) => f.write_str("[enum]"),
        Value::Object(Object::Error(e)) => f.write_str(&e.message),
        Value::Object(Object::Closure(_)) => f.write_str("[function]"),
        Value::Object(o) => write!(f, "[{}]", o.type_name()),
    }
}

fn write_debug_scalar(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::String(s) => write!(f, "{:?}", s),
        Value::Rune(r) => write!(f, "'{}'", r),
        Value::Float(x) => write!(f, "{:?}", x),
        Value::Object(o) => write!(f, "{:?}", o),
        v => write_scalar(v, f),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        nested(self, None, 0).write(f, false)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        nested(self, None, 0).write(f, true)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Rune(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_loose_equality() {
        assert!(Value::Null.equals(&Value::Undefined));
        assert!(Value::Int(1).equals(&Value::Bool(true)));
        assert!(Value::Int(0).equals(&Value::Bool(false)));
        assert!(!Value::Int(2).equals(&Value::Bool(true)));
        assert!(Value::Int(1).equals(&Value::Float(1.0)));
        assert!(!Value::Int(1).equals(&Value::Float(1.000000000000001)));
        assert!(Value::from("a").equals(&Value::Rune('a')));
        assert!(!Value::from("ab").equals(&Value::Rune('a')));
    }

    #[test]
    fn test_strict_equality() {
        assert!(!Value::Null.strict_equals(&Value::Undefined));
        assert!(!Value::Int(1).strict_equals(&Value::Float(1.0)));
        assert!(Value::from("x").strict_equals(&Value::from("x")));

        let a = Value::array(vec![Value::Int(1)]);
        let b = Value::array(vec![Value::Int(1)]);
        assert!(a.strict_equals(&a.clone()));
        assert!(!a.strict_equals(&b));
    }

    #[test]
    fn test_float_display() {
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
        assert_eq!(Value::Float(2.0).to_string(), "2");
        assert_eq!(Value::Float(0.1 + 0.2).to_string(), "0.3");
    }

    #[test]
    fn test_export_limits_recursion() {
        let arr = Value::array(vec![]);
        if let Value::Array(a) = &arr {
            a.write().push(arr.clone());
        }
        let mut json = arr.export(0);
        for _ in 0..=MAX_EXPORT_RECURSION {
            json = match json {
                serde_json::Value::Array(mut items) => items.remove(0),
                other => other,
            };
        }
        assert_eq!(
            json,
            serde_json::Value::String("[Export Error: max recursion exceeded]".into())
        );
        // break the cycle so the test does not leak
        if let Value::Array(a) = &arr {
            a.write().clear();
        }
    }

    #[test]
    fn test_format_stops_at_cycles() {
        let a = Value::array(vec![Value::Int(1)]);
        let b = Value::array(vec![a.clone(), a.clone()]);
        if let Value::Array(inner) = &a {
            inner.write().push(b.clone());
        }
        assert_eq!(a.to_string(), "[1, [[...], [...]]]");
        assert_eq!(format!("{:?}", b), "[[1, [...]], [1, [...]]]");

        let m = Value::map(HashMap::new());
        if let Value::Map(entries) = &m {
            entries.write().insert(Value::from("self"), m.clone());
        }
        assert_eq!(format!("{:?}", m), "{\"self\": [...]}");

        if let Value::Array(inner) = &a {
            inner.write().clear();
        }
        if let Value::Map(entries) = &m {
            entries.write().clear();
        }
    }

    #[test]
    fn test_format_limits_depth() {
        let mut v = Value::Int(0);
        for _ in 0..MAX_EXPORT_RECURSION + 10 {
            v = Value::array(vec![v]);
        }
        let text = v.to_string();
        assert!(text.contains("[...]"));
        assert!(!text.contains('0'));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::array(vec![]).is_truthy());
    }

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            Just(Value::Undefined),
            any::<i64>().prop_map(Value::Int),
            any::<f64>().prop_map(Value::Float),
            any::<bool>().prop_map(Value::Bool),
            any::<char>().prop_map(Value::Rune),
            ".{0,3}".prop_map(Value::from),
        ]
    }

    proptest! {
        #[test]
        fn loose_equality_is_symmetric(a in scalar(), b in scalar()) {
            prop_assert_eq!(a.equals(&b), b.equals(&a));
        }

        #[test]
        fn strict_implies_loose(a in scalar(), b in scalar()) {
            let is_nan = matches!(a, Value::Float(f) if f.is_nan());
            if a.strict_equals(&b) && !is_nan {
                prop_assert!(a.equals(&b));
            }
        }

        #[test]
        fn equal_keys_hash_equal(a in scalar()) {
            use std::collections::hash_map::DefaultHasher;
            let b = a.clone();
            let mut h1 = DefaultHasher::new();
            let mut h2 = DefaultHasher::new();
            a.hash(&mut h1);
            b.hash(&mut h2);
            prop_assert_eq!(a == b, true);
            prop_assert_eq!(h1.finish(), h2.finish());
        }
    }
}
