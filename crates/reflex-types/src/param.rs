//! Parameter and return type identities

use std::fmt;
use std::sync::Arc;

use crate::class::Class;
use crate::value::Value;

/// Type identity of a parameter or return slot
///
/// Two signatures are the same overload only when every `ParamType` is equal,
/// so `I32` and `I64` parameters never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// Erased type: accepts any value
    Any,
    /// No value (return slots only)
    Void,
    /// Boolean
    Bool,
    /// 32-bit integer
    I32,
    /// 64-bit integer
    I64,
    /// 64-bit float
    F64,
    /// String
    Str,
    /// List
    List,
    /// Instance of the named class or any of its subclasses
    Object(Arc<str>),
}

impl ParamType {
    /// Reference type naming a class
    pub fn object(class_name: impl AsRef<str>) -> Self {
        ParamType::Object(Arc::from(class_name.as_ref()))
    }

    /// Reference type naming the given class
    pub fn of_class(class: &Class) -> Self {
        ParamType::object(class.name())
    }

    /// Type name used in signatures and composite keys
    pub fn name(&self) -> &str {
        match self {
            ParamType::Any => "any",
            ParamType::Void => "void",
            ParamType::Bool => "bool",
            ParamType::I32 => "i32",
            ParamType::I64 => "i64",
            ParamType::F64 => "f64",
            ParamType::Str => "str",
            ParamType::List => "list",
            ParamType::Object(name) => name,
        }
    }

    /// Whether a value of this declared type may hold `value`
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ParamType::Any, _) => true,
            (ParamType::Void, Value::Null) => true,
            (ParamType::Bool, Value::Bool(_)) => true,
            (ParamType::I32, Value::I32(_)) => true,
            (ParamType::I64, Value::I64(_)) => true,
            (ParamType::F64, Value::F64(_)) => true,
            (ParamType::Str | ParamType::List | ParamType::Object(_), Value::Null) => true,
            (ParamType::Str, Value::Str(_)) => true,
            (ParamType::List, Value::List(_)) => true,
            (ParamType::Object(name), Value::Object(obj)) => obj.class().conforms_to(name),
            _ => false,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Render parameter types as a comma separated signature
pub fn render_signature(params: &[ParamType]) -> String {
    params
        .iter()
        .map(ParamType::name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check that `args` fit `params` in count and type
pub fn check_arguments(params: &[ParamType], args: &[Value]) -> Result<(), String> {
    if params.len() != args.len() {
        return Err(format!(
            "expected {} argument(s) ({}), got {}",
            params.len(),
            render_signature(params),
            args.len()
        ));
    }
    for (index, (param, arg)) in params.iter().zip(args).enumerate() {
        if !param.accepts(arg) {
            return Err(format!(
                "argument {} expects {}, got {}",
                index,
                param,
                arg.type_name()
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_acceptance() {
        assert!(ParamType::I32.accepts(&Value::I32(1)));
        assert!(!ParamType::I32.accepts(&Value::I64(1)));
        assert!(!ParamType::I32.accepts(&Value::Null));
        assert!(ParamType::Str.accepts(&Value::Null));
        assert!(ParamType::Any.accepts(&Value::F64(0.5)));
        assert!(ParamType::Void.accepts(&Value::Null));
        assert!(!ParamType::Void.accepts(&Value::I32(0)));
    }

    #[test]
    fn test_render_signature() {
        let params = [ParamType::I32, ParamType::Str, ParamType::object("Point")];
        assert_eq!(render_signature(&params), "i32, str, Point");
        assert_eq!(render_signature(&[]), "");
    }

    #[test]
    fn test_check_arguments() {
        let params = [ParamType::I32, ParamType::Str];
        assert!(check_arguments(&params, &[Value::I32(1), Value::str("a")]).is_ok());

        let err = check_arguments(&params, &[Value::I32(1)]).unwrap_err();
        assert!(err.contains("expected 2"));

        let err = check_arguments(&params, &[Value::I32(1), Value::I32(2)]).unwrap_err();
        assert!(err.contains("argument 1 expects str"));
    }

    #[test]
    fn test_overload_identity() {
        assert_ne!(ParamType::I32, ParamType::Str);
        assert_eq!(ParamType::object("A"), ParamType::Object(Arc::from("A")));
    }
}
