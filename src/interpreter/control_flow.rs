use crate::value::Value;

/// Result of executing a statement: either an ordinary value, or a `return`
/// unwinding to the nearest call boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlFlow {
    Value(Value),
    Return(Value),
}

impl ControlFlow {
    pub fn into_value(self) -> Value {
        match self {
            ControlFlow::Value(value) | ControlFlow::Return(value) => value,
        }
    }
}
