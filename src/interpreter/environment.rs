use crate::value::{Builtin, Value};
use std::collections::HashMap;
use std::rc::Rc;

/// One flat variable scope.
pub type Frame = HashMap<Rc<str>, Value>;

/// Variable storage: a mutable current frame over a shared, read-only
/// builtin table.
///
/// Lookups try the frame first and fall back to the builtins. Writes only
/// ever touch the frame, so a script can shadow `print` but never replace it
/// for the next interpreter.
#[derive(Debug, Clone)]
pub struct Environment {
    builtins: Rc<HashMap<&'static str, Value>>,
    frame: Frame,
}

impl Environment {
    pub fn new() -> Self {
        let builtins = Builtin::ALL
            .iter()
            .map(|builtin| (builtin.name(), Value::Builtin(*builtin)))
            .collect();
        Self {
            builtins: Rc::new(builtins),
            frame: Frame::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.frame
            .get(name)
            .or_else(|| self.builtins.get(name))
            .cloned()
    }

    pub fn set(&mut self, name: Rc<str>, value: Value) {
        self.frame.insert(name, value);
    }

    /// A copy of the current frame, for building a callee's frame.
    pub fn snapshot(&self) -> Frame {
        self.frame.clone()
    }

    /// Installs `frame` as current and hands back the one it displaced.
    pub fn replace_frame(&mut self, frame: Frame) -> Frame {
        std::mem::replace(&mut self.frame, frame)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
