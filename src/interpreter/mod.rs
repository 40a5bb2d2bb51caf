pub mod parser;
pub mod environment;
pub mod error;
pub mod control_flow;
pub mod builtins;
pub mod evaluator;

pub use error::RuntimeError;
pub use control_flow::ControlFlow;
pub use environment::{Environment, Frame};
pub use parser::{TokenParser, ParseError};
pub use evaluator::{Interpreter, DEFAULT_LIB_DIR, LIBRARY_EXTENSION, MAX_REPEAT_BYTES};
