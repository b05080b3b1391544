pub mod environment;
pub mod error;
pub mod input;
pub mod interpreter;
pub mod stack;
pub mod trace;
pub mod value;

pub use interpreter::{EvalOptions, Execution, Interpreter};
pub use stack::with_deep_stack;
