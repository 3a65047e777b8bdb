pub mod builtins;
pub mod error;
pub mod evaluator;
pub mod scope;
mod stack;
pub mod value;

pub use error::{EvalError, EvalResult};
pub use evaluator::{EvalConfig, Interpreter};
pub use scope::Scope;
pub use value::Value;
