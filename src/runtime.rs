//! The dynamic value model and its supporting pieces: values and their
//! operation protocols, runtime errors, and activation frames.

mod error;
mod frame;
mod value;

pub use error::{EvalError, EvalResult};
pub use frame::Frame;
pub use value::{
    BoundMethod, Dict, FuncBody, Function, Instance, Key, Namespace, TypeObject, Value,
};
