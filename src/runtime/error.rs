use thiserror::Error;

use super::value::Value;

/// A runtime failure. Every variant corresponds to a named exception
/// type, so `except` clauses can match script-raised and built-in
/// failures alike.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    #[error("name '{name}' is not defined")]
    NameNotFound { name: String },
    #[error("{message}")]
    TypeMismatch { message: String },
    #[error("{message}")]
    ValueMismatch { message: String },
    #[error("index out of range")]
    IndexOutOfRange,
    #[error("{key}")]
    KeyNotFound { key: String },
    #[error("unhashable type: '{type_name}'")]
    UnhashableKey { type_name: String },
    #[error("'{type_name}' object is not callable")]
    NotCallable { type_name: String },
    #[error("'{type_name}' object has no attribute '{attribute}'")]
    AttributeNotFound {
        type_name: String,
        attribute: String,
    },
    #[error("{message}")]
    DivisionByZero { message: &'static str },
    #[error("integer overflow in {operation}")]
    Overflow { operation: &'static str },
    #[error("{message}")]
    AssertionFailed { message: String },
    #[error("{operation} is not supported")]
    Unsupported { operation: &'static str },
    #[error("{}", .value.error_message())]
    Raised { value: Value },
}

pub type EvalResult<T> = Result<T, EvalError>;

impl EvalError {
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        EvalError::TypeMismatch {
            message: message.into(),
        }
    }

    /// The exception type name used for `except` matching and error
    /// reports.
    pub fn exception_type(&self) -> String {
        match self {
            EvalError::NameNotFound { .. } => "NameError".to_string(),
            EvalError::TypeMismatch { .. }
            | EvalError::UnhashableKey { .. }
            | EvalError::NotCallable { .. } => "TypeError".to_string(),
            EvalError::ValueMismatch { .. } => "ValueError".to_string(),
            EvalError::IndexOutOfRange => "IndexError".to_string(),
            EvalError::KeyNotFound { .. } => "KeyError".to_string(),
            EvalError::AttributeNotFound { .. } => "AttributeError".to_string(),
            EvalError::DivisionByZero { .. } => "ZeroDivisionError".to_string(),
            EvalError::Overflow { .. } => "OverflowError".to_string(),
            EvalError::AssertionFailed { .. } => "AssertionError".to_string(),
            EvalError::Unsupported { .. } => "RuntimeError".to_string(),
            EvalError::Raised { value } => match value {
                Value::Type(class) => class.name.clone(),
                Value::Instance(instance) => instance.class.name.clone(),
                _ => "RuntimeError".to_string(),
            },
        }
    }
}
