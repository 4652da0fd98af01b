use thiserror::Error;

use crate::lexer::LexError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expected {expected}, found `{found}` on line {line}")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: usize,
    },
    #[error("parameter without default follows parameter with default on line {line}")]
    ParameterWithoutDefault { line: usize },
    #[error("invalid parameter list on line {line}")]
    InvalidParameterList { line: usize },
    #[error("invalid argument list on line {line}")]
    InvalidArgumentList { line: usize },
    #[error("invalid augmented assignment target on line {line}")]
    InvalidAugmentedTarget { line: usize },
    #[error(transparent)]
    Lex(#[from] LexError),
}

pub type ParseResult<T> = Result<T, ParseError>;
