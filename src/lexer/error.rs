use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unexpected character '{character}' at line {line}")]
    UnexpectedCharacter { character: char, line: usize },
    #[error("Inconsistent dedent to {indent} columns at line {line}")]
    InconsistentDedent { indent: usize, line: usize },
    #[error("Tabs are not supported for indentation at line {line}")]
    TabIndentation { line: usize },
    #[error("Invalid number literal '{literal}' at line {line}")]
    InvalidNumber { literal: String, line: usize },
    #[error("Invalid escape sequence '\\{escape}' at line {line}")]
    InvalidEscape { escape: char, line: usize },
    #[error("Unterminated string literal at line {line}")]
    UnterminatedString { line: usize },
}

pub type LexResult<T> = Result<T, LexError>;
