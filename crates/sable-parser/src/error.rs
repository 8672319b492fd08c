use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("{file}:{line}:{column}: {message}")]
    Syntax {
        file: String,
        line: u32,
        column: u32,
        message: String,
    },

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("error reading {path}: {message}")]
    Io { path: String, message: String },
}

impl ParseError {
    pub fn syntax(file: &str, line: u32, column: u32, message: impl Into<String>) -> Self {
        ParseError::Syntax {
            file: file.to_string(),
            line,
            column,
            message: message.into(),
        }
    }
}
