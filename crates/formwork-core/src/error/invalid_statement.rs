use super::{Error, ErrorKind};

/// Error when a statement cannot be built for the given inputs.
#[derive(Debug)]
pub(super) struct InvalidStatementError {
    message: Box<str>,
}

impl std::error::Error for InvalidStatementError {}

impl core::fmt::Display for InvalidStatementError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid statement: {}", self.message)
    }
}

impl Error {
    pub fn invalid_statement(message: impl Into<String>) -> Error {
        Error::from(ErrorKind::InvalidStatement(InvalidStatementError {
            message: message.into().into(),
        }))
    }

    pub fn is_invalid_statement(&self) -> bool {
        self.any(|kind| matches!(kind, ErrorKind::InvalidStatement(_)))
    }
}
