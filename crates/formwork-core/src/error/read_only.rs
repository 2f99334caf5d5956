use super::{Error, ErrorKind};

/// Error when DML or locking is requested on a data source without a table
/// identity, such as an ad-hoc query.
#[derive(Debug)]
pub(super) struct ReadOnlyError {
    source: Box<str>,
    operation: &'static str,
}

impl std::error::Error for ReadOnlyError {}

impl core::fmt::Display for ReadOnlyError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "data source `{}` is read-only; {} is not allowed",
            self.source, self.operation
        )
    }
}

impl Error {
    pub fn read_only(source: impl Into<String>, operation: &'static str) -> Error {
        Error::from(ErrorKind::ReadOnly(ReadOnlyError {
            source: source.into().into(),
            operation,
        }))
    }

    pub fn is_read_only(&self) -> bool {
        self.any(|kind| matches!(kind, ErrorKind::ReadOnly(_)))
    }
}
