use super::{Error, ErrorKind};

#[derive(Debug)]
pub(super) struct UnknownColumnError {
    name: Box<str>,
}

impl std::error::Error for UnknownColumnError {}

impl core::fmt::Display for UnknownColumnError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "unknown column `{}`", self.name)
    }
}

impl Error {
    pub fn unknown_column(name: impl Into<String>) -> Error {
        Error::from(ErrorKind::UnknownColumn(UnknownColumnError {
            name: name.into().into(),
        }))
    }

    pub fn is_unknown_column(&self) -> bool {
        self.any(|kind| matches!(kind, ErrorKind::UnknownColumn(_)))
    }
}
