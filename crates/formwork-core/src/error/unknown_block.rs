use super::{Error, ErrorKind};

#[derive(Debug)]
pub(super) struct UnknownBlockError {
    name: Box<str>,
}

impl std::error::Error for UnknownBlockError {}

impl core::fmt::Display for UnknownBlockError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "no block named `{}`", self.name)
    }
}

impl Error {
    pub fn unknown_block(name: impl Into<String>) -> Error {
        Error::from(ErrorKind::UnknownBlock(UnknownBlockError {
            name: name.into().into(),
        }))
    }

    pub fn is_unknown_block(&self) -> bool {
        self.any(|kind| matches!(kind, ErrorKind::UnknownBlock(_)))
    }
}
