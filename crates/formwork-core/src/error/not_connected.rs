use super::{Error, ErrorKind};

/// Error when an operation needs the backend but the session has no gateway.
#[derive(Debug)]
pub(super) struct NotConnectedError;

impl std::error::Error for NotConnectedError {}

impl core::fmt::Display for NotConnectedError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str("data source is not connected")
    }
}

impl Error {
    pub fn not_connected() -> Error {
        Error::from(ErrorKind::NotConnected(NotConnectedError))
    }

    pub fn is_not_connected(&self) -> bool {
        self.any(|kind| matches!(kind, ErrorKind::NotConnected(_)))
    }
}
