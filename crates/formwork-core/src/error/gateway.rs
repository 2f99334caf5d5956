use super::{Error, ErrorKind};

/// Error when the backend gateway answered a request with `success: false`.
#[derive(Debug)]
pub(super) struct GatewayError {
    message: Box<str>,
}

impl std::error::Error for GatewayError {}

impl core::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "gateway rejected request: {}", self.message)
    }
}

impl Error {
    pub fn gateway(message: impl Into<String>) -> Error {
        Error::from(ErrorKind::Gateway(GatewayError {
            message: message.into().into(),
        }))
    }

    pub fn is_gateway(&self) -> bool {
        self.any(|kind| matches!(kind, ErrorKind::Gateway(_)))
    }
}
