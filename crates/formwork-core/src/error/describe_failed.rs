use super::{Error, ErrorKind};

/// Error when a data source could not determine its columns and types.
///
/// The data source stays undescribed, so the next operation describes it
/// again.
#[derive(Debug)]
pub(super) struct DescribeFailedError {
    source: Box<str>,
}

impl std::error::Error for DescribeFailedError {}

impl core::fmt::Display for DescribeFailedError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "failed to describe data source `{}`", self.source)
    }
}

impl Error {
    pub fn describe_failed(source: impl Into<String>) -> Error {
        Error::from(ErrorKind::DescribeFailed(DescribeFailedError {
            source: source.into().into(),
        }))
    }

    pub fn is_describe_failed(&self) -> bool {
        self.any(|kind| matches!(kind, ErrorKind::DescribeFailed(_)))
    }
}
