use std::fmt;

/// Error types raised while reading and interpreting GPMF telemetry
#[derive(Debug)]
pub enum GpmfError {
    /// UTF-8 parsing errors
    Utf8(std::str::Utf8Error),
    /// The buffer ended before a declared header or payload was satisfied
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    /// A known label carried a payload of the wrong shape
    InvalidRecord { fourcc: String, reason: String },
    /// A scale vector could not be applied to the record that followed it
    InvalidScale { fourcc: String, reason: String },
    /// Time anchor string could not be parsed
    InvalidTimestamp(String),
}

impl fmt::Display for GpmfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpmfError::Utf8(err) => write!(f, "UTF-8 error: {}", err),
            GpmfError::Truncated {
                offset,
                needed,
                available,
            } => write!(
                f,
                "Truncated input at offset {}: needed {} bytes, {} available",
                offset, needed, available
            ),
            GpmfError::InvalidRecord { fourcc, reason } => {
                write!(f, "Invalid {} record: {}", fourcc, reason)
            }
            GpmfError::InvalidScale { fourcc, reason } => {
                write!(f, "Cannot scale {} record: {}", fourcc, reason)
            }
            GpmfError::InvalidTimestamp(value) => write!(f, "Invalid GPS timestamp: {:?}", value),
        }
    }
}

impl std::error::Error for GpmfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpmfError::Utf8(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::str::Utf8Error> for GpmfError {
    fn from(err: std::str::Utf8Error) -> Self {
        GpmfError::Utf8(err)
    }
}

impl GpmfError {
    /// True for the end-of-buffer condition that device-written streams
    /// commonly end with.
    pub fn is_truncation(&self) -> bool {
        matches!(self, GpmfError::Truncated { .. })
    }
}

pub type Result<T> = std::result::Result<T, GpmfError>;
