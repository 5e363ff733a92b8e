use core::fmt::Display;

use crate::card::status::CardStatus;
use crate::host::HostError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdError {
    /// Empty request or a buffer too small for it.
    NullArgument,
    NotReady,
    /// Card still programming.
    Busy,
    /// Bounded retry or busy poll exhausted.
    Timeout,
    /// CMD8 echoed a different voltage or check pattern.
    ChecksumOrPatternMismatch,
    /// Error bits set in an R1/R6 response.
    CardError(CardStatus),
    NotSupported,
    ReadFailed,
    WriteFailed,
    StopFailed,
    EraseFailed,
    NoMemory,
    HostFault(HostError),
}

impl Display for SdError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SdError::NullArgument => write!(f, "Invalid argument"),
            SdError::NotReady => write!(f, "Card not ready"),
            SdError::Busy => write!(f, "Card busy"),
            SdError::Timeout => write!(f, "Operation timed out"),
            SdError::ChecksumOrPatternMismatch => write!(f, "Check pattern mismatch"),
            SdError::CardError(status) => write!(f, "Card error, status {:#010x}", status.bits()),
            SdError::NotSupported => write!(f, "Not supported by card or host"),
            SdError::ReadFailed => write!(f, "Read failed"),
            SdError::WriteFailed => write!(f, "Write failed"),
            SdError::StopFailed => write!(f, "Stop transmission failed"),
            SdError::EraseFailed => write!(f, "Erase failed"),
            SdError::NoMemory => write!(f, "Out of memory"),
            SdError::HostFault(err) => write!(f, "Host fault: {}", err),
        }
    }
}

impl From<HostError> for SdError {
    fn from(err: HostError) -> Self {
        SdError::HostFault(err)
    }
}

pub type SdResult<T = ()> = Result<T, SdError>;
