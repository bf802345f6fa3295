/// Timer errors
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The duration is zero, shorter than one tick, or does not fit the 24 bit counter.
    OutOfRange,
    /// A required callback was not supplied, or the clock frequency is zero.
    InvalidArgument,
    /// No clock frequency has been recorded with `init()`.
    NotInitialized,
    /// The schedule backing a pending delay was replaced or reset.
    Cancelled,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::OutOfRange => write!(f, "Duration out of range"),
            Error::InvalidArgument => write!(f, "Invalid argument"),
            Error::NotInitialized => write!(f, "Timer not initialized"),
            Error::Cancelled => write!(f, "Delay cancelled"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
