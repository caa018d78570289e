use core::fmt;

/// Reason a cancellable or bounded wait returned without its predicate holding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WaitError {
    /// The wait was aborted through a [`CancelToken`](crate::CancelToken).
    Cancelled,
    /// Every timed window elapsed with the predicate still false.
    TimedOut,
}

impl WaitError {
    pub const fn is_cancelled(self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub const fn is_timed_out(self) -> bool {
        matches!(self, Self::TimedOut)
    }
}

impl fmt::Display for WaitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "wait cancelled"),
            Self::TimedOut => write!(f, "wait timed out, retry budget exhausted"),
        }
    }
}

impl std::error::Error for WaitError {}
