pub mod counter;

pub use counter::{GatedCounter, Snapshot};

/// How [`GatedCounter::reset`] treats a counter that is not quiescent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ResetMode {
    /// Reassign immediately, whatever the current value.
    #[default]
    Force,
    /// Block until `value == initial` first.
    Quiescent,
}

/// Compile-time reset selection for [`GatedCounter::reset_with`].
pub trait ResetPolicy {
    const MODE: ResetMode;
}

pub struct ForceReset(());
impl ResetPolicy for ForceReset {
    const MODE: ResetMode = ResetMode::Force;
}

pub struct QuiescentReset(());
impl ResetPolicy for QuiescentReset {
    const MODE: ResetMode = ResetMode::Quiescent;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Config {
    pub reset_mode: ResetMode,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            reset_mode: ResetMode::Force,
        }
    }

    pub const fn with_reset_mode(mut self, reset_mode: ResetMode) -> Self {
        self.reset_mode = reset_mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        assert_eq!(Config::new(), Config::default());
        assert_eq!(Config::default().reset_mode, ResetMode::Force);
        assert_eq!(
            Config::new().with_reset_mode(ResetMode::Quiescent).reset_mode,
            ResetMode::Quiescent
        );
    }

    #[test]
    fn policy_modes() {
        assert_eq!(ForceReset::MODE, ResetMode::Force);
        assert_eq!(QuiescentReset::MODE, ResetMode::Quiescent);
    }
}
