//! A counting gate: a signed counter that threads mutate and block on until a
//! predicate over `(value, initial)` holds.

mod log;

pub mod cancel;
pub mod error;
pub mod sync;

pub use cancel::CancelToken;
pub use error::WaitError;
pub use sync::{
    Config, ForceReset, GatedCounter, QuiescentReset, ResetMode, ResetPolicy, Snapshot,
};
