use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(feature = "log-trace")] {
        macro_rules! trace_ {
            ($($args:tt)*) => { ::log::trace!(target: "gated_counter", $($args)*) };
        }
    } else {
        macro_rules! trace_ {
            ($($args:tt)*) => {{}};
        }
    }
}

cfg_if! {
    if #[cfg(feature = "log-debug")] {
        macro_rules! debug_ {
            ($($args:tt)*) => { ::log::debug!(target: "gated_counter", $($args)*) };
        }
    } else {
        macro_rules! debug_ {
            ($($args:tt)*) => {{}};
        }
    }
}

cfg_if! {
    if #[cfg(feature = "log-info")] {
        macro_rules! info_ {
            ($($args:tt)*) => { ::log::info!(target: "gated_counter", $($args)*) };
        }
    } else {
        macro_rules! info_ {
            ($($args:tt)*) => {{}};
        }
    }
}

cfg_if! {
    if #[cfg(feature = "log-warn")] {
        macro_rules! warn_ {
            ($($args:tt)*) => { ::log::warn!(target: "gated_counter", $($args)*) };
        }
    } else {
        macro_rules! warn_ {
            ($($args:tt)*) => {{}};
        }
    }
}

cfg_if! {
    if #[cfg(feature = "log-error")] {
        macro_rules! error_ {
            ($($args:tt)*) => { ::log::error!(target: "gated_counter", $($args)*) };
        }
    } else {
        macro_rules! error_ {
            ($($args:tt)*) => {{}};
        }
    }
}

// Renamed on import: a local `warn` would clash with the built-in attribute.
pub(crate) use trace_ as trace;
pub(crate) use debug_ as debug;
pub(crate) use info_ as info;
pub(crate) use warn_ as warn;
pub(crate) use error_ as error;
