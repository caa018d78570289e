use core::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use static_assertions::{assert_impl_all, assert_not_impl_any};

use super::{Config, ResetMode, ResetPolicy};
use crate::cancel::CancelToken;
use crate::error::WaitError;
use crate::log::{debug, trace, warn};

/// A coherent read of both fields, taken under the counter lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Snapshot {
    pub value: i64,
    pub initial: i64,
}

impl Snapshot {
    pub const fn is_quiescent(&self) -> bool {
        self.value == self.initial
    }
}

pub(crate) struct Shared {
    state: Mutex<Snapshot>,
    cond: Condvar,
}

impl Shared {
    pub(crate) fn wake_all(&self) {
        // Any waiter between its predicate check and its park holds the lock.
        drop(self.state.lock());
        self.cond.notify_all();
    }

    fn wake_one(&self) {
        drop(self.state.lock());
        self.cond.notify_one();
    }
}

fn is_quiescent(value: i64, initial: i64) -> bool {
    value == initial
}

fn deadline_after(interval: Duration) -> Option<Instant> {
    let deadline = Instant::now().checked_add(interval);
    if deadline.is_none() {
        warn!("interval {:?} overflows the clock, waiting without deadline", interval);
    }
    deadline
}

struct Window {
    interval: Duration,
    remaining: u32,
    deadline: Option<Instant>,
}

impl Window {
    // A zero budget still gets one timed wait.
    fn new(interval: Duration, max_retries: u32) -> Self {
        Self {
            interval,
            remaining: max_retries.max(1),
            deadline: deadline_after(interval),
        }
    }

    fn until(deadline: Instant) -> Self {
        Self {
            interval: Duration::ZERO,
            remaining: 1,
            deadline: Some(deadline),
        }
    }

    fn rearm(&mut self) {
        self.deadline = deadline_after(self.interval);
    }
}

/// A signed counter that threads can block on until a predicate over
/// `(value, initial)` holds.
///
/// Every mutation notifies after it has been applied, and every predicate is
/// evaluated under the counter lock, so a waiter can never miss the mutation
/// that satisfies it.
///
/// The counter is not `Clone`. Share it by reference or behind one `Arc`.
pub struct GatedCounter {
    shared: Arc<Shared>,
    config: Config,
}

assert_impl_all!(GatedCounter: Send, Sync);
assert_not_impl_any!(GatedCounter: Clone, Copy);

impl GatedCounter {
    pub fn new(initial: i64) -> Self {
        Self::with_config(initial, Config::new())
    }

    pub fn with_config(initial: i64, config: Config) -> Self {
        debug!("new counter at {} with {:?}", initial, config);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(Snapshot {
                    value: initial,
                    initial,
                }),
                cond: Condvar::new(),
            }),
            config,
        }
    }

    pub fn config(&self) -> Config {
        self.config
    }

    pub fn value(&self) -> i64 {
        self.shared.state.lock().value
    }

    pub fn initial_value(&self) -> i64 {
        self.shared.state.lock().initial
    }

    pub fn snapshot(&self) -> Snapshot {
        *self.shared.state.lock()
    }

    pub fn is_quiescent(&self) -> bool {
        self.snapshot().is_quiescent()
    }

    fn update(&self, op: impl FnOnce(i64) -> i64) -> &Self {
        let mut state = self.shared.state.lock();
        state.value = op(state.value);
        trace!("value is now {}", state.value);
        drop(state);
        self.shared.cond.notify_all();
        self
    }

    /// Adds `amount`, wrapping on overflow, then wakes all waiters.
    pub fn increment_by(&self, amount: i64) -> &Self {
        self.update(|value| value.wrapping_add(amount))
    }

    pub fn increment(&self) -> &Self {
        self.increment_by(1)
    }

    /// Subtracts `amount`, wrapping on overflow, then wakes all waiters.
    /// The value may go negative.
    pub fn decrement_by(&self, amount: i64) -> &Self {
        self.update(|value| value.wrapping_sub(amount))
    }

    pub fn decrement(&self) -> &Self {
        self.decrement_by(1)
    }

    fn assign(&self, mut state: MutexGuard<'_, Snapshot>, new_value: i64) {
        debug!(
            "rendezvous at {}/{}, assigning {}",
            state.value, state.initial, new_value
        );
        state.value = new_value;
        state.initial = new_value;
        drop(state);
        self.shared.cond.notify_all();
    }

    /// Waits until the counter is quiescent, then sets both the value and the
    /// initial value to `new_value`.
    ///
    /// The lock is held from the moment quiescence is observed until the
    /// reassignment, so no other mutation can land in between.
    pub fn set(&self, new_value: i64) -> &Self {
        let mut state = self.shared.state.lock();
        self.park_until(&mut state, is_quiescent);
        self.assign(state, new_value);
        self
    }

    /// Like [`set`](Self::set), but gives up without reassigning if `token` is cancelled.
    pub fn set_cancellable(&self, new_value: i64, token: &CancelToken) -> Result<(), WaitError> {
        let _registration = token.register(&self.shared);
        let mut state = self.shared.state.lock();
        self.wait_locked(&mut state, is_quiescent, Some(token), None)?;
        self.assign(state, new_value);
        Ok(())
    }

    /// Resets according to the configured [`ResetMode`].
    pub fn reset(&self) -> &Self {
        self.reset_blocking(self.config.reset_mode, None)
    }

    /// Resets onto a new base according to the configured [`ResetMode`].
    ///
    /// In [`ResetMode::Quiescent`] the base is ignored and this only waits for
    /// quiescence.
    pub fn reset_to(&self, base: i64) -> &Self {
        self.reset_blocking(self.config.reset_mode, Some(base))
    }

    pub fn reset_with<P: ResetPolicy>(&self) -> &Self {
        self.reset_blocking(P::MODE, None)
    }

    pub fn reset_to_with<P: ResetPolicy>(&self, base: i64) -> &Self {
        self.reset_blocking(P::MODE, Some(base))
    }

    /// Like [`reset`](Self::reset), but a quiescent-mode wait gives up if `token`
    /// is cancelled. A forced reset never fails.
    pub fn reset_cancellable(&self, token: &CancelToken) -> Result<(), WaitError> {
        self.reset_in(self.config.reset_mode, None, Some(token))
    }

    pub fn reset_to_cancellable(&self, base: i64, token: &CancelToken) -> Result<(), WaitError> {
        self.reset_in(self.config.reset_mode, Some(base), Some(token))
    }

    fn reset_blocking(&self, mode: ResetMode, base: Option<i64>) -> &Self {
        // Without a token neither mode can fail.
        let _ = self.reset_in(mode, base, None);
        self
    }

    fn reset_in(
        &self,
        mode: ResetMode,
        base: Option<i64>,
        cancel: Option<&CancelToken>,
    ) -> Result<(), WaitError> {
        match mode {
            ResetMode::Force => {
                let mut state = self.shared.state.lock();
                if let Some(base) = base {
                    state.initial = base;
                }
                state.value = state.initial;
                debug!("forced reset to {}", state.initial);
                drop(state);
                self.shared.cond.notify_all();
                Ok(())
            }
            ResetMode::Quiescent => self.wait_with(is_quiescent, cancel, None).map(drop),
        }
    }

    fn park_until<F>(&self, state: &mut MutexGuard<'_, Snapshot>, mut pred: F)
    where
        F: FnMut(i64, i64) -> bool,
    {
        while !pred(state.value, state.initial) {
            self.shared.cond.wait(state);
        }
    }

    fn wait_locked<F>(
        &self,
        state: &mut MutexGuard<'_, Snapshot>,
        mut pred: F,
        cancel: Option<&CancelToken>,
        mut window: Option<Window>,
    ) -> Result<(), WaitError>
    where
        F: FnMut(i64, i64) -> bool,
    {
        loop {
            if pred(state.value, state.initial) {
                return Ok(());
            }
            if cancel.map_or(false, CancelToken::is_cancelled) {
                debug!("wait cancelled at {}/{}", state.value, state.initial);
                return Err(WaitError::Cancelled);
            }
            let window = match window.as_mut() {
                Some(window) => window,
                None => {
                    self.shared.cond.wait(state);
                    continue;
                }
            };
            let deadline = match window.deadline {
                Some(deadline) => deadline,
                None => {
                    self.shared.cond.wait(state);
                    continue;
                }
            };
            if self.shared.cond.wait_until(state, deadline).timed_out() {
                window.remaining -= 1;
                trace!("window elapsed, {} left", window.remaining);
                if window.remaining == 0 {
                    if pred(state.value, state.initial) {
                        return Ok(());
                    }
                    debug!("gave up at {}/{}", state.value, state.initial);
                    return Err(WaitError::TimedOut);
                }
                window.rearm();
            }
        }
    }

    fn wait_with<F>(
        &self,
        pred: F,
        cancel: Option<&CancelToken>,
        window: Option<Window>,
    ) -> Result<i64, WaitError>
    where
        F: FnMut(i64, i64) -> bool,
    {
        // Dropped after the state guard.
        let _registration = cancel.map(|token| token.register(&self.shared));
        let mut state = self.shared.state.lock();
        self.wait_locked(&mut state, pred, cancel, window)?;
        Ok(state.value)
    }

    /// Blocks until `pred(value, initial)` holds and returns the value it held for.
    ///
    /// The predicate is re-evaluated under the lock on every wake, spurious or not.
    pub fn wait_until<F>(&self, pred: F) -> i64
    where
        F: FnMut(i64, i64) -> bool,
    {
        let mut state = self.shared.state.lock();
        self.park_until(&mut state, pred);
        state.value
    }

    pub fn wait_until_equals(&self, target: i64) -> i64 {
        self.wait_until(|value, _| value == target)
    }

    pub fn wait_until_quiescent(&self) -> i64 {
        self.wait_until(is_quiescent)
    }

    pub fn wait_until_cancellable<F>(&self, pred: F, token: &CancelToken) -> Result<i64, WaitError>
    where
        F: FnMut(i64, i64) -> bool,
    {
        self.wait_with(pred, Some(token), None)
    }

    pub fn wait_until_equals_cancellable(
        &self,
        target: i64,
        token: &CancelToken,
    ) -> Result<i64, WaitError> {
        self.wait_until_cancellable(|value, _| value == target, token)
    }

    pub fn wait_until_quiescent_cancellable(&self, token: &CancelToken) -> Result<i64, WaitError> {
        self.wait_until_cancellable(is_quiescent, token)
    }

    /// Waits in windows of `interval` for `pred` to hold.
    ///
    /// Each window that elapses with the predicate false consumes one retry, and
    /// the next window starts from the current time. Wakes inside a window do not
    /// consume budget. Returns [`WaitError::TimedOut`] once the budget is spent.
    /// A budget of zero behaves like a budget of one: one timed wait, then give up.
    pub fn wait_until_timeout<F>(
        &self,
        pred: F,
        interval: Duration,
        max_retries: u32,
    ) -> Result<i64, WaitError>
    where
        F: FnMut(i64, i64) -> bool,
    {
        self.wait_with(pred, None, Some(Window::new(interval, max_retries)))
    }

    pub fn wait_until_timeout_cancellable<F>(
        &self,
        pred: F,
        interval: Duration,
        max_retries: u32,
        token: &CancelToken,
    ) -> Result<i64, WaitError>
    where
        F: FnMut(i64, i64) -> bool,
    {
        self.wait_with(pred, Some(token), Some(Window::new(interval, max_retries)))
    }

    /// Waits for `pred` to hold until the absolute `deadline`.
    ///
    /// A deadline already in the past still checks the predicate once.
    pub fn wait_until_deadline<F>(&self, pred: F, deadline: Instant) -> Result<i64, WaitError>
    where
        F: FnMut(i64, i64) -> bool,
    {
        self.wait_with(pred, None, Some(Window::until(deadline)))
    }

    pub fn wait_until_deadline_cancellable<F>(
        &self,
        pred: F,
        deadline: Instant,
        token: &CancelToken,
    ) -> Result<i64, WaitError>
    where
        F: FnMut(i64, i64) -> bool,
    {
        self.wait_with(pred, Some(token), Some(Window::until(deadline)))
    }

    /// Makes every waiter re-evaluate its predicate.
    ///
    /// Only needed when a predicate depends on state changed outside the counter.
    pub fn wake_all(&self) {
        trace!("wake all");
        self.shared.wake_all();
    }

    pub fn wake_one(&self) {
        trace!("wake one");
        self.shared.wake_one();
    }
}

impl Default for GatedCounter {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Debug for GatedCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("GatedCounter")
            .field("value", &snapshot.value)
            .field("initial", &snapshot.initial)
            .finish()
    }
}
