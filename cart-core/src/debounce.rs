//! Debounce timer for coalescing rapid cart mutations.
//!
//! Time is passed in as a [`Duration`] offset from an arbitrary origin, so
//! the timer is pure: the driver owns the clock and the sleeping.
//!
//! Every [`Debouncer::touch`] pushes the deadline out by one window and
//! invalidates all earlier tokens. Only the latest token can fire.

use std::time::Duration;

/// Default coalescing window.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Identifies one arming of the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DebounceToken(u64);

/// Resettable one-shot timer.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    generation: u64,
    deadline: Option<Duration>,
}

impl Debouncer {
    /// Create a disarmed timer with the given window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            generation: 0,
            deadline: None,
        }
    }

    /// The coalescing window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record an input at `now`, (re)arming the timer.
    pub fn touch(&mut self, now: Duration) -> DebounceToken {
        self.generation = self.generation.wrapping_add(1);
        self.deadline = Some(now + self.window);
        DebounceToken(self.generation)
    }

    /// The current token and deadline, if armed.
    pub fn pending(&self) -> Option<(DebounceToken, Duration)> {
        self.deadline
            .map(|deadline| (DebounceToken(self.generation), deadline))
    }

    /// Check if the timer is armed.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Try to fire the timer.
    ///
    /// Returns true (and disarms) only if `token` is the latest token and
    /// `now` has reached the deadline. Stale tokens never fire.
    pub fn fire(&mut self, token: DebounceToken, now: Duration) -> bool {
        match self.deadline {
            Some(deadline) if token.0 == self.generation && now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Disarm without firing.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

/// Map a stream of input times to the times the debounced output fires.
///
/// Input times must be non-decreasing. An input landing exactly on a
/// deadline arrives after the timer fired.
pub fn coalesce<I>(inputs: I, window: Duration) -> Vec<Duration>
where
    I: IntoIterator<Item = Duration>,
{
    let mut debouncer = Debouncer::new(window);
    let mut fired = Vec::new();

    for now in inputs {
        if let Some((token, deadline)) = debouncer.pending() {
            if debouncer.fire(token, now) {
                fired.push(deadline);
            }
        }
        debouncer.touch(now);
    }

    if let Some((token, deadline)) = debouncer.pending() {
        if debouncer.fire(token, deadline) {
            fired.push(deadline);
        }
    }

    fired
}
