//! Millisecond countdowns driven by an external tick.
//!
//! A countdown is expired once it reaches zero and stays expired until it is
//! armed again. Arming always counts from the current tick, never from the
//! previous deadline, so a countdown nobody services just sits at zero. Fresh
//! countdowns start expired.

/// A saturating millisecond countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Countdown {
    remaining_ms: u32,
}

impl Countdown {
    /// An already-expired countdown.
    pub const EXPIRED: Self = Self { remaining_ms: 0 };

    /// Expire `ms` milliseconds from now.
    #[inline]
    pub fn arm(&mut self, ms: u32) {
        self.remaining_ms = ms;
    }

    /// Push the deadline out to at least `ms` from now, never pulling it in.
    #[inline]
    pub fn extend(&mut self, ms: u32) {
        self.remaining_ms = self.remaining_ms.max(ms);
    }

    /// Expire immediately.
    #[inline]
    pub fn expire(&mut self) {
        self.remaining_ms = 0;
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.remaining_ms == 0
    }

    #[inline]
    pub fn remaining_ms(&self) -> u32 {
        self.remaining_ms
    }

    #[inline]
    pub fn tick(&mut self, elapsed_ms: u32) {
        self.remaining_ms = self.remaining_ms.saturating_sub(elapsed_ms);
    }
}

/// The four node-wide countdowns of a propagation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timers {
    /// Liveness budget before giving up entirely.
    pub startup: Countdown,
    /// When to send the next unsolicited offer.
    pub probe: Countdown,
    /// Proof that some neighbor is still pulling through this node.
    pub active: Countdown,
    /// When to re-issue a request toward the source.
    pub retry: Countdown,
}

impl Timers {
    /// Advance every countdown by `elapsed_ms`.
    pub fn tick(&mut self, elapsed_ms: u32) {
        self.startup.tick(elapsed_ms);
        self.probe.tick(elapsed_ms);
        self.active.tick(elapsed_ms);
        self.retry.tick(elapsed_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_countdown_is_expired() {
        assert!(Countdown::default().is_expired());
        assert!(Timers::default().retry.is_expired());
    }

    #[test]
    fn countdown_saturates_at_zero() {
        let mut c = Countdown::default();
        c.arm(5);
        c.tick(3);
        assert!(!c.is_expired());
        assert_eq!(c.remaining_ms(), 2);
        c.tick(10);
        assert!(c.is_expired());
        c.tick(1);
        assert_eq!(c.remaining_ms(), 0);
    }

    #[test]
    fn rearm_counts_from_now() {
        let mut c = Countdown::default();
        c.arm(10);
        c.tick(8);
        c.arm(10);
        assert_eq!(c.remaining_ms(), 10);
    }

    #[test]
    fn extend_never_shortens() {
        let mut c = Countdown::default();
        c.arm(100);
        c.extend(40);
        assert_eq!(c.remaining_ms(), 100);
        c.extend(400);
        assert_eq!(c.remaining_ms(), 400);
    }

    #[test]
    fn tick_advances_all_timers() {
        let mut t = Timers::default();
        t.startup.arm(10);
        t.probe.arm(2);
        t.active.arm(5);
        t.retry.arm(1);
        t.tick(2);
        assert_eq!(t.startup.remaining_ms(), 8);
        assert!(t.probe.is_expired());
        assert_eq!(t.active.remaining_ms(), 3);
        assert!(t.retry.is_expired());
    }
}
