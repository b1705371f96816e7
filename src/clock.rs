//! Clock source, deadline timers, and pause accounting.
//!
//! Every scheduling decision runs off one monotonic microsecond timestamp
//! sampled once per loop iteration. Timers are `{period, deadline}` pairs: a
//! timer fires when `now` has passed the deadline, and either catches up in
//! whole periods (periodic timers) or is reset to an explicit new deadline
//! (one-shot delays such as lock, entry and clear).

use crate::rules;
use std::time::Instant;

/// Monotonic microsecond clock, origin at construction.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin: Instant,
}

impl Clock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn now(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

/// A single deadline timer.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    period: u64,
    deadline: u64,
}

impl Timer {
    pub fn new(period: u64, deadline: u64) -> Self {
        Self { period, deadline }
    }

    /// True exactly while `now` is past the deadline; callers advance or
    /// reset after acting, so a firing is consumed at most once.
    pub fn fires(&self, now: u64) -> bool {
        now > self.deadline
    }

    /// Still counting down: the banner-style timers use this for visibility.
    pub fn pending(&self, now: u64) -> bool {
        now <= self.deadline
    }

    /// Advance a periodic timer past `now` in whole periods. Keeps long-run
    /// phase after a stall without firing a burst.
    pub fn advance(&mut self, now: u64) {
        self.deadline += self.period;
        while self.deadline < now {
            self.deadline += self.period;
        }
    }

    /// One-shot reset: deadline moves to `now + period`.
    pub fn reset(&mut self, now: u64) {
        self.deadline = now + self.period;
    }

    /// One-shot reset with a different delay, leaving the stored period
    /// untouched (entry and clear delays applied to the gravity timer).
    pub fn reset_in(&mut self, now: u64, delay: u64) {
        self.deadline = now + delay;
    }

    /// Push the existing deadline further out.
    pub fn push(&mut self, extra: u64) {
        self.deadline += extra;
    }

    pub fn set_period(&mut self, period: u64) {
        self.period = period;
    }

    pub fn period(&self) -> u64 {
        self.period
    }
}

/// The full timer set owned by the control loop.
#[derive(Debug, Clone)]
pub struct Timers {
    pub frame: u64,
    pub display: Timer,
    pub control: Timer,
    pub gravity: Timer,
    pub lock: Timer,
    pub technique: Timer,
    pub levelup: Timer,
    pub entry_period: u64,
    pub clear_period: u64,
}

impl Timers {
    pub fn new(now: u64, frame: u64, gravity: u64, delay: u64) -> Self {
        Self {
            frame,
            display: Timer::new(frame, now),
            control: Timer::new(frame, now + frame),
            gravity: Timer::new(gravity, now),
            lock: Timer::new(delay, now),
            technique: Timer::new(rules::TECHNIQUE_FRAMES * frame, now),
            levelup: Timer::new(rules::LEVELUP_FRAMES * frame, now),
            entry_period: rules::ENTRY_FRAMES * frame,
            clear_period: delay,
        }
    }

    /// Re-derive the level-dependent periods after a promotion.
    pub fn apply_level(&mut self, gravity: u64, delay: u64) {
        self.gravity.set_period(gravity);
        self.lock.set_period(delay);
        self.clear_period = delay;
    }
}

/// Pause bookkeeping: paused spans accumulate and are excluded from the
/// displayed and reported play time. Deadlines of the other timers are left
/// alone on resume; the catch-up rule absorbs the gap.
#[derive(Debug, Clone, Copy, Default)]
pub struct PauseClock {
    paused: bool,
    accumulated: u64,
    since: u64,
}

impl PauseClock {
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn toggle(&mut self, now: u64) {
        if self.paused {
            self.accumulated += now.saturating_sub(self.since);
            self.paused = false;
        } else {
            self.paused = true;
            self.since = now;
        }
    }

    /// Wall time minus everything spent paused.
    pub fn play_micros(&self, now: u64) -> u64 {
        let base = now.saturating_sub(self.accumulated);
        if self.paused {
            base.saturating_sub(now.saturating_sub(self.since))
        } else {
            base
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_strictly_after_deadline() {
        let t = Timer::new(100, 1000);
        assert!(!t.fires(999));
        assert!(!t.fires(1000));
        assert!(t.fires(1001));
    }

    #[test]
    fn test_advance_keeps_phase_without_bursting() {
        let mut t = Timer::new(100, 1000);
        // the loop stalled well past several periods
        assert!(t.fires(1350));
        t.advance(1350);
        // caught up in whole periods: still on the original phase grid
        assert!(!t.fires(1350));
        assert!(t.fires(1401));
        t.advance(1401);
        assert!(t.fires(1501));
    }

    #[test]
    fn test_advance_single_period_when_on_time() {
        let mut t = Timer::new(100, 1000);
        t.advance(1001);
        assert!(!t.fires(1100));
        assert!(t.fires(1101));
    }

    #[test]
    fn test_reset_in_leaves_period_untouched() {
        let mut t = Timer::new(100, 0);
        t.reset_in(500, 30);
        assert!(!t.fires(530));
        assert!(t.fires(531));
        t.reset(531);
        assert!(t.fires(632));
        assert_eq!(t.period(), 100);
    }

    #[test]
    fn test_pause_accumulates_exact_duration() {
        let mut p = PauseClock::default();
        p.toggle(1_000_000);
        assert!(p.is_paused());
        // frozen while paused
        assert_eq!(p.play_micros(1_500_000), 1_000_000);
        p.toggle(3_000_000);
        assert!(!p.is_paused());
        assert_eq!(p.play_micros(3_000_000), 1_000_000);
        assert_eq!(p.play_micros(4_000_000), 2_000_000);
    }

    #[test]
    fn test_two_pauses_add_up() {
        let mut p = PauseClock::default();
        p.toggle(100);
        p.toggle(300);
        p.toggle(1000);
        p.toggle(1500);
        assert_eq!(p.play_micros(2000), 2000 - 200 - 500);
    }
}
