/// Timing coordinator: one cancelable countdown per round.
///
/// The countdown is a slot, not a queue. Starting a new countdown replaces
/// whatever was pending, so a stale timer can never fire into a round that
/// has already moved on. `tick()` reports which purpose elapsed; the round
/// state machine decides what that means.
///
/// Durations:
///   memorize = memorize_base · timeMultiplier · decay^(level-1)
///   play     = play_base     · timeMultiplier · decay^(level-1)
/// each clamped to `min_countdown_ms`.

use crate::config::TimingConfig;

/// What the pending countdown is for.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TimerPurpose {
    /// Cosmetic pause with numbers visible, before the memorize countdown.
    Reveal,
    /// Numbers visible; hiding them when this elapses.
    Memorize,
    /// Player input window; elapsing means timeout.
    Play,
    /// Short pause after a cleared level before the next layout.
    LevelClear,
    /// All numbers re-shown after a failure.
    Review,
}

#[derive(Clone, Copy, Debug)]
struct Pending {
    purpose: TimerPurpose,
    remaining_ms: u32,
    total_ms: u32,
}

#[derive(Clone, Debug, Default)]
pub struct Countdown {
    pending: Option<Pending>,
}

impl Countdown {
    pub fn new() -> Self {
        Countdown { pending: None }
    }

    /// Begin a countdown, cancelling any that is still pending.
    pub fn start(&mut self, duration_ms: u32, purpose: TimerPurpose) {
        if let Some(old) = self.pending {
            log::debug!("countdown {:?} replaced by {:?}", old.purpose, purpose);
        }
        self.pending = Some(Pending {
            purpose,
            remaining_ms: duration_ms,
            total_ms: duration_ms,
        });
    }

    /// Stop the active countdown. No-op when idle.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    #[allow(dead_code)]
    pub fn is_active(&self) -> bool {
        self.pending.is_some()
    }

    #[allow(dead_code)]
    pub fn purpose(&self) -> Option<TimerPurpose> {
        self.pending.map(|p| p.purpose)
    }

    pub fn remaining_ms(&self) -> u32 {
        self.pending.map_or(0, |p| p.remaining_ms)
    }

    pub fn total_ms(&self) -> u32 {
        self.pending.map_or(0, |p| p.total_ms)
    }

    /// Remaining fraction: 1.0 just started → 0.0 elapsed.
    pub fn progress(&self) -> f32 {
        match self.pending {
            Some(p) if p.total_ms > 0 => p.remaining_ms as f32 / p.total_ms as f32,
            _ => 0.0,
        }
    }

    /// Advance by `dt_ms`. Returns the purpose if the countdown just elapsed;
    /// the slot is then empty.
    pub fn tick(&mut self, dt_ms: u32) -> Option<TimerPurpose> {
        let p = self.pending.as_mut()?;
        p.remaining_ms = p.remaining_ms.saturating_sub(dt_ms);
        if p.remaining_ms == 0 {
            let purpose = p.purpose;
            self.pending = None;
            Some(purpose)
        } else {
            None
        }
    }
}

/// Level decay factor: `decay^(level-1)`.
pub fn level_decay(decay: f64, level: u32) -> f64 {
    decay.powi(level.saturating_sub(1) as i32)
}

fn scaled(base_ms: u32, time_multiplier: f64, level: u32, timing: &TimingConfig) -> u32 {
    let ms = base_ms as f64 * time_multiplier * level_decay(timing.level_decay, level);
    (ms.round() as u32).max(timing.min_countdown_ms)
}

/// Length of the window in which numbers stay visible.
pub fn memorize_duration_ms(timing: &TimingConfig, time_multiplier: f64, level: u32) -> u32 {
    scaled(timing.memorize_base_ms, time_multiplier, level, timing)
}

/// Length of the input window.
pub fn play_duration_ms(timing: &TimingConfig, time_multiplier: f64, level: u32) -> u32 {
    scaled(timing.play_base_ms, time_multiplier, level, timing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_elapses_once() {
        let mut c = Countdown::new();
        c.start(100, TimerPurpose::Play);
        assert_eq!(c.tick(40), None);
        assert_eq!(c.remaining_ms(), 60);
        assert_eq!(c.tick(60), Some(TimerPurpose::Play));
        assert!(!c.is_active());
        assert_eq!(c.tick(1000), None);
    }

    #[test]
    fn overshoot_still_fires() {
        let mut c = Countdown::new();
        c.start(30, TimerPurpose::Reveal);
        assert_eq!(c.tick(50), Some(TimerPurpose::Reveal));
    }

    #[test]
    fn restart_replaces_pending() {
        let mut c = Countdown::new();
        c.start(50, TimerPurpose::Memorize);
        c.start(200, TimerPurpose::Play);
        // The old 50ms countdown must not fire.
        assert_eq!(c.tick(50), None);
        assert_eq!(c.purpose(), Some(TimerPurpose::Play));
        assert_eq!(c.tick(150), Some(TimerPurpose::Play));
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut c = Countdown::new();
        c.cancel();
        c.start(10, TimerPurpose::Play);
        c.cancel();
        c.cancel();
        assert_eq!(c.tick(10), None);
        assert_eq!(c.progress(), 0.0);
    }

    #[test]
    fn progress_runs_down() {
        let mut c = Countdown::new();
        c.start(200, TimerPurpose::Play);
        assert!((c.progress() - 1.0).abs() < 1e-6);
        c.tick(50);
        assert!((c.progress() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn memorize_duration_formula() {
        let t = TimingConfig::default();
        // Easy: 2500 * 1.5 at level 1
        assert_eq!(memorize_duration_ms(&t, 1.5, 1), 3750);
        // level 2: * 0.9
        assert_eq!(memorize_duration_ms(&t, 1.5, 2), 3375);
        assert_eq!(play_duration_ms(&t, 2.0, 1), 7000);
    }

    #[test]
    fn durations_have_a_floor() {
        let t = TimingConfig::default();
        assert_eq!(memorize_duration_ms(&t, 1.5, 200), t.min_countdown_ms);
        assert_eq!(play_duration_ms(&t, 1.5, 200), t.min_countdown_ms);
        // Decay is monotonic until the floor.
        let mut prev = u32::MAX;
        for level in 1..60 {
            let d = play_duration_ms(&t, 3.0, level);
            assert!(d <= prev);
            assert!(d >= t.min_countdown_ms);
            prev = d;
        }
    }
}
