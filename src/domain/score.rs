/// Score ledger for one playthrough.
///
/// `current` only ever grows until a new playthrough resets it.
/// The best score is owned by the persistence side; this module only compares.

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScoreLedger {
    current: u32,
}

impl ScoreLedger {
    pub fn new() -> Self {
        ScoreLedger { current: 0 }
    }

    pub fn reset(&mut self) {
        self.current = 0;
    }

    pub fn add_points(&mut self, n: u32) {
        self.current = self.current.saturating_add(n);
    }

    /// Adds `floor(current * (multiplier - 1))` and returns the bonus.
    /// Multipliers below 1.0 yield no bonus rather than a deduction.
    pub fn add_level_up_bonus(&mut self, multiplier: f64) -> u32 {
        let bonus = level_up_bonus(self.current, multiplier);
        self.add_points(bonus);
        bonus
    }

    pub fn current_score(&self) -> u32 {
        self.current
    }

    /// Score to hand to the submission collaborator. Persists nothing.
    pub fn finalize_round(&self) -> u32 {
        self.current
    }
}

pub fn level_up_bonus(score: u32, multiplier: f64) -> u32 {
    let extra = (multiplier - 1.0).max(0.0);
    (score as f64 * extra).floor() as u32
}

/// Returns the new best when `score` beats `best`.
pub fn record_if_best(score: u32, best: u32) -> Option<u32> {
    if score > best { Some(score) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_accumulate() {
        let mut l = ScoreLedger::new();
        for _ in 0..5 { l.add_points(3); }
        assert_eq!(l.current_score(), 15);
    }

    #[test]
    fn bonus_is_floored() {
        let mut l = ScoreLedger::new();
        l.add_points(4);
        // 4 * 0.3 = 1.2 → 1
        assert_eq!(l.add_level_up_bonus(1.3), 1);
        assert_eq!(l.current_score(), 5);
    }

    #[test]
    fn bonus_doubles_with_multiplier_two() {
        let mut l = ScoreLedger::new();
        l.add_points(12);
        assert_eq!(l.add_level_up_bonus(2.0), 12);
        assert_eq!(l.current_score(), 24);
    }

    #[test]
    fn bonus_never_negative() {
        let mut l = ScoreLedger::new();
        l.add_points(10);
        assert_eq!(l.add_level_up_bonus(0.5), 0);
        assert_eq!(l.current_score(), 10);
    }

    #[test]
    fn finalize_keeps_score() {
        let mut l = ScoreLedger::new();
        l.add_points(7);
        assert_eq!(l.finalize_round(), 7);
        assert_eq!(l.current_score(), 7);
        l.reset();
        assert_eq!(l.current_score(), 0);
    }

    #[test]
    fn best_comparison() {
        assert_eq!(record_if_best(10, 5), Some(10));
        assert_eq!(record_if_best(5, 5), None);
        assert_eq!(record_if_best(0, 3), None);
    }
}
