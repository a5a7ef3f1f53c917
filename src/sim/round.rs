/// Round state machine: the core of a playthrough.
///
/// Phase flow for one round:
///   Idle → Revealing → Memorizing → AwaitingInput → Resolved(outcome)
///
/// A cleared level pauses briefly and then starts the next round at
/// `level + 1`. A failure re-shows every number for the review pause and
/// then drops back to Idle with `RoundEnded`. All timing runs through the
/// single `Countdown` slot, so at most one timer is ever pending.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::TimingConfig;
use crate::domain::difficulty::DifficultyProfile;
use crate::domain::layout::{generate_layout, RoundLayout};
use crate::domain::score::ScoreLedger;
use crate::domain::tile::TileState;
use crate::sim::event::{Cue, FailReason, GameEvent, Outcome};
use crate::sim::timer::{memorize_duration_ms, play_duration_ms, Countdown, TimerPurpose};

/// CountdownTick fires once per second inside this final stretch.
const WARN_SECONDS: u32 = 3;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RoundPhase {
    Idle,
    Revealing,
    Memorizing,
    AwaitingInput,
    Resolved(Outcome),
}

/// Snapshot handed to the renderer each frame.
pub struct RenderState<'a> {
    pub tiles: &'a [TileState],
    /// Tapped cells in order; on a wrong-order failure the last one is the culprit.
    pub history: &'a [usize],
    pub cols: usize,
    pub rows: usize,
    pub phase: RoundPhase,
    pub countdown_remaining_ms: u32,
    pub countdown_total_ms: u32,
    pub countdown_progress: f32,
    pub score: u32,
    pub level: u32,
}

pub struct RoundEngine {
    profile: DifficultyProfile,
    timing: TimingConfig,
    rng: StdRng,
    phase: RoundPhase,
    level: u32,
    ledger: ScoreLedger,
    cols: usize,
    rows: usize,
    tiles: Vec<TileState>,
    history: Vec<usize>,
    last_accepted: Option<u32>,
    countdown: Countdown,
    last_warn_second: Option<u32>,
}

impl RoundEngine {
    /// A fixed `seed` makes every layout reproducible.
    pub fn new(profile: DifficultyProfile, timing: TimingConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        let (cols, rows) = profile.grid;
        RoundEngine {
            profile,
            timing,
            rng,
            phase: RoundPhase::Idle,
            level: 1,
            ledger: ScoreLedger::new(),
            cols,
            rows,
            tiles: Vec::new(),
            history: Vec::new(),
            last_accepted: None,
            countdown: Countdown::new(),
            last_warn_second: None,
        }
    }

    // ── Accessors ──

    #[cfg(test)]
    pub fn phase(&self) -> RoundPhase { self.phase }
    #[cfg(test)]
    pub fn level(&self) -> u32 { self.level }
    pub fn score(&self) -> u32 { self.ledger.current_score() }
    pub fn profile(&self) -> &DifficultyProfile { &self.profile }
    pub fn tiles(&self) -> &[TileState] { &self.tiles }
    #[cfg(test)]
    pub fn history(&self) -> &[usize] { &self.history }
    pub fn grid(&self) -> (usize, usize) { (self.cols, self.rows) }
    #[cfg(test)]
    pub fn countdown(&self) -> &Countdown { &self.countdown }

    pub fn render_state(&self) -> RenderState<'_> {
        RenderState {
            tiles: &self.tiles,
            history: &self.history,
            cols: self.cols,
            rows: self.rows,
            phase: self.phase,
            countdown_remaining_ms: self.countdown.remaining_ms(),
            countdown_total_ms: self.countdown.total_ms(),
            countdown_progress: self.countdown.progress(),
            score: self.ledger.current_score(),
            level: self.level,
        }
    }

    // ── Lifecycle ──

    /// Fresh playthrough at level 1 with a zero score.
    pub fn start_playthrough(&mut self, profile: DifficultyProfile) -> Vec<GameEvent> {
        log::info!("playthrough start: {}", profile.difficulty.name());
        self.profile = profile;
        self.level = 1;
        self.ledger.reset();
        self.start_round()
    }

    /// New layout for the current level.
    pub fn start_round(&mut self) -> Vec<GameEvent> {
        let layout = generate_layout(&mut self.rng, &self.profile, self.level);
        self.start_round_with(layout)
    }

    /// Start a round on an explicit layout.
    pub fn start_round_with(&mut self, layout: RoundLayout) -> Vec<GameEvent> {
        self.cols = layout.cols();
        self.rows = layout.rows();
        self.tiles = layout.values().iter().map(|&v| TileState::new(v)).collect();
        self.history.clear();
        self.last_accepted = None;
        self.last_warn_second = None;
        self.phase = RoundPhase::Revealing;
        self.countdown.start(self.timing.reveal_ms, TimerPurpose::Reveal);
        log::debug!("level {} layout {:?}", self.level, layout.values());
        vec![GameEvent::Cue(Cue::Whoosh)]
    }

    /// Leave the round. Pending timers are dropped; nothing fires later.
    ///
    /// An unresolved round is abandoned with `Quit`. A failed round is
    /// already over, so leaving its review pause ends the playthrough
    /// early with `RoundEnded` and the score still counts.
    pub fn quit(&mut self) -> Vec<GameEvent> {
        let previous = self.phase;
        if previous == RoundPhase::Idle {
            return Vec::new();
        }
        self.countdown.cancel();
        self.phase = RoundPhase::Idle;

        if let RoundPhase::Resolved(Outcome::Failed(_)) = previous {
            log::info!("review skipped: level {} score {}", self.level, self.score());
            return vec![GameEvent::RoundEnded {
                score: self.ledger.finalize_round(),
                level: self.level,
            }];
        }
        log::info!("quit at level {} with score {}", self.level, self.score());
        vec![GameEvent::Quit { score: self.ledger.current_score() }]
    }

    // ── Input ──

    /// Tap a cell (row-major index). Ignored outside AwaitingInput, for
    /// cells already tapped this round, and for indices off the grid.
    pub fn tap(&mut self, cell: usize) -> Vec<GameEvent> {
        if self.phase != RoundPhase::AwaitingInput {
            return Vec::new();
        }
        let value = match self.tiles.get(cell) {
            Some(t) if t.is_tappable() => t.value,
            _ => return Vec::new(),
        };

        log::debug!("tap cell {cell} value {value}");
        let tile = &mut self.tiles[cell];
        tile.selected = true;
        tile.reveal();
        self.history.push(cell);

        let mut events = vec![GameEvent::Cue(Cue::Tap)];

        if let Some(previous) = self.last_accepted {
            if !in_order(previous, value) {
                events.push(GameEvent::TileRejected { cell, value, previous });
                self.resolve_failure(FailReason::WrongOrder, &mut events);
                return events;
            }
        }

        let points = self.profile.points_per_tile;
        self.last_accepted = Some(value);
        self.ledger.add_points(points);
        events.push(GameEvent::TileAccepted { cell, value, points });

        if self.history.len() == self.tiles.len() {
            self.resolve_level_complete(&mut events);
        }
        events
    }

    // ── Time ──

    /// Advance the pending countdown by `dt_ms` and act on whatever elapsed.
    pub fn tick(&mut self, dt_ms: u32) -> Vec<GameEvent> {
        let mut events = Vec::new();

        let Some(purpose) = self.countdown.tick(dt_ms) else {
            if self.phase == RoundPhase::AwaitingInput {
                self.warn_tick(&mut events);
            }
            return events;
        };

        match purpose {
            TimerPurpose::Reveal => {
                self.phase = RoundPhase::Memorizing;
                let ms = memorize_duration_ms(&self.timing, self.profile.time_multiplier, self.level);
                self.countdown.start(ms, TimerPurpose::Memorize);
            }
            TimerPurpose::Memorize => {
                for t in &mut self.tiles {
                    t.hide();
                }
                self.phase = RoundPhase::AwaitingInput;
                let ms = play_duration_ms(&self.timing, self.profile.time_multiplier, self.level);
                self.countdown.start(ms, TimerPurpose::Play);
                self.last_warn_second = None;
                events.push(GameEvent::Cue(Cue::Hide));
                events.push(GameEvent::Cue(Cue::Beep));
            }
            TimerPurpose::Play => {
                if self.phase == RoundPhase::AwaitingInput {
                    self.resolve_failure(FailReason::Timeout, &mut events);
                }
            }
            TimerPurpose::LevelClear => {
                events.extend(self.start_round());
            }
            TimerPurpose::Review => {
                self.phase = RoundPhase::Idle;
                log::info!("playthrough over: level {} score {}", self.level, self.score());
                events.push(GameEvent::RoundEnded {
                    score: self.ledger.finalize_round(),
                    level: self.level,
                });
            }
        }
        events
    }

    fn warn_tick(&mut self, events: &mut Vec<GameEvent>) {
        let secs_left = self.countdown.remaining_ms().div_ceil(1000);
        if secs_left == 0 || secs_left > WARN_SECONDS {
            return;
        }
        if self.last_warn_second != Some(secs_left) {
            self.last_warn_second = Some(secs_left);
            events.push(GameEvent::Cue(Cue::CountdownTick));
        }
    }

    // ── Resolution ──

    fn resolve_level_complete(&mut self, events: &mut Vec<GameEvent>) {
        self.countdown.cancel();
        self.phase = RoundPhase::Resolved(Outcome::LevelComplete);

        let bonus = self.ledger.add_level_up_bonus(self.profile.bonus_multiplier);
        self.level += 1;
        log::info!("level cleared, bonus {bonus}, next level {}", self.level);

        events.push(GameEvent::Cue(Cue::Success));
        events.push(GameEvent::Resolved {
            outcome: Outcome::LevelComplete,
            score: self.ledger.current_score(),
        });
        events.push(GameEvent::LevelUp { level: self.level, bonus });

        self.countdown.start(self.timing.level_clear_ms, TimerPurpose::LevelClear);
    }

    fn resolve_failure(&mut self, reason: FailReason, events: &mut Vec<GameEvent>) {
        self.countdown.cancel();
        let outcome = Outcome::Failed(reason);
        self.phase = RoundPhase::Resolved(outcome);
        for t in &mut self.tiles {
            t.reveal();
        }
        log::info!("round failed ({reason:?}) at level {}", self.level);

        events.push(GameEvent::Cue(Cue::Failure));
        events.push(GameEvent::Resolved { outcome, score: self.ledger.current_score() });

        self.countdown.start(self.timing.review_ms, TimerPurpose::Review);
    }
}

/// Ordering rule for consecutive taps. Only a strictly lower value breaks
/// the sequence; an equal value is accepted.
fn in_order(previous: u32, value: u32) -> bool {
    value >= previous
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::difficulty::Difficulty;

    fn engine(d: Difficulty) -> RoundEngine {
        RoundEngine::new(d.profile(), TimingConfig::default(), Some(7))
    }

    /// Engine in AwaitingInput on a fixed 2x2 board.
    fn ready(values: [u32; 4]) -> RoundEngine {
        let mut e = engine(Difficulty::Easy);
        let layout = RoundLayout::from_values(2, 2, values.to_vec()).unwrap();
        e.start_round_with(layout);
        run_until(&mut e, |e| e.phase() == RoundPhase::AwaitingInput);
        e
    }

    fn run_until(e: &mut RoundEngine, done: impl Fn(&RoundEngine) -> bool) -> Vec<GameEvent> {
        let mut all = Vec::new();
        for _ in 0..10_000 {
            if done(e) {
                return all;
            }
            all.extend(e.tick(50));
        }
        panic!("condition never reached, phase {:?}", e.phase());
    }

    fn tap_in_order(e: &mut RoundEngine) -> Vec<GameEvent> {
        let mut order: Vec<usize> = (0..e.tiles().len()).collect();
        order.sort_by_key(|&i| e.tiles()[i].value);
        order.into_iter().flat_map(|i| e.tap(i)).collect()
    }

    #[test]
    fn starts_idle() {
        let e = engine(Difficulty::Easy);
        assert_eq!(e.phase(), RoundPhase::Idle);
        assert_eq!(e.score(), 0);
        assert_eq!(e.level(), 1);
    }

    #[test]
    fn phases_run_in_order() {
        let mut e = engine(Difficulty::Easy);
        let ev = e.start_playthrough(Difficulty::Easy.profile());
        assert_eq!(ev, vec![GameEvent::Cue(Cue::Whoosh)]);
        assert_eq!(e.phase(), RoundPhase::Revealing);
        assert!(e.tiles().iter().all(|t| t.revealed));

        run_until(&mut e, |e| e.phase() == RoundPhase::Memorizing);
        // Easy level 1: 2500 * 1.5
        assert_eq!(e.countdown().total_ms(), 3750);

        let ev = run_until(&mut e, |e| e.phase() == RoundPhase::AwaitingInput);
        assert!(ev.contains(&GameEvent::Cue(Cue::Hide)));
        assert!(ev.contains(&GameEvent::Cue(Cue::Beep)));
        assert!(e.tiles().iter().all(|t| !t.revealed));
        // Easy level 1: 3500 * 1.5
        assert_eq!(e.countdown().total_ms(), 5250);
    }

    #[test]
    fn taps_ignored_before_input_window() {
        let mut e = engine(Difficulty::Easy);
        e.start_playthrough(Difficulty::Easy.profile());
        assert!(e.tap(0).is_empty());
        run_until(&mut e, |e| e.phase() == RoundPhase::Memorizing);
        assert!(e.tap(0).is_empty());
        assert!(e.history().is_empty());
        assert_eq!(e.score(), 0);
    }

    #[test]
    fn ascending_taps_clear_the_level() {
        let mut e = ready([3, 1, 4, 2]);
        let ev: Vec<_> = [1, 3, 0, 2].iter().flat_map(|&c| e.tap(c)).collect();

        assert_eq!(e.phase(), RoundPhase::Resolved(Outcome::LevelComplete));
        // 4 tiles * 1 point, then bonus floor(4 * 0.3) = 1
        assert_eq!(e.score(), 5);
        assert_eq!(e.level(), 2);
        assert!(ev.contains(&GameEvent::LevelUp { level: 2, bonus: 1 }));
        assert!(ev.contains(&GameEvent::Cue(Cue::Success)));
    }

    #[test]
    fn descending_tap_fails_with_wrong_order() {
        let mut e = ready([3, 1, 4, 2]);
        e.tap(0);
        let ev = e.tap(1);

        assert_eq!(e.phase(), RoundPhase::Resolved(Outcome::Failed(FailReason::WrongOrder)));
        assert!(ev.contains(&GameEvent::TileRejected { cell: 1, value: 1, previous: 3 }));
        assert_eq!(e.score(), 1);
        // All numbers shown for review.
        assert!(e.tiles().iter().all(|t| t.revealed));
    }

    #[test]
    fn no_points_after_failure() {
        let mut e = ready([3, 1, 4, 2]);
        e.tap(0);
        e.tap(1);
        let score = e.score();
        assert!(e.tap(2).is_empty());
        assert!(e.tap(3).is_empty());
        assert_eq!(e.score(), score);
    }

    #[test]
    fn first_tap_is_always_accepted() {
        let mut e = ready([3, 1, 4, 2]);
        let ev = e.tap(2);
        assert!(ev.contains(&GameEvent::TileAccepted { cell: 2, value: 4, points: 1 }));
        assert_eq!(e.phase(), RoundPhase::AwaitingInput);
    }

    #[test]
    fn retap_and_out_of_range_are_ignored() {
        let mut e = ready([3, 1, 4, 2]);
        e.tap(1);
        assert!(e.tap(1).is_empty());
        assert!(e.tap(99).is_empty());
        assert_eq!(e.history(), &[1]);
        assert_eq!(e.score(), 1);
    }

    #[test]
    fn tapped_tiles_are_revealed() {
        let mut e = ready([3, 1, 4, 2]);
        e.tap(1);
        assert!(e.tiles()[1].revealed);
        assert!(e.tiles()[1].selected);
        assert!(!e.tiles()[0].revealed);
    }

    #[test]
    fn idle_timeout_fails_the_round() {
        let mut e = ready([3, 1, 4, 2]);
        let ev = run_until(&mut e, |e| matches!(e.phase(), RoundPhase::Resolved(_)));
        assert_eq!(e.phase(), RoundPhase::Resolved(Outcome::Failed(FailReason::Timeout)));
        assert!(ev.contains(&GameEvent::Cue(Cue::Failure)));
    }

    #[test]
    fn countdown_ticks_in_last_seconds() {
        let mut e = ready([3, 1, 4, 2]);
        let ev = run_until(&mut e, |e| matches!(e.phase(), RoundPhase::Resolved(_)));
        let ticks = ev.iter().filter(|&x| *x == GameEvent::Cue(Cue::CountdownTick)).count();
        assert_eq!(ticks, 3);
    }

    #[test]
    fn failure_review_ends_playthrough() {
        let mut e = ready([3, 1, 4, 2]);
        e.tap(0);
        e.tap(1);
        let ev = run_until(&mut e, |e| e.phase() == RoundPhase::Idle);
        assert!(ev.contains(&GameEvent::RoundEnded { score: 1, level: 1 }));
    }

    #[test]
    fn next_round_starts_after_level_clear() {
        let mut e = ready([3, 1, 4, 2]);
        tap_in_order(&mut e);
        let ev = run_until(&mut e, |e| e.phase() == RoundPhase::Revealing);
        assert!(ev.contains(&GameEvent::Cue(Cue::Whoosh)));
        assert_eq!(e.level(), 2);
        assert!(e.history().is_empty());
        assert!(e.tiles().iter().all(|t| t.revealed && !t.selected));
    }

    #[test]
    fn no_timeout_after_completion() {
        let mut e = ready([3, 1, 4, 2]);
        tap_in_order(&mut e);
        // Clear pause elapses into the next round; the old play timer never fires.
        let ev = run_until(&mut e, |e| e.phase() == RoundPhase::Revealing);
        assert!(!ev.iter().any(|x| matches!(x, GameEvent::Resolved { .. })));
    }

    #[test]
    fn quit_cancels_everything() {
        let mut e = ready([3, 1, 4, 2]);
        e.tap(1);
        let ev = e.quit();
        assert_eq!(ev, vec![GameEvent::Quit { score: 1 }]);
        assert_eq!(e.phase(), RoundPhase::Idle);
        for _ in 0..500 {
            assert!(e.tick(50).is_empty());
        }
        assert!(e.quit().is_empty());
    }

    #[test]
    fn leaving_failure_review_still_ends_playthrough() {
        let mut e = ready([3, 1, 4, 2]);
        e.tap(1);
        e.tap(0);
        e.tap(3);
        assert_eq!(e.phase(), RoundPhase::Resolved(Outcome::Failed(FailReason::WrongOrder)));
        let ev = e.quit();
        assert_eq!(ev, vec![GameEvent::RoundEnded { score: 2, level: 1 }]);
        assert_eq!(e.phase(), RoundPhase::Idle);
        for _ in 0..500 {
            assert!(e.tick(50).is_empty());
        }
    }

    #[test]
    fn leaving_level_clear_pause_is_a_quit() {
        let mut e = ready([3, 1, 4, 2]);
        tap_in_order(&mut e);
        assert_eq!(e.quit(), vec![GameEvent::Quit { score: 5 }]);
    }

    #[test]
    fn equal_values_keep_the_order() {
        assert!(in_order(4, 4));
        assert!(in_order(4, 5));
        assert!(!in_order(4, 3));
        assert!(in_order(0, 0));
    }

    #[test]
    fn generated_playthrough_scores_and_levels_up() {
        let mut e = engine(Difficulty::Medium);
        e.start_playthrough(Difficulty::Medium.profile());
        for level in 1..=3 {
            run_until(&mut e, |e| e.phase() == RoundPhase::AwaitingInput);
            assert_eq!(e.level(), level);
            assert_eq!(e.tiles().len(), 6);
            tap_in_order(&mut e);
            assert_eq!(e.phase(), RoundPhase::Resolved(Outcome::LevelComplete));
        }
        assert_eq!(e.level(), 4);
        assert!(e.score() > 0);
    }

    #[test]
    fn score_never_decreases() {
        let mut e = engine(Difficulty::Hard);
        e.start_playthrough(Difficulty::Hard.profile());
        let mut prev = 0;
        for _ in 0..2 {
            run_until(&mut e, |e| e.phase() == RoundPhase::AwaitingInput);
            let mut order: Vec<usize> = (0..e.tiles().len()).collect();
            order.sort_by_key(|&i| e.tiles()[i].value);
            for i in order {
                e.tap(i);
                assert!(e.score() >= prev);
                prev = e.score();
            }
        }
    }

    #[test]
    fn restart_resets_score_and_level() {
        let mut e = ready([3, 1, 4, 2]);
        tap_in_order(&mut e);
        e.quit();
        e.start_playthrough(Difficulty::Hard.profile());
        assert_eq!(e.score(), 0);
        assert_eq!(e.level(), 1);
        assert_eq!(e.tiles().len(), 9);
    }
}
