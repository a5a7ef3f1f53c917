/// WorldState: everything above a single round.
///
/// The round engine owns tiles, timers and score. This layer owns which
/// screen is showing, the selected difficulty, the keyboard cursor,
/// transient messages, and what happens once a playthrough ends
/// (score submission, best-score check, game-over summary).

use crate::config::GameConfig;
use crate::domain::difficulty::Difficulty;
use crate::domain::score::record_if_best;
use crate::sim::event::{Cue, FailReason, GameEvent, Outcome};
use crate::sim::round::RoundEngine;
use crate::sim::save::{ScoreEntry, ScoreStore};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Title,
    Help,
    Scoreboard,
    Playing,
    GameOver,
}

/// Result of the last finished playthrough, shown on the game-over screen.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub score: u32,
    pub level: u32,
    pub difficulty: Difficulty,
    pub reason: Option<FailReason>,
    pub new_best: bool,
    pub quote: usize,
}

pub struct WorldState {
    pub phase: Phase,
    pub difficulty: Difficulty,
    pub player_name: String,
    pub engine: RoundEngine,

    // ── Selection cursor (keyboard / gamepad taps) ──
    pub cursor: usize,

    // ── Results ──
    pub best_score: u32,
    pub last_run: Option<RunSummary>,
    last_failure: Option<FailReason>,

    // ── UI ──
    pub sound_enabled: bool,
    pub message: String,
    pub message_timer: u32,
    pub anim_tick: u32,
}

// ── Construction ──

impl WorldState {
    pub fn new(config: &GameConfig, best_score: u32) -> Self {
        WorldState {
            phase: Phase::Title,
            difficulty: config.difficulty,
            player_name: config.player_name.clone(),
            engine: RoundEngine::new(config.difficulty.profile(), config.timing.clone(), config.seed),
            cursor: 0,
            best_score,
            last_run: None,
            last_failure: None,
            sound_enabled: config.sound,
            message: String::new(),
            message_timer: 0,
            anim_tick: 0,
        }
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }
}

// ── Navigation ──

impl WorldState {
    pub fn start_game(&mut self) -> Vec<GameEvent> {
        self.phase = Phase::Playing;
        self.cursor = 0;
        self.last_failure = None;
        self.anim_tick = 0;
        self.message.clear();
        self.message_timer = 0;
        self.engine.start_playthrough(self.difficulty.profile())
    }

    /// Title-screen difficulty toggle. Entering Extreme screams.
    pub fn cycle_difficulty(&mut self) -> Vec<GameEvent> {
        self.difficulty = self.difficulty.next();
        log::info!("difficulty: {}", self.difficulty.name());
        if self.difficulty == Difficulty::Extreme {
            vec![GameEvent::Cue(Cue::Scream)]
        } else {
            vec![GameEvent::Cue(Cue::Tap)]
        }
    }

    /// Title-screen sound switch. The choice is remembered by the store;
    /// a failed write only costs persistence.
    pub fn toggle_sound(&mut self, store: &mut dyn ScoreStore) -> Vec<GameEvent> {
        self.sound_enabled = !self.sound_enabled;
        log::info!("sound {}", if self.sound_enabled { "on" } else { "off" });
        if let Err(e) = store.set_sound_enabled(self.sound_enabled) {
            log::warn!("sound setting not saved: {e}");
        }
        if self.sound_enabled {
            self.set_message("Sound on", 20);
            vec![GameEvent::Cue(Cue::Tap)]
        } else {
            self.set_message("Sound off", 20);
            Vec::new()
        }
    }

    /// Leave whatever is running and show the title screen. A failed
    /// playthrough still yields `RoundEnded`, so its score is submitted
    /// once the events are applied.
    pub fn return_to_title(&mut self) -> Vec<GameEvent> {
        let events = self.engine.quit();
        self.phase = Phase::Title;
        self.anim_tick = 0;
        events
    }

    pub fn open(&mut self, phase: Phase) {
        self.phase = phase;
        self.anim_tick = 0;
    }
}

// ── Play input ──

impl WorldState {
    /// Move the selection cursor, clamped to the grid.
    pub fn move_cursor(&mut self, dx: i32, dy: i32) {
        let (cols, rows) = self.engine.grid();
        if cols == 0 || rows == 0 {
            return;
        }
        let x = (self.cursor % cols) as i32 + dx;
        let y = (self.cursor / cols) as i32 + dy;
        let x = x.clamp(0, cols as i32 - 1) as usize;
        let y = y.clamp(0, rows as i32 - 1) as usize;
        self.cursor = y * cols + x;
    }

    pub fn tap_cursor(&mut self) -> Vec<GameEvent> {
        self.engine.tap(self.cursor)
    }

    /// Direct tap (mouse). Also moves the cursor there.
    pub fn tap_cell(&mut self, cell: usize) -> Vec<GameEvent> {
        if cell < self.engine.tiles().len() {
            self.cursor = cell;
        }
        self.engine.tap(cell)
    }
}

// ── Per-tick update ──

impl WorldState {
    pub fn tick(&mut self, dt_ms: u32) -> Vec<GameEvent> {
        self.anim_tick = self.anim_tick.wrapping_add(1);
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 {
                self.message.clear();
            }
        }
        if self.phase == Phase::Playing {
            self.engine.tick(dt_ms)
        } else {
            Vec::new()
        }
    }

    /// React to engine events: level messages, end of playthrough.
    pub fn apply_events(&mut self, events: &[GameEvent], store: &mut dyn ScoreStore) {
        for event in events {
            match *event {
                GameEvent::Resolved { outcome: Outcome::Failed(reason), .. } => {
                    self.last_failure = Some(reason);
                    let text = match reason {
                        FailReason::WrongOrder => "Wrong order!",
                        FailReason::Timeout => "Time's up!",
                    };
                    self.set_message(text, 60);
                }
                GameEvent::LevelUp { level, bonus } => {
                    self.cursor = 0;
                    self.set_message(&format!("Level {}  +{} bonus", level, bonus), 20);
                }
                GameEvent::RoundEnded { score, level } => {
                    self.finish_playthrough(score, level, store);
                }
                GameEvent::Quit { .. } => {
                    self.phase = Phase::Title;
                }
                _ => {}
            }
        }
    }

    /// Submit the final score, compare against the best, show the summary.
    /// Store failures are logged; they never block the game-over screen.
    fn finish_playthrough(&mut self, score: u32, level: u32, store: &mut dyn ScoreStore) {
        let entry = ScoreEntry {
            name: self.player_name.clone(),
            score,
            difficulty: self.difficulty,
        };
        if let Err(e) = store.submit_score(entry) {
            log::warn!("score submission failed: {e}");
        }

        let new_best = record_if_best(score, self.best_score);
        if let Some(best) = new_best {
            self.best_score = best;
            if let Err(e) = store.set_best_score(best) {
                log::warn!("best score not saved: {e}");
            }
        }

        self.last_run = Some(RunSummary {
            score,
            level,
            difficulty: self.difficulty,
            reason: self.last_failure.take(),
            new_best: new_best.is_some(),
            quote: rand::random_range(0..usize::MAX),
        });
        // Leaving the review pause early already put the title screen up.
        if self.phase == Phase::Playing {
            self.phase = Phase::GameOver;
            self.anim_tick = 0;
        }
    }
}
