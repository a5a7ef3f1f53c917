/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to defaults if the file is missing, incomplete or unparsable.
/// An unknown difficulty name is the one hard error: it is rejected here,
/// before any round starts, instead of silently becoming Easy.

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::difficulty::{Difficulty, DifficultyError};

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub timing: TimingConfig,
    pub gamepad: GamepadConfig,
    pub difficulty: Difficulty,
    pub player_name: String,
    pub sound: bool,
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TimingConfig {
    pub tick_rate_ms: u64,
    pub reveal_ms: u32,          // numbers shown, input locked
    pub memorize_base_ms: u32,   // scaled by time multiplier and level decay
    pub play_base_ms: u32,       // ditto, for the input window
    pub level_decay: f64,        // per-level factor on both windows
    pub min_countdown_ms: u32,   // floor for decayed windows
    pub level_clear_ms: u32,
    pub review_ms: u32,          // numbers re-shown after a failure
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub cycle_difficulty: Vec<String>,
    pub toggle_sound: Vec<String>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config.toml: {0}")]
    Difficulty(#[from] DifficultyError),
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_reveal")]
    reveal_ms: u32,
    #[serde(default = "default_memorize_base")]
    memorize_base_ms: u32,
    #[serde(default = "default_play_base")]
    play_base_ms: u32,
    #[serde(default = "default_level_decay")]
    level_decay: f64,
    #[serde(default = "default_min_countdown")]
    min_countdown_ms: u32,
    #[serde(default = "default_level_clear")]
    level_clear_ms: u32,
    #[serde(default = "default_review")]
    review_ms: u32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
    #[serde(default = "default_cycle")]
    cycle_difficulty: Vec<String>,
    #[serde(default = "default_toggle_sound")]
    toggle_sound: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_difficulty")]
    difficulty: String,
    #[serde(default = "default_player_name")]
    player_name: String,
    #[serde(default = "default_sound")]
    sound: bool,
    #[serde(default)]
    seed: Option<u64>,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 50 }
fn default_reveal() -> u32 { 500 }
fn default_memorize_base() -> u32 { 2500 }
fn default_play_base() -> u32 { 3500 }
fn default_level_decay() -> f64 { 0.9 }
fn default_min_countdown() -> u32 { 500 }
fn default_level_clear() -> u32 { 1000 }
fn default_review() -> u32 { 3000 }

fn default_confirm() -> Vec<String> { vec!["A".into(), "Start".into()] }
fn default_cancel() -> Vec<String> { vec!["B".into(), "Select".into()] }
fn default_cycle() -> Vec<String> { vec!["Y".into()] }
fn default_toggle_sound() -> Vec<String> { vec!["X".into()] }

fn default_difficulty() -> String { "Easy".into() }
fn default_player_name() -> String { "Anonymous".into() }
fn default_sound() -> bool { true }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            tick_rate_ms: default_tick_rate(),
            reveal_ms: default_reveal(),
            memorize_base_ms: default_memorize_base(),
            play_base_ms: default_play_base(),
            level_decay: default_level_decay(),
            min_countdown_ms: default_min_countdown(),
            level_clear_ms: default_level_clear(),
            review_ms: default_review(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            confirm: default_confirm(),
            cancel: default_cancel(),
            cycle_difficulty: default_cycle(),
            toggle_sound: default_toggle_sound(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            difficulty: default_difficulty(),
            player_name: default_player_name(),
            sound: default_sound(),
            seed: None,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig::from(TomlTiming::default())
    }
}

impl From<TomlTiming> for TimingConfig {
    fn from(t: TomlTiming) -> Self {
        TimingConfig {
            tick_rate_ms: t.tick_rate_ms.max(1),
            reveal_ms: t.reveal_ms,
            memorize_base_ms: t.memorize_base_ms,
            play_base_ms: t.play_base_ms,
            level_decay: t.level_decay.clamp(0.0, 1.0),
            min_countdown_ms: t.min_countdown_ms.max(1),
            level_clear_ms: t.level_clear_ms,
            review_ms: t.review_ms,
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) `~/.local/share/nemery`.
    pub fn load() -> Result<Self, ConfigError> {
        let toml_cfg = load_toml(&candidate_dirs());
        Self::from_toml(toml_cfg)
    }

    /// Parse config text directly. Unparsable text falls back to defaults.
    #[cfg(test)]
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg = toml::from_str::<TomlConfig>(text).unwrap_or_else(|e| {
            log::warn!("config parse error: {e}; using defaults");
            TomlConfig::default()
        });
        Self::from_toml(cfg)
    }

    fn from_toml(cfg: TomlConfig) -> Result<Self, ConfigError> {
        let difficulty = Difficulty::from_name(&cfg.general.difficulty)?;
        let player_name = match cfg.general.player_name.trim() {
            "" => default_player_name(),
            name => name.to_string(),
        };

        Ok(GameConfig {
            timing: TimingConfig::from(cfg.timing),
            gamepad: GamepadConfig {
                confirm: cfg.gamepad.confirm,
                cancel: cfg.gamepad.cancel,
                cycle_difficulty: cfg.gamepad.cycle_difficulty,
                toggle_sound: cfg.gamepad.toggle_sound,
            },
            difficulty,
            player_name,
            sound: cfg.general.sound,
            seed: cfg.general.seed,
        })
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            timing: TimingConfig::default(),
            gamepad: GamepadConfig {
                confirm: default_confirm(),
                cancel: default_cancel(),
                cycle_difficulty: default_cycle(),
                toggle_sound: default_toggle_sound(),
            },
            difficulty: Difficulty::default(),
            player_name: default_player_name(),
            sound: default_sound(),
            seed: None,
        }
    }
}

/// Candidate directories to search: exe dir + CWD + XDG data home (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/nemery");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                Ok(cfg) => {
                    log::info!("loaded {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    log::warn!("{} parse error: {e}; using defaults", path.display());
                    return TomlConfig::default();
                }
            },
            Err(e) => {
                log::warn!("could not read {}: {e}", path.display());
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = GameConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.timing, TimingConfig::default());
        assert_eq!(cfg.difficulty, Difficulty::Easy);
        assert_eq!(cfg.player_name, "Anonymous");
        assert!(cfg.sound);
        assert_eq!(cfg.seed, None);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::from_toml_str(
            "[timing]\nplay_base_ms = 5000\n\n[general]\ndifficulty = \"hard\"\nseed = 12\n",
        )
        .unwrap();
        assert_eq!(cfg.timing.play_base_ms, 5000);
        assert_eq!(cfg.timing.memorize_base_ms, 2500);
        assert_eq!(cfg.difficulty, Difficulty::Hard);
        assert_eq!(cfg.seed, Some(12));
    }

    #[test]
    fn unknown_difficulty_is_an_error() {
        let err = GameConfig::from_toml_str("[general]\ndifficulty = \"Nightmare\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Difficulty(DifficultyError::Unknown(_))));
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let cfg = GameConfig::from_toml_str("this is = = not toml").unwrap();
        assert_eq!(cfg.difficulty, Difficulty::Easy);
    }

    #[test]
    fn blank_player_name_uses_default() {
        let cfg = GameConfig::from_toml_str("[general]\nplayer_name = \"  \"\n").unwrap();
        assert_eq!(cfg.player_name, "Anonymous");
    }

    #[test]
    fn decay_is_clamped() {
        let cfg = GameConfig::from_toml_str("[timing]\nlevel_decay = 1.7\nmin_countdown_ms = 0\n").unwrap();
        assert_eq!(cfg.timing.level_decay, 1.0);
        assert_eq!(cfg.timing.min_countdown_ms, 1);
    }
}
