/// Score persistence: best score, local top-5 scoreboard and the
/// remembered sound setting.
///
/// ## File format:
///   Key-value lines in `scores.dat` inside the save directory.
///
///     best=42
///     sound=off
///     entry=42,Hard,Anonymous
///     entry=17,Easy,Ana
///
/// Entries are `score,difficulty,name`; the name goes last so it may
/// contain commas. Unknown keys are ignored.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::difficulty::Difficulty;

const SCORE_FILE: &str = "scores.dat";

/// Scoreboard length.
pub const MAX_ENTRIES: usize = 5;

// ══════════════════════════════════════════════════════════════
// Public types
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreEntry {
    pub name: String,
    pub score: u32,
    pub difficulty: Difficulty,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

/// The persistence collaborator as seen by the game loop.
/// Failures are reported, never fatal: the caller logs and plays on.
pub trait ScoreStore {
    fn best_score(&self) -> u32;
    /// Raise the stored best. Lower values are ignored.
    fn set_best_score(&mut self, score: u32) -> Result<(), StoreError>;
    /// Record a finished playthrough on the scoreboard.
    fn submit_score(&mut self, entry: ScoreEntry) -> Result<(), StoreError>;
    fn scoreboard(&self) -> &Scoreboard;
    /// Sound preference last chosen on the title screen, if any.
    fn sound_enabled(&self) -> Option<bool>;
    fn set_sound_enabled(&mut self, on: bool) -> Result<(), StoreError>;
}

/// Top entries, highest score first. Ties keep arrival order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scoreboard {
    entries: Vec<ScoreEntry>,
}

impl Scoreboard {
    /// Insert and trim to `MAX_ENTRIES`. Returns the rank (0-based)
    /// if the entry made the board.
    pub fn insert(&mut self, entry: ScoreEntry) -> Option<usize> {
        let pos = self
            .entries
            .iter()
            .position(|e| entry.score > e.score)
            .unwrap_or(self.entries.len());
        if pos >= MAX_ENTRIES {
            return None;
        }
        self.entries.insert(pos, entry);
        self.entries.truncate(MAX_ENTRIES);
        Some(pos)
    }

    pub fn entries(&self) -> &[ScoreEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ══════════════════════════════════════════════════════════════
// File-backed store
// ══════════════════════════════════════════════════════════════

pub struct FileScoreStore {
    path: PathBuf,
    saved: SavedScores,
}

/// Everything `scores.dat` holds.
#[derive(Clone, Debug, Default, PartialEq)]
struct SavedScores {
    best: u32,
    board: Scoreboard,
    sound: Option<bool>,
}

impl FileScoreStore {
    /// Open `scores.dat` in the save directory. A missing file is an empty
    /// board; an unreadable or corrupt one is logged and replaced on the
    /// next write.
    pub fn open() -> Self {
        Self::at(save_dir().join(SCORE_FILE))
    }

    pub fn at(path: PathBuf) -> Self {
        let saved = match std::fs::read_to_string(&path) {
            Ok(content) => parse_scores(&content).unwrap_or_else(|e| {
                log::warn!("{}: {e}; starting with an empty scoreboard", path.display());
                SavedScores::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SavedScores::default(),
            Err(e) => {
                log::warn!("could not read {}: {e}", path.display());
                SavedScores::default()
            }
        };
        log::info!("score store {} (best {})", path.display(), saved.best);
        FileScoreStore { path, saved }
    }

    fn persist(&self) -> Result<(), StoreError> {
        let content = serialize(&self.saved);
        std::fs::write(&self.path, content).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl ScoreStore for FileScoreStore {
    fn best_score(&self) -> u32 {
        self.saved.best
    }

    fn set_best_score(&mut self, score: u32) -> Result<(), StoreError> {
        if score <= self.saved.best {
            return Ok(());
        }
        self.saved.best = score;
        self.persist()
    }

    fn submit_score(&mut self, entry: ScoreEntry) -> Result<(), StoreError> {
        log::info!("submit {} {} ({})", entry.name, entry.score, entry.difficulty.name());
        self.saved.best = self.saved.best.max(entry.score);
        self.saved.board.insert(entry);
        self.persist()
    }

    fn scoreboard(&self) -> &Scoreboard {
        &self.saved.board
    }

    fn sound_enabled(&self) -> Option<bool> {
        self.saved.sound
    }

    fn set_sound_enabled(&mut self, on: bool) -> Result<(), StoreError> {
        self.saved.sound = Some(on);
        self.persist()
    }
}

// ══════════════════════════════════════════════════════════════
// Save directory
// ══════════════════════════════════════════════════════════════

/// Writable directory for scores and the log file.
pub fn save_dir() -> PathBuf {
    // 1. Exe directory (local/portable installs)
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            // System installs like /usr/games/ won't be writable
            let test_path = parent.join(".write_test_nemery");
            if std::fs::write(&test_path, "").is_ok() {
                let _ = std::fs::remove_file(&test_path);
                return parent.to_path_buf();
            }
        }
    }

    // 2. XDG data home
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/nemery");
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    // 3. CWD
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

// ══════════════════════════════════════════════════════════════
// Serialization
// ══════════════════════════════════════════════════════════════

fn serialize(saved: &SavedScores) -> String {
    let mut out = format!("best={}\n", saved.best);
    if let Some(on) = saved.sound {
        out.push_str(if on { "sound=on\n" } else { "sound=off\n" });
    }
    for e in saved.board.entries() {
        out.push_str(&format!("entry={},{},{}\n", e.score, e.difficulty.name(), e.name));
    }
    out
}

fn parse_scores(content: &str) -> Result<SavedScores, StoreError> {
    let mut best: u32 = 0;
    let mut board = Scoreboard::default();
    let mut sound = None;

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        let malformed = |reason: &str| StoreError::Malformed {
            line: idx + 1,
            reason: reason.to_string(),
        };

        if let Some(val) = line.strip_prefix("best=") {
            best = val.trim().parse().map_err(|_| malformed("bad best score"))?;
        } else if let Some(val) = line.strip_prefix("sound=") {
            sound = match val.trim() {
                "on" => Some(true),
                "off" => Some(false),
                _ => return Err(malformed("sound must be on or off")),
            };
        } else if let Some(val) = line.strip_prefix("entry=") {
            let mut parts = val.splitn(3, ',');
            let score = parts
                .next()
                .and_then(|s| s.trim().parse().ok())
                .ok_or_else(|| malformed("bad entry score"))?;
            let difficulty = parts
                .next()
                .ok_or_else(|| malformed("missing difficulty"))
                .and_then(|d| Difficulty::from_name(d).map_err(|e| malformed(&e.to_string())))?;
            let name = parts.next().ok_or_else(|| malformed("missing name"))?;
            board.insert(ScoreEntry { name: name.to_string(), score, difficulty });
        }
    }

    // A hand-edited best below a listed entry is raised to match.
    let top = board.entries().first().map_or(0, |e| e.score);
    Ok(SavedScores { best: best.max(top), board, sound })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, score: u32) -> ScoreEntry {
        ScoreEntry { name: name.into(), score, difficulty: Difficulty::Easy }
    }

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("nemery_{}_{}.dat", tag, std::process::id()))
    }

    #[test]
    fn board_is_sorted_and_capped() {
        let mut b = Scoreboard::default();
        for (i, s) in [5, 30, 10, 50, 20, 40].iter().enumerate() {
            b.insert(entry(&format!("p{i}"), *s));
        }
        let scores: Vec<u32> = b.entries().iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![50, 40, 30, 20, 10]);
        assert_eq!(b.insert(entry("low", 1)), None);
        assert_eq!(b.insert(entry("top", 99)), Some(0));
    }

    #[test]
    fn ties_keep_arrival_order() {
        let mut b = Scoreboard::default();
        b.insert(entry("first", 10));
        assert_eq!(b.insert(entry("second", 10)), Some(1));
        assert_eq!(b.entries()[0].name, "first");
    }

    #[test]
    fn parse_reads_entries_with_commas_in_names() {
        let text = "best=12\nentry=12,Hard,Smith, Jo\nentry=3,extreme,X\n";
        let saved = parse_scores(text).unwrap();
        assert_eq!(saved.best, 12);
        assert_eq!(saved.board.entries()[0].name, "Smith, Jo");
        assert_eq!(saved.board.entries()[1].difficulty, Difficulty::Extreme);
        assert_eq!(saved.sound, None);
    }

    #[test]
    fn parse_rejects_bad_lines() {
        let err = parse_scores("best=1\nentry=abc,Easy,X\n").unwrap_err();
        assert!(matches!(err, StoreError::Malformed { line: 2, .. }));
        assert!(parse_scores("entry=4,Nightmare,X\n").is_err());
    }

    #[test]
    fn best_follows_top_entry() {
        let saved = parse_scores("best=2\nentry=9,Easy,X\n").unwrap();
        assert_eq!(saved.best, 9);
    }

    #[test]
    fn sound_setting_parses() {
        assert_eq!(parse_scores("sound=off\n").unwrap().sound, Some(false));
        assert_eq!(parse_scores("sound=on\n").unwrap().sound, Some(true));
        assert!(parse_scores("sound=loud\n").is_err());
    }

    #[test]
    fn sound_setting_survives_reopen() {
        let path = temp_path("sound");
        let _ = std::fs::remove_file(&path);
        {
            let mut s = FileScoreStore::at(path.clone());
            assert_eq!(s.sound_enabled(), None);
            s.submit_score(entry("Ana", 8)).unwrap();
            s.set_sound_enabled(false).unwrap();
        }
        let mut s = FileScoreStore::at(path.clone());
        assert_eq!(s.sound_enabled(), Some(false));
        assert_eq!(s.best_score(), 8);
        assert_eq!(s.scoreboard().entries().len(), 1);
        s.set_sound_enabled(true).unwrap();
        assert_eq!(FileScoreStore::at(path.clone()).sound_enabled(), Some(true));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn file_store_survives_reopen() {
        let path = temp_path("reopen");
        let _ = std::fs::remove_file(&path);
        {
            let mut s = FileScoreStore::at(path.clone());
            assert_eq!(s.best_score(), 0);
            s.submit_score(entry("Ana", 14)).unwrap();
            s.submit_score(entry("Bo", 6)).unwrap();
        }
        let s = FileScoreStore::at(path.clone());
        assert_eq!(s.best_score(), 14);
        assert_eq!(s.scoreboard().entries().len(), 2);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn best_never_lowers() {
        let path = temp_path("best");
        let _ = std::fs::remove_file(&path);
        let mut s = FileScoreStore::at(path.clone());
        s.set_best_score(20).unwrap();
        s.set_best_score(5).unwrap();
        assert_eq!(s.best_score(), 20);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "best=lots\n").unwrap();
        let s = FileScoreStore::at(path.clone());
        assert_eq!(s.best_score(), 0);
        assert!(s.scoreboard().is_empty());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn unwritable_path_reports_io_error() {
        let path = std::env::temp_dir().join("nemery_no_such_dir").join("x").join(SCORE_FILE);
        let mut s = FileScoreStore::at(path);
        let err = s.submit_score(entry("Ana", 3)).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        // In-memory state still updated.
        assert_eq!(s.best_score(), 3);
    }
}
