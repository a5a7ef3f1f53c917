/// Difficulty table: the fixed set of profiles a playthrough can run on.
///
/// Each profile fixes the grid, the value-growth curve, the points per tile
/// and the two multipliers that scale countdowns and the level-up bonus.
///
/// | Difficulty | Grid | maxValue(level)    | pts | time× | bonus× |
/// |------------|------|--------------------|-----|-------|--------|
/// | Easy       | 2×2  | min(6·level, 99)   | 1   | 1.5   | 1.3    |
/// | Medium     | 3×2  | min(8·level, 99)   | 2   | 2.0   | 2.0    |
/// | Hard       | 3×3  | min(10·level, 99)  | 3   | 3.0   | 3.0    |
/// | Extreme    | 4×4  | min(16·level, 99)  | 4   | 3.0   | 4.0    |

use thiserror::Error;

/// Tile values never grow past this, whatever the level.
pub const MAX_VALUE_CEILING: u32 = 99;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
    Extreme,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DifficultyError {
    #[error("unknown difficulty \"{0}\" (expected Easy, Medium, Hard or Extreme)")]
    Unknown(String),
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Extreme,
    ];

    /// Parse a difficulty name (case-insensitive).
    /// Unknown names are rejected rather than mapped to a default.
    pub fn from_name(name: &str) -> Result<Self, DifficultyError> {
        let wanted = name.trim();
        Difficulty::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DifficultyError::Unknown(name.to_string()))
    }

    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::Extreme => "Extreme",
        }
    }

    /// Menu cycling order: Easy → Medium → Hard → Extreme → Easy.
    pub fn next(self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium => Difficulty::Hard,
            Difficulty::Hard => Difficulty::Extreme,
            Difficulty::Extreme => Difficulty::Easy,
        }
    }

    pub fn profile(self) -> DifficultyProfile {
        match self {
            Difficulty::Easy => DifficultyProfile {
                difficulty: self,
                grid: (2, 2),
                value_step: 6,
                points_per_tile: 1,
                time_multiplier: 1.5,
                bonus_multiplier: 1.3,
            },
            Difficulty::Medium => DifficultyProfile {
                difficulty: self,
                grid: (3, 2),
                value_step: 8,
                points_per_tile: 2,
                time_multiplier: 2.0,
                bonus_multiplier: 2.0,
            },
            Difficulty::Hard => DifficultyProfile {
                difficulty: self,
                grid: (3, 3),
                value_step: 10,
                points_per_tile: 3,
                time_multiplier: 3.0,
                bonus_multiplier: 3.0,
            },
            Difficulty::Extreme => DifficultyProfile {
                difficulty: self,
                grid: (4, 4),
                value_step: 16,
                points_per_tile: 4,
                time_multiplier: 3.0,
                bonus_multiplier: 4.0,
            },
        }
    }
}

/// Immutable per-difficulty parameters. Built once per difficulty change.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct DifficultyProfile {
    pub difficulty: Difficulty,
    /// (cols, rows)
    pub grid: (usize, usize),
    value_step: u32,
    pub points_per_tile: u32,
    pub time_multiplier: f64,
    pub bonus_multiplier: f64,
}

impl DifficultyProfile {
    pub fn total_tiles(&self) -> usize {
        self.grid.0 * self.grid.1
    }

    /// Exclusive upper bound of tile values at `level` (1-based).
    /// Linear in the level, capped at `MAX_VALUE_CEILING`.
    pub fn max_value_for_level(&self, level: u32) -> u32 {
        self.value_step
            .saturating_mul(level.max(1))
            .min(MAX_VALUE_CEILING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_case_insensitive() {
        assert_eq!(Difficulty::from_name("easy"), Ok(Difficulty::Easy));
        assert_eq!(Difficulty::from_name("EXTREME"), Ok(Difficulty::Extreme));
        assert_eq!(Difficulty::from_name(" Hard "), Ok(Difficulty::Hard));
        for d in Difficulty::ALL {
            assert_eq!(Difficulty::from_name(d.name()), Ok(d));
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = Difficulty::from_name("Insane").unwrap_err();
        assert_eq!(err, DifficultyError::Unknown("Insane".into()));
    }

    #[test]
    fn cycle_visits_all_and_wraps() {
        let mut d = Difficulty::Easy;
        let mut seen = vec![d];
        for _ in 0..3 {
            d = d.next();
            seen.push(d);
        }
        assert_eq!(seen, Difficulty::ALL.to_vec());
        assert_eq!(d.next(), Difficulty::Easy);
    }

    #[test]
    fn easy_level_one() {
        let p = Difficulty::Easy.profile();
        assert_eq!(p.grid, (2, 2));
        assert_eq!(p.total_tiles(), 4);
        assert_eq!(p.max_value_for_level(1), 6);
        assert_eq!(p.points_per_tile, 1);
    }

    #[test]
    fn max_value_is_monotonic_and_capped() {
        for d in Difficulty::ALL {
            let p = d.profile();
            let mut prev = 0;
            for level in 1..=20 {
                let v = p.max_value_for_level(level);
                assert!(v >= prev, "{:?} decreased at level {}", d, level);
                assert!(v <= MAX_VALUE_CEILING);
                prev = v;
            }
        }
        assert_eq!(Difficulty::Extreme.profile().max_value_for_level(7), 99);
    }
}
