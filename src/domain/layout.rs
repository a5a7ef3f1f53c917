/// Round layout generation.
///
/// Values are drawn without replacement from `[0, pool)` where
/// `pool = max(maxValueForLevel(level), totalTiles)`, so a board never
/// holds the same value twice and the ascending rule is unambiguous.

use rand::seq::SliceRandom;
use rand::Rng;

use super::difficulty::DifficultyProfile;

/// Hidden values, one per cell index (row-major).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundLayout {
    cols: usize,
    rows: usize,
    values: Vec<u32>,
}

impl RoundLayout {
    /// Build a layout from explicit values. Returns None when the value
    /// count doesn't match the grid or a value repeats.
    #[allow(dead_code)]
    pub fn from_values(cols: usize, rows: usize, values: Vec<u32>) -> Option<Self> {
        if cols * rows == 0 || values.len() != cols * rows {
            return None;
        }
        let mut sorted = values.clone();
        sorted.sort_unstable();
        if sorted.windows(2).any(|w| w[0] == w[1]) {
            return None;
        }
        Some(RoundLayout { cols, rows, values })
    }

    pub fn cols(&self) -> usize { self.cols }
    pub fn rows(&self) -> usize { self.rows }

    pub fn values(&self) -> &[u32] {
        &self.values
    }
}

/// Fisher–Yates over `[0, pool)`, truncated to the grid size.
pub fn generate_layout<R: Rng + ?Sized>(
    rng: &mut R,
    profile: &DifficultyProfile,
    level: u32,
) -> RoundLayout {
    let (cols, rows) = profile.grid;
    let n = profile.total_tiles();
    let pool = (profile.max_value_for_level(level) as usize).max(n);

    let mut values: Vec<u32> = (0..pool as u32).collect();
    values.shuffle(rng);
    values.truncate(n);

    RoundLayout { cols, rows, values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::difficulty::Difficulty;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn values_are_distinct_for_every_profile() {
        let mut rng = StdRng::seed_from_u64(7);
        for d in Difficulty::ALL {
            let p = d.profile();
            for level in 1..=12 {
                let layout = generate_layout(&mut rng, &p, level);
                assert_eq!(layout.values().len(), p.total_tiles());
                let mut v = layout.values().to_vec();
                v.sort_unstable();
                v.dedup();
                assert_eq!(v.len(), p.total_tiles(), "{:?} L{}", d, level);
            }
        }
    }

    #[test]
    fn easy_level_one_draws_from_zero_to_five() {
        let p = Difficulty::Easy.profile();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let layout = generate_layout(&mut rng, &p, 1);
            assert!(layout.values().iter().all(|&v| v < 6));
        }
    }

    #[test]
    fn pool_never_smaller_than_grid() {
        // Extreme level 1: maxValue = 16 = totalTiles, so every value 0..16 appears.
        let p = Difficulty::Extreme.profile();
        let mut rng = StdRng::seed_from_u64(3);
        let layout = generate_layout(&mut rng, &p, 1);
        let mut v = layout.values().to_vec();
        v.sort_unstable();
        assert_eq!(v, (0..16).collect::<Vec<u32>>());
    }

    #[test]
    fn same_seed_same_layout() {
        let p = Difficulty::Hard.profile();
        let a = generate_layout(&mut StdRng::seed_from_u64(99), &p, 4);
        let b = generate_layout(&mut StdRng::seed_from_u64(99), &p, 4);
        assert_eq!(a, b);
    }

    #[test]
    fn from_values_rejects_duplicates_and_bad_size() {
        assert!(RoundLayout::from_values(2, 2, vec![3, 1, 4, 2]).is_some());
        assert!(RoundLayout::from_values(2, 2, vec![3, 1, 3, 2]).is_none());
        assert!(RoundLayout::from_values(2, 2, vec![3, 1, 4]).is_none());
        assert!(RoundLayout::from_values(0, 2, vec![]).is_none());
    }
}
