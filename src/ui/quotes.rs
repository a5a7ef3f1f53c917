/// Text shown on the game-over screen.

pub const GAME_OVER: &[&str] = &[
    "Every expert was once a beginner. Keep playing!",
    "The only way to get better is to keep trying.",
    "Success is not final, failure is not fatal. It's the courage to continue that counts.",
    "The best way to predict the future is to create it.",
    "Don't watch the clock; do what it does. Keep going.",
    "The only limit to our realization of tomorrow is our doubts of today.",
    "It always seems impossible until it's done.",
    "The difference between the impossible and the possible lies in determination.",
];

pub const NEW_BEST: &[&str] = &[
    "New personal best! You're getting better every time!",
    "Amazing! You've broken your own record!",
    "Fantastic! You've set a new benchmark!",
    "Superb! Your dedication is paying off!",
];

/// Pick a line by a free-running index (wraps).
pub fn pick(list: &'static [&'static str], index: usize) -> &'static str {
    if list.is_empty() {
        return "";
    }
    list[index % list.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_wraps() {
        assert_eq!(pick(GAME_OVER, 0), GAME_OVER[0]);
        assert_eq!(pick(GAME_OVER, GAME_OVER.len() + 1), GAME_OVER[1]);
        assert_eq!(pick(&[], 3), "");
    }
}
