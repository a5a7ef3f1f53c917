/// Events emitted by the round engine.
/// The presentation side consumes these for sound and navigation;
/// nothing in the core waits on what they trigger.

/// Named audio cues (fire-and-forget).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cue {
    Whoosh,          // round start, numbers shown
    Hide,            // numbers flipped away
    Beep,            // input window opens
    Tap,
    CountdownTick,   // last seconds of the input window
    Success,         // level cleared
    Failure,         // wrong order or timeout
    Scream,          // switched into Extreme
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FailReason {
    WrongOrder,
    Timeout,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    LevelComplete,
    Failed(FailReason),
}

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    Cue(Cue),
    /// A tile was tapped and accepted.
    TileAccepted { cell: usize, value: u32, points: u32 },
    /// A tile was tapped and broke the ascending order.
    TileRejected { cell: usize, value: u32, previous: u32 },
    /// The round reached a terminal state.
    Resolved { outcome: Outcome, score: u32 },
    /// Level cleared: bonus added, `level` is the level about to start.
    LevelUp { level: u32, bonus: u32 },
    /// Failure review finished; the playthrough is over with `score`.
    RoundEnded { score: u32, level: u32 },
    /// The player backed out mid-round.
    Quit { score: u32 },
}
