/// Per-cell state during a round.
/// Visibility rules live here so the renderer and the engine agree on them.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TileState {
    pub value: u32,
    pub revealed: bool,  // number visible
    pub selected: bool,  // tapped this round
}

impl TileState {
    pub fn new(value: u32) -> Self {
        TileState { value, revealed: true, selected: false }
    }

    /// Hide the number (the "flipped" face in the UI).
    pub fn hide(&mut self) {
        self.revealed = false;
    }

    pub fn reveal(&mut self) {
        self.revealed = true;
    }

    /// Can the player still tap this tile?
    pub fn is_tappable(self) -> bool {
        !self.selected
    }
}
