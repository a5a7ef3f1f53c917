pub mod difficulty;
pub mod layout;
pub mod score;
pub mod tile;
