pub mod gamepad;
pub mod input;
pub mod quotes;
pub mod renderer;
pub mod sound;
