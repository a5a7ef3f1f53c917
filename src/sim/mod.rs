pub mod event;
pub mod round;
pub mod save;
pub mod timer;
pub mod world;
