pub mod clock;
pub mod constants;
pub mod engine;
pub mod state;
pub mod systems;
