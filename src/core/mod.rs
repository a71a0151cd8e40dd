pub mod clock;
pub mod duration;
pub mod models;
pub mod settings;
pub mod state;
