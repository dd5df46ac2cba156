//! Background activity logger. Samples the focused window and keyboard/mouse activity,
//! stores them in SQLite and once a day turns the result into a short report with a mood
//! estimate and a ready to paste caption.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod input_api;
pub mod notify;
pub mod report;
pub mod utils;
pub mod window_api;
