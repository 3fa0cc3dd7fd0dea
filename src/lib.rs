pub mod app;
pub mod audio;
pub mod clock;
pub mod config;
pub mod ecosystem;
pub mod events;
pub mod grid;
pub mod modes;
pub mod palette;
pub mod regions;
pub mod render;
pub mod sandpile;
pub mod terminal;
pub mod tuning;
