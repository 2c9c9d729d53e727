pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod models;
pub mod output;
pub mod report;
pub mod roster;
pub mod state;
