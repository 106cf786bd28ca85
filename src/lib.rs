pub mod backtester;
pub mod commands;
pub mod config;
pub mod errors;
pub mod indicators;
pub mod models;
pub mod performance;
pub mod portfolio;
pub mod quotes;
pub mod signals;
pub mod simulator;
pub mod store;
