pub mod commands;
pub mod config;
pub mod error;
pub mod on_demand;
pub mod poller;
pub mod telegram;
pub mod time;
