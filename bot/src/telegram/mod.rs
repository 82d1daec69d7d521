pub mod client;
pub mod types;
pub mod updates;

pub use client::TelegramClient;
