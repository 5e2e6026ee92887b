//! Transport boundary — inbound events and outbound survey actions.

pub mod channel;
pub mod cli;
pub mod telegram;

pub use channel::*;
pub use cli::CliChannel;
pub use telegram::TelegramChannel;
