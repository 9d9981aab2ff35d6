//! Specific background job implementations.

pub mod playlist_check;
pub mod telegram_commands;

pub use playlist_check::PlaylistCheckJob;
pub use telegram_commands::TelegramCommandsJob;
