// Export music utilities
pub mod embedded_messages;
pub mod event_handlers;
pub mod music_card;
pub mod music_manager;
pub mod spotify_api;
