//! Request handlers.

pub mod health;
pub mod upload;

pub use health::health;
pub use upload::upload_audio;
