//! Data models for the OpsHub API
//!
//! Wire shapes of the backend's JSON payloads, organized by domain. Server
//! timestamps are naive UTC (`2024-05-01T09:30:00.123456`), so they are
//! modelled as `NaiveDateTime`.

mod news;
mod progress;
mod training;
mod upload;
mod user;

// Re-export all models for convenient imports
pub use news::*;
pub use progress::*;
pub use training::*;
pub use upload::*;
pub use user::*;
