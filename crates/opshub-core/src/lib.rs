//! OpsHub Core Library
//!
//! This crate provides the domain models, error types, configuration and session
//! storage shared by the OpsHub API client and CLI.

pub mod access;
pub mod config;
pub mod error;
pub mod models;
pub mod operations_hub;
pub mod session;
pub mod validation;

// Re-export commonly used types
pub use access::Area;
pub use config::ClientConfig;
pub use error::SessionError;
pub use models::Role;
pub use operations_hub::{find_feature, HubFeature, HUB_FEATURES};
pub use session::{is_token_expired, token_expiry, Session, TokenStore};
