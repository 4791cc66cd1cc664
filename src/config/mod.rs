/// Database configuration and connection management
pub mod database;

/// Application settings and seed locations loaded from config.toml
pub mod settings;

/// Current user identity from environment variables
pub mod session;
