// Re-export needed modules for testing
pub mod chat;
pub mod models;
pub mod session;

// Re-export main types for convenience
pub use chat::ChatClient;
pub use models::*;
