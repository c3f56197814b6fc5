pub mod models;
mod handlers;
pub mod server;

// Re-export commonly used types
pub use handlers::AppState;
pub use models::*;
