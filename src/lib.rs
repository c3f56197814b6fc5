pub mod advisor;
pub mod bridge;
pub mod http;
pub mod ingest;
pub mod sensor;
mod utils;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;
