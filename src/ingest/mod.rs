//! Telemetry ingest: serial line source, line parser, synthetic fallback and
//! the producer loop that writes into the shared cache.

pub mod errors;
pub mod parser;
pub mod producer;
pub mod serial;
pub mod synth;

pub use errors::IngestError;
pub use producer::{Origin, Producer, Step};
pub use serial::{LineSource, SerialOptions};
