//! Sensor data model and the shared latest-reading cache

pub mod cache;
pub mod reading;

pub use cache::ReadingCache;
pub use reading::SensorReading;
