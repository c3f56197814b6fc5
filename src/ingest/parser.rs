use crate::ingest::errors::IngestError;
use crate::sensor::SensorReading;

/// Minimum number of comma-separated fields in a telemetry line.
///
/// The board sends eight; fields 7 and up are reserved and ignored.
pub const MIN_FIELDS: usize = 8;

pub struct LineParser;

impl LineParser {
    /// Parse one line from the board:
    /// `temperature,humidity,moisture,soilType,soilPH,rainfall,season,<reserved>`
    ///
    /// Either every field parses and a full reading is returned, or nothing is.
    pub fn parse(line: &str) -> Result<SensorReading, IngestError> {
        let line = line.trim();
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() < MIN_FIELDS {
            return Err(IngestError::malformed(
                line,
                format!("expected at least {} fields, got {}", MIN_FIELDS, parts.len()),
            ));
        }

        let temperature = Self::number::<f64>(line, "temperature", parts[0])?;
        let humidity = Self::number::<f64>(line, "humidity", parts[1])?;
        let moisture = Self::number::<i64>(line, "moisture", parts[2])?;
        let soil_ph = Self::number::<f64>(line, "soilPH", parts[4])?;

        Ok(SensorReading {
            temperature,
            humidity,
            moisture,
            soil_type: parts[3].to_string(),
            soil_ph,
            rainfall: parts[5].to_string(),
            season: parts[6].to_string(),
        })
    }

    fn number<T>(line: &str, field: &str, raw: &str) -> Result<T, IngestError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        raw.parse::<T>()
            .map_err(|e| IngestError::malformed(line, format!("{} {:?}: {}", field, raw, e)))
    }
}
