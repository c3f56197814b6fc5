use std::time::Duration;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio_util::sync::CancellationToken;
use crate::ingest::errors::IngestError;
use crate::ingest::parser::LineParser;
use crate::ingest::serial::{LineSource, Poll};
use crate::ingest::synth;
use crate::sensor::ReadingCache;

/// Pause after an idle iteration
pub const DEFAULT_PACE: Duration = Duration::from_millis(500);

/// Where an applied reading came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Serial,
    Synthetic,
}

/// Outcome of a single ingest iteration
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    /// A complete reading was written to the cache
    Updated(Origin),
    /// A line was received but could not be parsed; the cache is untouched
    Dropped,
    /// Nothing pending and synthetic readings are disabled
    Idle,
    /// The source went away; the producer stops
    Stopped,
}

/// Ingest loop feeding the shared [`ReadingCache`]
pub struct Producer {
    cache: ReadingCache,
    source: Option<LineSource>,
    rng: StdRng,
    pace: Duration,
    synthesize_when_idle: bool,
}

impl Producer {
    /// `source == None` means no board: every iteration is synthetic.
    pub fn new(cache: ReadingCache, source: Option<LineSource>) -> Self {
        Self {
            cache,
            source,
            rng: StdRng::from_os_rng(),
            pace: DEFAULT_PACE,
            synthesize_when_idle: true,
        }
    }

    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Whether idle iterations write a synthetic reading while a board is
    /// attached. Without a board, readings are always synthetic.
    pub fn synthesize_when_idle(mut self, enabled: bool) -> Self {
        self.synthesize_when_idle = enabled;
        self
    }

    /// Run one iteration without pacing
    pub fn step(&mut self) -> Step {
        let polled = match self.source.as_mut() {
            Some(source) => source.poll(),
            None => Poll::Idle,
        };

        match polled {
            Poll::Line(line) => match LineParser::parse(&line) {
                Ok(reading) => {
                    tracing::debug!("UPDATED: {:?}", reading);
                    self.cache.update(reading);
                    Step::Updated(Origin::Serial)
                }
                Err(e) => {
                    tracing::warn!("Error parsing data: {}", e);
                    Step::Dropped
                }
            },
            Poll::Idle if self.source.is_none() || self.synthesize_when_idle => {
                let reading = synth::synthesize(&mut self.rng);
                tracing::trace!("SIMULATED UPDATE: {:?}", reading);
                self.cache.update(reading);
                Step::Updated(Origin::Synthetic)
            }
            Poll::Idle => Step::Idle,
            Poll::Closed => {
                tracing::error!("{}, no further readings will be produced", IngestError::Disconnected);
                Step::Stopped
            }
        }
    }

    /// Loop until cancelled or the source is lost, then release the source.
    pub async fn run(mut self, cancel: CancellationToken) {
        match self.source.as_ref() {
            Some(source) => tracing::info!("Ingesting telemetry from {}", source.name()),
            None => tracing::info!("No telemetry source, generating synthetic readings"),
        }

        while !cancel.is_cancelled() {
            match self.step() {
                Step::Updated(Origin::Serial) | Step::Dropped => {
                    // drain pending lines back to back
                    tokio::task::yield_now().await;
                }
                Step::Updated(Origin::Synthetic) | Step::Idle => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.pace) => {}
                    }
                }
                Step::Stopped => break,
            }
        }

        if let Some(source) = self.source.take() {
            source.close().await;
        }
        tracing::info!("Telemetry ingest stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::synth::{HUMIDITY_RANGE, MOISTURE_RANGE, SOIL_PH_RANGE, TEMPERATURE_RANGE};
    use crate::sensor::SensorReading;
    use tokio::sync::mpsc;

    fn channel_producer(cache: &ReadingCache) -> (mpsc::Sender<String>, Producer) {
        let (tx, rx) = mpsc::channel(16);
        let producer = Producer::new(cache.clone(), Some(LineSource::from_channel("test", rx)))
            .with_rng(StdRng::seed_from_u64(3))
            .synthesize_when_idle(false);
        (tx, producer)
    }

    #[test]
    fn test_synthetic_without_source() {
        let cache = ReadingCache::new();
        let mut producer = Producer::new(cache.clone(), None).with_rng(StdRng::seed_from_u64(11));

        assert_eq!(producer.step(), Step::Updated(Origin::Synthetic));
        let reading = cache.snapshot();
        assert!(TEMPERATURE_RANGE.contains(&reading.temperature));
        assert!(HUMIDITY_RANGE.contains(&reading.humidity));
        assert!(MOISTURE_RANGE.contains(&reading.moisture));
        assert!(SOIL_PH_RANGE.contains(&reading.soil_ph));
    }

    #[tokio::test]
    async fn test_malformed_line_leaves_cache_unchanged() {
        let cache = ReadingCache::new();
        let (tx, mut producer) = channel_producer(&cache);

        tx.send("24.5,55.0,410,Loamy,6.3,Light,Spring,0".to_string()).await.unwrap();
        assert_eq!(producer.step(), Step::Updated(Origin::Serial));
        let before = cache.snapshot();

        tx.send("1.0,2.0,3".to_string()).await.unwrap();
        assert_eq!(producer.step(), Step::Dropped);
        assert_eq!(cache.snapshot(), before);
        assert_eq!(cache.update_count(), 1);

        tx.send("21.0,45.5,333,Clay,7.1,Heavy,Winter,0".to_string()).await.unwrap();
        assert_eq!(producer.step(), Step::Updated(Origin::Serial));
        assert_eq!(cache.snapshot().season, "Winter");
    }

    #[tokio::test]
    async fn test_idle_board_synthesizes_by_default() {
        let cache = ReadingCache::new();
        let (_tx, rx) = mpsc::channel::<String>(1);
        let mut producer = Producer::new(cache.clone(), Some(LineSource::from_channel("test", rx)));
        assert_eq!(producer.step(), Step::Updated(Origin::Synthetic));

        let (_board, mut producer) = channel_producer(&cache);
        assert_eq!(producer.step(), Step::Idle);
        assert_eq!(cache.update_count(), 1);
    }

    #[tokio::test]
    async fn test_run_survives_malformed_input() {
        let cache = ReadingCache::new();
        let (tx, producer) = channel_producer(&cache);
        let producer = producer.with_pace(Duration::from_millis(5));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(producer.run(cancel.clone()));

        tx.send("garbage".to_string()).await.unwrap();
        tx.send("1,2,3".to_string()).await.unwrap();
        tx.send("24.5,55.0,410,Loamy,6.3,Light,Spring,0".to_string()).await.unwrap();

        let expected = SensorReading {
            temperature: 24.5,
            humidity: 55.0,
            moisture: 410,
            soil_type: "Loamy".to_string(),
            soil_ph: 6.3,
            rainfall: "Light".to_string(),
            season: "Spring".to_string(),
        };
        tokio::time::timeout(Duration::from_secs(5), async {
            while cache.snapshot() != expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("valid line was never applied");
        assert_eq!(cache.update_count(), 1);
        assert!(!handle.is_finished());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("producer did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_stops_when_source_lost() {
        let cache = ReadingCache::new();
        let (tx, producer) = channel_producer(&cache);
        drop(tx);

        tokio::time::timeout(Duration::from_secs(1), producer.run(CancellationToken::new()))
            .await
            .expect("producer kept running without a source");
        assert_eq!(cache.update_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pacing() {
        let cache = ReadingCache::new();
        let producer = Producer::new(cache.clone(), None).with_pace(Duration::from_secs(60));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(producer.run(cancel.clone()));

        tokio::time::timeout(Duration::from_secs(1), async {
            while cache.update_count() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("cancellation did not interrupt the pause")
            .unwrap();
        assert_eq!(cache.update_count(), 1);
    }
}
