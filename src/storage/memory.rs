use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::measurement::{Bucket, Measurement};
use crate::storage::Storage;

type Stream = BTreeMap<DateTime<Utc>, IndexMap<String, f64>>;

/// Process-local backend. Samples are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    streams: Mutex<HashMap<(Bucket, String), Stream>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of samples held for one stream.
    pub fn len(&self, bucket: Bucket, point: &str) -> usize {
        self.streams
            .lock()
            .map(|s| s.get(&(bucket, point.to_owned())).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn insert(&self, measurements: &[Measurement]) -> Result<()> {
        let mut streams = self
            .streams
            .lock()
            .map_err(|_| anyhow!("memory storage lock poisoned"))?;

        for m in measurements {
            streams
                .entry((m.bucket, m.point.clone()))
                .or_default()
                .insert(m.measured_at, m.fields.clone());
        }

        Ok(())
    }

    async fn latest(
        &self,
        bucket: Bucket,
        point: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Measurement>> {
        let streams = self
            .streams
            .lock()
            .map_err(|_| anyhow!("memory storage lock poisoned"))?;

        let Some(stream) = streams.get(&(bucket, point.to_owned())) else {
            return Ok(None);
        };

        Ok(stream
            .last_key_value()
            .filter(|&(&measured_at, _)| measured_at > since)
            .map(|(&measured_at, fields)| Measurement {
                bucket,
                point: point.to_owned(),
                measured_at,
                fields: fields.clone(),
            }))
    }
}
