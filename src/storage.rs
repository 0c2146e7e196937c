//! Time-series storage gateway.
//!
//! [`Storage`] is the backend seam: append samples, fetch the latest sample
//! of a stream. [`Gateway`] layers the typed `write_*` / `read_*` API used by
//! sensor readers, the notifier and the dashboard on top of it.

mod gateway;
mod memory;
mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::measurement::{Bucket, Measurement};

pub use gateway::*;
pub use memory::*;
pub use postgres::*;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Stores samples. A sample with the same bucket, point and timestamp as
    /// an existing one replaces it.
    async fn insert(&self, measurements: &[Measurement]) -> Result<()>;

    /// Most recent sample of `point` in `bucket` taken strictly after `since`.
    async fn latest(
        &self,
        bucket: Bucket,
        point: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Measurement>>;
}
