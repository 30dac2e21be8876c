// Copyright 2024, The Tremor Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use async_trait::async_trait;
use log::{debug, info};
use one2sen_common::{
    retry::{retriable, ExponentialBackoff},
    Error, LogRecord, Result,
};
use std::num::NonZeroUsize;

/// Sends one batch of records per call
#[async_trait]
pub trait Delivery: Send + Sync {
    /// name used in logs
    fn name(&self) -> &'static str;

    /// Delivers `batch` with a single request
    async fn deliver(&self, batch: &[LogRecord]) -> Result<()>;
}

/// Outcome of a successful [`Shipper::ship`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Shipped {
    /// records delivered
    pub records: usize,
    /// delivery calls made
    pub batches: usize,
}

/// Splits records into batches and delivers them one after the other
pub struct Shipper {
    delivery: Box<dyn Delivery>,
    batch_size: NonZeroUsize,
    backoff: ExponentialBackoff,
}

impl Shipper {
    /// Creates a shipper sending at most `batch_size` records per call. Transport
    /// errors are retried according to `backoff`.
    #[must_use]
    pub fn new(
        delivery: Box<dyn Delivery>,
        batch_size: NonZeroUsize,
        backoff: ExponentialBackoff,
    ) -> Self {
        Self {
            delivery,
            batch_size,
            backoff,
        }
    }

    /// Delivers `records` in order. The first failing batch stops the run.
    ///
    /// # Errors
    /// `Batch` carrying the index of the failed batch, the number of records
    /// delivered before it and the cause
    pub async fn ship(&self, records: &[LogRecord]) -> Result<Shipped> {
        let name = self.delivery.name();
        let total = records.len().div_ceil(self.batch_size.get());
        info!("shipping {} logs via {name} in {total} batches", records.len());

        let mut shipped = Shipped::default();
        for (index, batch) in records.chunks(self.batch_size.get()).enumerate() {
            debug!("ingesting log chunks {}/{total}", index + 1);
            let what = format!("{name} batch {}/{total}", index + 1);
            retriable(&self.backoff, &what, || self.delivery.deliver(batch))
                .await
                .map_err(|e| Error::Batch {
                    index,
                    delivered: shipped.records,
                    source: Box::new(e),
                })?;
            shipped.records += batch.len();
            shipped.batches += 1;
        }
        info!("shipped {} logs via {name}", shipped.records);
        Ok(shipped)
    }
}
