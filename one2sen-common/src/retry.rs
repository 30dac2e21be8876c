// Copyright 2020-2024, The Tremor Team
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

use crate::Result;
use log::warn;
use std::{future::Future, time::Duration};
use tokio::time::sleep;

/// How long to wait between attempts and how often to try again
pub trait BackoffStrategy {
    /// wait time before retry number `retry_index` (starting at 1)
    fn wait_time(&self, retry_index: u32) -> Duration;
    /// number of retries after the first attempt
    fn max_retries(&self) -> u32;
}

/// Doubles the wait time on every retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    max_retries: u32,
    base_sleep_time: Duration,
}

impl ExponentialBackoff {
    /// Creates a new strategy
    #[must_use]
    pub fn new(max_retries: u32, base_sleep_time: Duration) -> Self {
        Self {
            max_retries,
            base_sleep_time,
        }
    }

    /// A strategy that never retries
    #[must_use]
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn wait_time(&self, retry_index: u32) -> Duration {
        self.base_sleep_time
            .saturating_mul(2u32.saturating_pow(retry_index.saturating_sub(1)))
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

/// Runs `op` until it succeeds, fails with a non transport error or the
/// strategy runs out of retries. The last error is returned.
///
/// # Errors
/// the error of the last attempt
pub async fn retriable<B, F, Fut, T>(backoff: &B, what: &str, mut op: F) -> Result<T>
where
    B: BackoffStrategy + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_retries = backoff.max_retries();
    let mut retry = 0;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transport() && retry < max_retries => {
                retry += 1;
                let wait = backoff.wait_time(retry);
                warn!("{what} failed, retry {retry}/{max_retries} in {wait:?}: {e}");
                sleep(wait).await;
            }
            Err(e) => return Err(e),
        }
    }
}
