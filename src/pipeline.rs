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

use crate::{
    killswitch::KillSwitch,
    report::{CategoryReport, RunReport},
};
use futures::future::join_all;
use log::{error, info, warn};
use one2sen_common::{time::rfc3339, Error, LogRecord, Result};
use one2sen_connectors_azure::Shipper;
use one2sen_connectors_onepassword::{normalize, Category, Fetcher, RawEvent, Window};
use std::time::Duration;

/// One run: fetch every category, normalize, ship.
///
/// A category that can't be fetched is reported and skipped, the others are
/// still shipped. Records that fail to normalize are counted as rejected.
/// A failing batch ends the run.
pub struct Pipeline {
    fetcher: Fetcher,
    shipper: Shipper,
    lookback: Duration,
    kill_switch: KillSwitch,
}

impl Pipeline {
    /// A pipeline shipping the events of the last `lookback`
    #[must_use]
    pub fn new(fetcher: Fetcher, shipper: Shipper, lookback: Duration) -> Self {
        Self {
            fetcher,
            shipper,
            lookback,
            kill_switch: KillSwitch::new(),
        }
    }

    /// Cancels the run when `kill_switch` is tripped
    #[must_use]
    pub fn with_kill_switch(mut self, kill_switch: KillSwitch) -> Self {
        self.kill_switch = kill_switch;
        self
    }

    /// Fetches all categories concurrently and normalizes them, records come
    /// out in sign-in, usage, audit order.
    pub async fn collect(&self, window: &Window) -> (Vec<LogRecord>, Vec<CategoryReport>) {
        let fetched = join_all(Category::ALL.map(|c| self.fetcher.fetch_window(c, window))).await;
        let mut records = Vec::new();
        let reports: Vec<_> = Category::ALL
            .into_iter()
            .zip(fetched)
            .map(|(category, events)| normalize_category(category, events, &mut records))
            .collect();
        (records, reports)
    }

    /// Runs over `[now - lookback, now]`
    ///
    /// # Errors
    /// * `Batch` if a batch could not be delivered
    /// * `Cancelled` if the kill switch was tripped
    pub async fn run(&self) -> Result<RunReport> {
        self.run_window(&Window::lookback(self.lookback)).await
    }

    /// Runs over `window`
    ///
    /// # Errors
    /// see [`Pipeline::run`]
    pub async fn run_window(&self, window: &Window) -> Result<RunReport> {
        tokio::select! {
            biased;
            () = self.kill_switch.stopped() => {
                warn!("run cancelled");
                Err(Error::Cancelled)
            }
            res = self.execute(window) => res,
        }
    }

    async fn execute(&self, window: &Window) -> Result<RunReport> {
        info!(
            "collecting events from {} to {}",
            rfc3339(&window.start),
            rfc3339(&window.end)
        );
        let (records, categories) = self.collect(window).await;
        info!("collected {} logs", records.len());
        let shipped = self.shipper.ship(&records).await?;
        Ok(RunReport {
            categories,
            delivered: shipped.records,
            batches: shipped.batches,
        })
    }
}

fn normalize_category(
    category: Category,
    events: Result<Vec<RawEvent>>,
    records: &mut Vec<LogRecord>,
) -> CategoryReport {
    let mut report = CategoryReport::new(category);
    let events = match events {
        Ok(events) => events,
        Err(e) => {
            error!("could not fetch {category} events, skipping them: {e}");
            report.error = Some(e.to_string());
            return report;
        }
    };
    report.fetched = events.len();
    for event in &events {
        match normalize(event) {
            Ok(record) => {
                records.push(record);
                report.normalized += 1;
            }
            Err(e) => {
                warn!("rejected {category} event: {e}");
                report.rejected += 1;
            }
        }
    }
    report
}
