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

use log::{info, warn};
use one2sen_connectors_onepassword::Category;
use std::fmt;

/// What happened to one event category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryReport {
    /// the category
    pub category: Category,
    /// events returned by the events API
    pub fetched: usize,
    /// events turned into records
    pub normalized: usize,
    /// events that could not be normalized
    pub rejected: usize,
    /// why the category could not be fetched
    pub error: Option<String>,
}

impl CategoryReport {
    pub(crate) fn new(category: Category) -> Self {
        Self {
            category,
            fetched: 0,
            normalized: 0,
            rejected: 0,
            error: None,
        }
    }

    /// true if the category was fetched and every event normalized
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.rejected == 0
    }
}

impl fmt::Display for CategoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(e) = &self.error {
            write!(f, "{}: failed: {e}", self.category)
        } else {
            write!(
                f,
                "{}: fetched {}, normalized {}, rejected {}",
                self.category, self.fetched, self.normalized, self.rejected
            )
        }
    }
}

/// Summary of a pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// per category outcome, in shipping order
    pub categories: Vec<CategoryReport>,
    /// records delivered
    pub delivered: usize,
    /// delivery calls made
    pub batches: usize,
}

impl RunReport {
    /// Total events fetched over all categories
    #[must_use]
    pub fn fetched(&self) -> usize {
        self.categories.iter().map(|c| c.fetched).sum()
    }

    /// true if a category failed or a record was rejected
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.categories.iter().all(CategoryReport::is_complete)
    }

    /// Logs the report, degraded categories as warnings
    pub fn log(&self) {
        for c in &self.categories {
            if c.is_complete() {
                info!("{c}");
            } else {
                warn!("{c}");
            }
        }
        info!(
            "delivered {} of {} fetched logs in {} batches",
            self.delivered,
            self.fetched(),
            self.batches
        );
    }
}
