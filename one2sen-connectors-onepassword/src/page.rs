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

use chrono::{DateTime, Utc};
use one2sen_common::time::rfc3339;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The time range `[start, end]` events are requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// inclusive start
    pub start: DateTime<Utc>,
    /// end
    pub end: DateTime<Utc>,
}

impl Window {
    /// `[end - lookback, end]`, saturating at the earliest representable instant
    #[must_use]
    pub fn ending_at(end: DateTime<Utc>, lookback: Duration) -> Self {
        let start = chrono::Duration::from_std(lookback)
            .ok()
            .and_then(|lookback| end.checked_sub_signed(lookback))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end }
    }

    /// `[now - lookback, now]`
    #[must_use]
    pub fn lookback(lookback: Duration) -> Self {
        Self::ending_at(Utc::now(), lookback)
    }
}

/// Body of a page request.
///
/// The first request of a fetch describes the window, every following one only
/// carries the cursor of the previous response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PageRequest {
    /// initial request
    Window {
        /// page size
        limit: u32,
        /// RFC 3339
        start_time: String,
        /// RFC 3339
        end_time: String,
    },
    /// continuation
    Cursor {
        /// cursor of the previous response
        cursor: String,
    },
}

impl PageRequest {
    /// The initial request for `window`
    #[must_use]
    pub fn window(limit: u32, window: &Window) -> Self {
        Self::Window {
            limit,
            start_time: rfc3339(&window.start),
            end_time: rfc3339(&window.end),
        }
    }

    /// A continuation request
    #[must_use]
    pub fn cursor(cursor: String) -> Self {
        Self::Cursor { cursor }
    }

    /// The cursor, if this is a continuation
    #[must_use]
    pub fn as_cursor(&self) -> Option<&str> {
        match self {
            Self::Cursor { cursor } => Some(cursor),
            Self::Window { .. } => None,
        }
    }
}

/// Error envelope the API may populate even on `200 OK`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    /// error description
    #[serde(rename = "Message", default)]
    pub message: String,
}

/// A page of items
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PageResponse<T> {
    /// continuation token
    #[serde(default)]
    pub cursor: String,
    /// more pages are available
    #[serde(default)]
    pub has_more: bool,
    /// the items, `null` and missing are treated as empty
    pub items: Option<Vec<T>>,
    /// error envelope
    #[serde(rename = "Error")]
    pub error: Option<ApiError>,
}

impl<T> PageResponse<T> {
    /// The error message, if the API reported one
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error
            .as_ref()
            .map(|e| e.message.as_str())
            .filter(|m| !m.is_empty())
    }
}
