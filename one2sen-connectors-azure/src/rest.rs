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

use one2sen_common::{http::Response, Error, LogRecord, Result};
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies a delivery call in the logs
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct RequestId(u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out increasing request ids, starting at 1
#[derive(Debug, Default)]
pub(crate) struct RequestCounter(AtomicU64);

impl RequestCounter {
    pub(crate) fn next(&self) -> RequestId {
        RequestId(self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// JSON array body for a batch
pub(crate) fn batch_body(batch: &[LogRecord]) -> Result<Vec<u8>> {
    serde_json::to_vec(batch)
        .map_err(|e| Error::Protocol(format!("could not json encode log batch: {e}")))
}

/// Maps an ingestion response: 2xx is success, 401/403 are auth failures,
/// anything else refuses the batch
pub(crate) fn check_ingest(response: &Response) -> Result<()> {
    if response.is_success() {
        Ok(())
    } else if one2sen_common::is_auth_status(response.status) {
        Err(Error::Auth {
            status: response.status,
            body: response.text(),
        })
    } else {
        Err(Error::Ingest {
            status: response.status,
            body: response.text(),
        })
    }
}
