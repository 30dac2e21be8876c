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

/// Result alias used across the pipeline crates
pub type Result<T> = std::result::Result<T, Error>;

/// The error type shared by the fetch, normalize and ship stages
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network failure, timeout or an unreadable response body
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Unexpected HTTP status from an endpoint, treated as a transport level failure
    #[error("{url} returned status code {status}: {body}")]
    Status {
        /// the requested url
        url: String,
        /// HTTP status code
        status: u16,
        /// response body, possibly empty
        body: String,
    },
    /// Credentials were rejected or could not be obtained
    #[error("authentication failed with status code {status}: {body}")]
    Auth {
        /// HTTP status code, 0 if no response was received
        status: u16,
        /// response body or reason
        body: String,
    },
    /// Malformed or error bearing response
    #[error("protocol error: {0}")]
    Protocol(String),
    /// A source timestamp that can't be parsed
    #[error("invalid event timestamp `{value}`: {source}")]
    TimestampParse {
        /// the offending timestamp
        value: String,
        /// parser error
        #[source]
        source: chrono::ParseError,
    },
    /// The ingestion endpoint refused a batch
    #[error("ingestion failed with status code {status}: {body}")]
    Ingest {
        /// HTTP status code
        status: u16,
        /// response body, possibly empty
        body: String,
    },
    /// Invalid input for request signing
    #[error("could not build signature: {0}")]
    Signature(String),
    /// A batch failed, no further batches were sent
    #[error("batch {index} failed after {delivered} records were delivered: {source}")]
    Batch {
        /// zero based index of the failing batch
        index: usize,
        /// number of records delivered before the failure
        delivered: usize,
        /// the underlying error
        #[source]
        source: Box<Error>,
    },
    /// The run was cancelled from the outside
    #[error("cancelled")]
    Cancelled,
}

impl Error {
    /// Transport level failures are the only ones worth retrying
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { .. })
    }

    /// Maps a non success status to `Auth` for 401/403 and to `Status` otherwise
    #[must_use]
    pub fn from_status(url: &str, status: u16, body: String) -> Self {
        if is_auth_status(status) {
            Self::Auth { status, body }
        } else {
            Self::Status {
                url: url.to_string(),
                status,
                body,
            }
        }
    }
}

/// 401 and 403 signal bad or expired credentials
#[must_use]
pub fn is_auth_status(status: u16) -> bool {
    status == 401 || status == 403
}
