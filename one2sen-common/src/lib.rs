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

//! Shared types and helpers for the one2sen source and sink connectors
#![deny(missing_docs)]
#![recursion_limit = "1024"]
#![deny(
    clippy::all,
    clippy::unwrap_used,
    clippy::unnecessary_unwrap,
    clippy::pedantic,
    clippy::mod_module_files
)]

mod errors;

/// Base64 engine
pub mod base64;

/// HTTP client construction and response helpers
pub mod http;

/// The canonical flat log record
pub mod record;

/// Retry with backoff
pub mod retry;

/// Time related functions
pub mod time;

pub use errors::{is_auth_status, Error, Result};
pub use record::LogRecord;
