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

//! one2sen: ships 1Password events to Microsoft Sentinel.
//!
//! A run fetches the sign-in, item usage and audit events of a lookback window,
//! flattens them into [`LogRecord`](one2sen_common::LogRecord)s and delivers
//! them in batches to a Log Analytics table.

#![deny(missing_docs)]
#![recursion_limit = "1024"]
#![deny(
    clippy::all,
    clippy::unwrap_used,
    clippy::unnecessary_unwrap,
    clippy::pedantic,
    clippy::mod_module_files
)]

/// Cancellation
pub mod killswitch;
/// Fetch, normalize and ship
pub mod pipeline;
/// Run summary
pub mod report;

pub use killswitch::KillSwitch;
pub use pipeline::Pipeline;
pub use report::{CategoryReport, RunReport};
