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

//! 1Password events API source: a cursor driven paginator shared by the sign-in,
//! item usage and audit endpoints, plus the normalizer flattening the events
//! into log records.
#![deny(
    clippy::all,
    clippy::unwrap_used,
    clippy::unnecessary_unwrap,
    clippy::pedantic,
    clippy::mod_module_files
)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod model;
/// Flattening into log records
pub mod normalize;
/// Request and response envelopes
pub mod page;
/// Cursor pagination
pub mod paginator;

pub use client::{EventsApi, EventsClient};
pub use model::{Category, RawEvent};
pub use normalize::normalize;
pub use page::Window;
pub use paginator::{fetch_pages, Fetcher};
