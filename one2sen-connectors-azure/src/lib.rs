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

//! Microsoft Sentinel sink: Azure Monitor writers, the batching shipper in
//! front of them and the table provisioning client.
#![deny(
    clippy::all,
    clippy::unwrap_used,
    clippy::unnecessary_unwrap,
    clippy::pedantic,
    clippy::mod_module_files
)]
#![allow(clippy::module_name_repetitions)]

/// Entra ID bearer tokens
pub mod auth;
/// Batching and delivery
pub mod delivery;
pub mod monitor;
mod rest;
/// Data collector request signing
pub mod signature;
pub mod table;

pub use auth::{ClientCredentials, StaticToken, TokenSource};
pub use delivery::{Delivery, Shipped, Shipper};
pub use monitor::{collector::SharedKeyWriter, ingest::IngestWriter};
pub use table::{TableLocation, TableProvisioner};
