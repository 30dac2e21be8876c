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

#![allow(clippy::doc_markdown)]

//!
//! ## Azure Monitor writers
//!
//! Two ways of getting records into a Log Analytics table, both behind the
//! [`Delivery`](crate::delivery::Delivery) capability:
//!
//! | writer            | API                                                                                                                        | authorization                         |
//! |-------------------|----------------------------------------------------------------------------------------------------------------------------|---------------------------------------|
//! | `SharedKeyWriter` | [HTTP Data Collector API](https://learn.microsoft.com/en-us/azure/azure-monitor/logs/data-collector-api)                    | HMAC-SHA256 over a canonical string   |
//! | `IngestWriter`    | [Logs Ingestion API](https://learn.microsoft.com/en-us/azure/azure-monitor/logs/logs-ingestion-api-overview) via a DCR      | bearer token (client credentials)     |
//!
//! ### Shared key
//!
//! ```text
//! POST https://<workspace-id>.ods.opinsights.azure.com/api/logs?api-version=2016-04-01
//! Log-Type: OnePasswordLogs_CL
//! Authorization: SharedKey <workspace-id>:<base64 hmac>
//! Content-Type: application/json
//! x-ms-date: Mon, 15 Jan 2024 10:30:00 GMT
//! time-generated-field: TimeGenerated
//! ```
//!
//! The signed string is `POST\n<content length>\napplication/json\nx-ms-date:<x-ms-date>\n/api/logs`,
//! keyed with the base64 decoded workspace key.
//!
//! ### Data collection rule
//!
//! ```text
//! POST https://<dce-name>.northeurope-1.ingest.monitor.azure.com/dataCollectionRules/<dcr-immutable-id>/streams/<dcr-stream-name>?api-version=2023-01-01
//! Content-Type: application/json
//! Authorization: Bearer <token for https://monitor.azure.com/.default>
//! ```
//!
//! Both take a JSON array of records as body.

/// HTTP Data Collector API
pub mod collector;
/// Logs Ingestion API
pub mod ingest;
