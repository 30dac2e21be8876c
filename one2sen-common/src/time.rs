// Copyright 2020-2024, The Tremor Team
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
use chrono::{DateTime, SecondsFormat, Utc};

/// `x-ms-date` layout, the zone is the literal text `GMT`
const RFC1123_GMT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Formats an instant the way the shared key protocol expects it,
/// e.g. `Mon, 15 Jan 2024 10:30:00 GMT`
#[must_use]
pub fn rfc1123(instant: &DateTime<Utc>) -> String {
    instant.format(RFC1123_GMT).to_string()
}

/// RFC 3339 in UTC with second precision, e.g. `2024-01-15T10:30:00Z`
#[must_use]
pub fn rfc3339(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses an RFC 3339 instant with optional fractional seconds and any offset.
///
/// # Errors
/// if `value` is not an RFC 3339 timestamp
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|t| t.with_timezone(&Utc))
}
