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

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Column names, in the order they are serialized
pub const COLUMNS: [&str; 6] = ["LogType", "TimeGenerated", "User", "Client", "Location", "Data"];

/// The value written for an absent sub-object
pub const EMPTY_OBJECT: &str = "{}";

/// One row of the destination table.
///
/// The table schema is column-fixed, so every column is always present.
/// `User`, `Client`, `Location` and `Data` hold JSON documents encoded as
/// strings, `TimeGenerated` is RFC 3339 in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogRecord {
    /// Event category literal (`Signin`, `Usage`, `Audit`)
    pub log_type: String,
    /// Event time, `YYYY-MM-DDThh:mm:ssZ`
    pub time_generated: String,
    /// Serialized user / actor
    pub user: String,
    /// Serialized client descriptor
    pub client: String,
    /// Serialized geolocation
    pub location: String,
    /// Serialized category specific fields
    pub data: String,
}

impl LogRecord {
    /// Column name / value pairs in schema order
    #[must_use]
    pub fn columns(&self) -> [(&'static str, &str); 6] {
        [
            (COLUMNS[0], self.log_type.as_str()),
            (COLUMNS[1], self.time_generated.as_str()),
            (COLUMNS[2], self.user.as_str()),
            (COLUMNS[3], self.client.as_str()),
            (COLUMNS[4], self.location.as_str()),
            (COLUMNS[5], self.data.as_str()),
        ]
    }
}

/// Encodes a value for a JSON valued column.
///
/// Strings are passed through unchanged instead of being quoted a second time,
/// absent values (`None` / `null`) become `{}`.
///
/// # Errors
/// if the value can't be serialized
pub fn to_column<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    match serde_json::to_value(value)? {
        Value::String(s) => Ok(s),
        Value::Null => Ok(EMPTY_OBJECT.to_string()),
        other => serde_json::to_string(&other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Serialize)]
    struct Who {
        uuid: &'static str,
        name: &'static str,
    }

    #[test]
    fn strings_pass_through() -> serde_json::Result<()> {
        assert_eq!(to_column("ABCD")?, "ABCD");
        assert_eq!(to_column(&"{\"a\":1}".to_string())?, "{\"a\":1}");
        Ok(())
    }

    #[test]
    fn absent_is_empty_object() -> serde_json::Result<()> {
        let nothing: Option<Who> = None;
        assert_eq!(to_column(&nothing)?, "{}");
        assert_eq!(to_column(&Value::Null)?, "{}");
        Ok(())
    }

    #[test]
    fn objects_are_serialized() -> serde_json::Result<()> {
        let who = Some(Who {
            uuid: "u1",
            name: "badger",
        });
        let encoded = to_column(&who)?;
        assert_eq!(
            serde_json::from_str::<Value>(&encoded)?,
            json!({"uuid": "u1", "name": "badger"})
        );
        assert_eq!(to_column(&json!({}))?, "{}");
        Ok(())
    }

    #[test]
    fn serializes_with_fixed_columns() -> serde_json::Result<()> {
        let record = LogRecord {
            log_type: "Audit".to_string(),
            time_generated: "2024-01-15T10:30:00Z".to_string(),
            user: "u1".to_string(),
            client: EMPTY_OBJECT.to_string(),
            location: EMPTY_OBJECT.to_string(),
            data: EMPTY_OBJECT.to_string(),
        };
        let encoded = serde_json::to_string(&record)?;
        assert_eq!(
            encoded,
            r#"{"LogType":"Audit","TimeGenerated":"2024-01-15T10:30:00Z","User":"u1","Client":"{}","Location":"{}","Data":"{}"}"#
        );
        let names: Vec<_> = record.columns().iter().map(|(k, _)| *k).collect();
        assert_eq!(names, COLUMNS);
        Ok(())
    }
}
