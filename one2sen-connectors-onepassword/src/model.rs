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

//! Events as returned by the 1Password events API.
//!
//! Every field is optional on the wire, sub-objects the API leaves out stay
//! `None` and are later written as `{}`.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The three event categories of the events API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// sign-in attempts
    Signin,
    /// item usages
    Usage,
    /// audit events
    Audit,
}

impl Category {
    /// All categories in shipping order
    pub const ALL: [Category; 3] = [Self::Signin, Self::Usage, Self::Audit];

    /// endpoint below `/api/v1/`
    #[must_use]
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Signin => "signinattempts",
            Self::Usage => "itemusages",
            Self::Audit => "auditevents",
        }
    }

    /// The `LogType` column value
    #[must_use]
    pub fn log_type(self) -> &'static str {
        match self {
            Self::Signin => "Signin",
            Self::Usage => "Usage",
            Self::Audit => "Audit",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

/// A user or actor reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    /// user uuid
    pub uuid: String,
    /// display name
    pub name: String,
    /// email address
    pub email: String,
}

/// The client an event originated from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Client {
    /// application name
    pub app_name: String,
    /// application version
    pub app_version: String,
    /// platform name
    pub platform_name: String,
    /// platform version
    pub platform_version: String,
    /// operating system
    pub os_name: String,
    /// operating system version
    pub os_version: String,
    /// source ip
    pub ip_address: String,
}

/// Geolocation of the client ip
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    /// ISO country code
    pub country: String,
    /// region
    pub region: String,
    /// city
    pub city: String,
    /// latitude
    pub latitude: f64,
    /// longitude
    pub longitude: f64,
}

/// Session an audit event happened in
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    /// session uuid
    pub uuid: String,
    /// login time
    pub login_time: String,
    /// device uuid
    pub device_uuid: String,
    /// source ip
    pub ip: String,
}

/// `POST /api/v1/signinattempts` item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigninAttempt {
    /// event uuid
    pub uuid: String,
    /// session uuid
    pub session_uuid: String,
    /// event time
    pub timestamp: String,
    /// country
    pub country: String,
    /// `success`, `credentials_failed`, ...
    pub category: String,
    /// detailed outcome, e.g. `credentials_ok`
    #[serde(rename = "type")]
    pub kind: String,
    /// free form details
    pub details: Value,
    /// the user signing in
    pub target_user: Option<User>,
    /// client
    pub client: Option<Client>,
    /// location
    pub location: Option<Location>,
}

impl SigninAttempt {
    /// True if the event type carries a success marker
    #[must_use]
    pub fn is_ok(&self) -> bool {
        let kind = self.kind.to_lowercase();
        kind.contains("success") || kind.contains("_ok")
    }
}

/// `POST /api/v1/itemusages` item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemUsage {
    /// event uuid
    pub uuid: String,
    /// event time
    pub timestamp: String,
    /// item version that was used
    pub used_version: i64,
    /// vault
    pub vault_uuid: String,
    /// item
    pub item_uuid: String,
    /// the user
    pub user: Option<User>,
    /// client
    pub client: Option<Client>,
    /// location
    pub location: Option<Location>,
    /// `fill`, `reveal`, `secure-copy`, ...
    pub action: String,
}

/// `POST /api/v1/auditevents` item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditEvent {
    /// event uuid
    pub uuid: String,
    /// event time
    pub timestamp: String,
    /// actor
    pub actor_uuid: String,
    /// actor name and email
    pub actor_details: Option<User>,
    /// what was done
    pub action: String,
    /// kind of the target object
    pub object_type: String,
    /// target object
    pub object_uuid: String,
    /// auxiliary id
    pub aux_id: i64,
    /// auxiliary object
    pub aux_uuid: String,
    /// auxiliary object details
    pub aux_details: Option<User>,
    /// auxiliary information
    pub aux_info: String,
    /// session
    pub session: Option<Session>,
    /// location
    pub location: Option<Location>,
}

/// A fetched event of any category
#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
    /// sign-in attempt
    Signin(SigninAttempt),
    /// item usage
    Usage(ItemUsage),
    /// audit event
    Audit(AuditEvent),
}

impl RawEvent {
    /// The category of the event
    #[must_use]
    pub fn category(&self) -> Category {
        match self {
            Self::Signin(_) => Category::Signin,
            Self::Usage(_) => Category::Usage,
            Self::Audit(_) => Category::Audit,
        }
    }

    /// The source timestamp
    #[must_use]
    pub fn timestamp(&self) -> &str {
        match self {
            Self::Signin(e) => &e.timestamp,
            Self::Usage(e) => &e.timestamp,
            Self::Audit(e) => &e.timestamp,
        }
    }
}

/// An item type one of the event endpoints returns
pub trait EventKind: DeserializeOwned + Send + 'static {
    /// the category, and with it the endpoint
    const CATEGORY: Category;

    /// wraps the item
    fn into_raw(self) -> RawEvent;
}

impl EventKind for SigninAttempt {
    const CATEGORY: Category = Category::Signin;
    fn into_raw(self) -> RawEvent {
        RawEvent::Signin(self)
    }
}

impl EventKind for ItemUsage {
    const CATEGORY: Category = Category::Usage;
    fn into_raw(self) -> RawEvent {
        RawEvent::Usage(self)
    }
}

impl EventKind for AuditEvent {
    const CATEGORY: Category = Category::Audit;
    fn into_raw(self) -> RawEvent {
        RawEvent::Audit(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("credentials_ok", true ; "credentials ok")]
    #[test_case("mfa_ok", true ; "mfa ok")]
    #[test_case("SUCCESS", true ; "upper case success")]
    #[test_case("credentials_failed", false ; "failed")]
    #[test_case("", false ; "empty")]
    #[test_case("okay", false ; "no marker")]
    fn success_marker(kind: &str, ok: bool) {
        let e = SigninAttempt {
            kind: kind.to_string(),
            ..SigninAttempt::default()
        };
        assert_eq!(e.is_ok(), ok);
    }

    #[test]
    fn sparse_items_deserialize() -> serde_json::Result<()> {
        let e: SigninAttempt =
            serde_json::from_str(r#"{"uuid":"u","timestamp":"2024-01-15T10:30:00Z","type":"x"}"#)?;
        assert_eq!(e.kind, "x");
        assert!(e.target_user.is_none());
        assert!(e.details.is_null());

        let e: AuditEvent = serde_json::from_str(
            r#"{"actor_uuid":"a","actor_details":null,"aux_id":7,
                "session":{"uuid":"s"},"unknown":1}"#,
        )?;
        assert_eq!(e.aux_id, 7);
        assert!(e.actor_details.is_none());
        assert_eq!(e.session.map(|s| s.uuid).as_deref(), Some("s"));
        Ok(())
    }

    #[test]
    fn categories() {
        let names: Vec<_> = Category::ALL.iter().map(|c| c.log_type()).collect();
        assert_eq!(names, ["Signin", "Usage", "Audit"]);
        assert_eq!(Category::Usage.to_string(), "itemusages");
        assert_eq!(
            ItemUsage::default().into_raw().category(),
            <ItemUsage as EventKind>::CATEGORY
        );
    }
}
