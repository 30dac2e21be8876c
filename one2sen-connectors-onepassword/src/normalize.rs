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

//! Flattens events into [`LogRecord`]s.
//!
//! `User`, `Client` and `Location` carry the serialized sub-objects, `Data`
//! the category specific fields so they survive the fixed table schema.

use crate::model::{AuditEvent, Category, ItemUsage, Location, RawEvent, SigninAttempt, User};
use one2sen_common::{
    record::{to_column, EMPTY_OBJECT},
    time, Error, LogRecord, Result,
};
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SigninData<'e> {
    #[serde(rename = "OK")]
    ok: bool,
    details: String,
    #[serde(rename = "SessionUUID")]
    session_uuid: &'e str,
    event_type: &'e str,
    category: &'e str,
    #[serde(flatten)]
    actor: Actor<'e>,
    #[serde(flatten)]
    place: Place<'e>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct UsageData<'e> {
    action: &'e str,
    #[serde(rename = "VaultUUID")]
    vault_uuid: &'e str,
    #[serde(rename = "ItemUUID")]
    item_uuid: &'e str,
    used_version: i64,
    #[serde(flatten)]
    actor: Actor<'e>,
    #[serde(flatten)]
    place: Place<'e>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AuditData<'e> {
    action: &'e str,
    #[serde(flatten)]
    actor: Actor<'e>,
    object_type: &'e str,
    #[serde(rename = "ObjectUUID")]
    object_uuid: &'e str,
    #[serde(rename = "SessionUUID")]
    session_uuid: &'e str,
    #[serde(rename = "AuxID")]
    aux_id: i64,
    #[serde(rename = "AuxUUID")]
    aux_uuid: &'e str,
    aux_info: &'e str,
    aux_details: String,
    #[serde(flatten)]
    place: Place<'e>,
}

#[derive(Serialize, Default)]
struct Actor<'e> {
    #[serde(rename = "ActorUUID")]
    uuid: &'e str,
    #[serde(rename = "ActorName")]
    name: &'e str,
    #[serde(rename = "ActorEmail")]
    email: &'e str,
}

impl<'e> Actor<'e> {
    fn of(user: Option<&'e User>) -> Self {
        user.map_or_else(Self::default, |u| Self {
            uuid: &u.uuid,
            name: &u.name,
            email: &u.email,
        })
    }
}

#[derive(Serialize, Default)]
#[serde(rename_all = "PascalCase")]
struct Place<'e> {
    city: &'e str,
    country: &'e str,
}

impl<'e> Place<'e> {
    fn of(location: Option<&'e Location>) -> Self {
        location.map_or_else(Self::default, |l| Self {
            city: &l.city,
            country: &l.country,
        })
    }
}

fn column<T: Serialize + ?Sized>(what: &str, value: &T) -> Result<String> {
    to_column(value).map_err(|e| Error::Protocol(format!("could not serialize {what}: {e}")))
}

fn time_generated(timestamp: &str) -> Result<String> {
    time::parse_instant(timestamp)
        .map(|t| time::rfc3339(&t))
        .map_err(|source| Error::TimestampParse {
            value: timestamp.to_string(),
            source,
        })
}

fn signin(e: &SigninAttempt) -> Result<LogRecord> {
    let data = SigninData {
        ok: e.is_ok(),
        details: column("details", &e.details)?,
        session_uuid: &e.session_uuid,
        event_type: &e.kind,
        category: &e.category,
        actor: Actor::of(e.target_user.as_ref()),
        place: Place::of(e.location.as_ref()),
    };
    Ok(LogRecord {
        log_type: Category::Signin.log_type().to_string(),
        time_generated: time_generated(&e.timestamp)?,
        user: column("user", &e.target_user)?,
        client: column("client", &e.client)?,
        location: column("location", &e.location)?,
        data: column("data", &data)?,
    })
}

fn usage(e: &ItemUsage) -> Result<LogRecord> {
    let data = UsageData {
        action: &e.action,
        vault_uuid: &e.vault_uuid,
        item_uuid: &e.item_uuid,
        used_version: e.used_version,
        actor: Actor::of(e.user.as_ref()),
        place: Place::of(e.location.as_ref()),
    };
    Ok(LogRecord {
        log_type: Category::Usage.log_type().to_string(),
        time_generated: time_generated(&e.timestamp)?,
        user: column("user", &e.user)?,
        client: column("client", &e.client)?,
        location: column("location", &e.location)?,
        data: column("data", &data)?,
    })
}

fn audit(e: &AuditEvent) -> Result<LogRecord> {
    let details = e.actor_details.as_ref();
    let data = AuditData {
        action: &e.action,
        actor: Actor {
            uuid: &e.actor_uuid,
            name: details.map_or("", |d| d.name.as_str()),
            email: details.map_or("", |d| d.email.as_str()),
        },
        object_type: &e.object_type,
        object_uuid: &e.object_uuid,
        session_uuid: e.session.as_ref().map_or("", |s| s.uuid.as_str()),
        aux_id: e.aux_id,
        aux_uuid: &e.aux_uuid,
        aux_info: &e.aux_info,
        aux_details: column("aux details", &e.aux_details)?,
        place: Place::of(e.location.as_ref()),
    };
    // the actor uuid is written as is, audit events carry no client
    let user = if e.actor_uuid.is_empty() {
        EMPTY_OBJECT.to_string()
    } else {
        e.actor_uuid.clone()
    };
    Ok(LogRecord {
        log_type: Category::Audit.log_type().to_string(),
        time_generated: time_generated(&e.timestamp)?,
        user,
        client: EMPTY_OBJECT.to_string(),
        location: column("location", &e.location)?,
        data: column("data", &data)?,
    })
}

/// Normalizes a single event.
///
/// Missing sub-objects become `{}`, only an unparseable timestamp fails.
///
/// # Errors
/// `TimestampParse` if the event timestamp is not RFC 3339
pub fn normalize(event: &RawEvent) -> Result<LogRecord> {
    match event {
        RawEvent::Signin(e) => signin(e),
        RawEvent::Usage(e) => usage(e),
        RawEvent::Audit(e) => audit(e),
    }
}
