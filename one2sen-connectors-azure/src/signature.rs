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

//! Shared key request signing for the HTTP Data Collector API

use hmac::{Hmac, Mac};
use one2sen_common::{
    base64::{Engine, BASE64},
    Error, Result,
};
use sha2::Sha256;

/// The only resource the data collector accepts
pub const RESOURCE: &str = "/api/logs";

/// The canonical string for a `POST` of `content_length` json bytes at `date`.
///
/// `date` must be the exact value of the `x-ms-date` header.
#[must_use]
pub fn string_to_sign(content_length: usize, date: &str) -> String {
    format!("POST\n{content_length}\napplication/json\nx-ms-date:{date}\n{RESOURCE}")
}

/// HMAC-SHA256 of `message` keyed with the base64 decoded `secret`, base64 encoded.
///
/// # Errors
/// `Signature` if the message or secret are empty or the secret isn't base64
pub fn build_signature(message: &str, secret: &str) -> Result<String> {
    if message.is_empty() {
        return Err(Error::Signature("empty message".to_string()));
    }
    if secret.is_empty() {
        return Err(Error::Signature("empty secret".to_string()));
    }
    let key = BASE64
        .decode(secret)
        .map_err(|e| Error::Signature(format!("invalid base64 secret: {e}")))?;
    let mut mac = Hmac::<Sha256>::new_from_slice(&key)
        .map_err(|e| Error::Signature(format!("invalid key: {e}")))?;
    mac.update(message.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// The `Authorization` header value
#[must_use]
pub fn authorization(workspace_id: &str, signature: &str) -> String {
    format!("SharedKey {workspace_id}:{signature}")
}
