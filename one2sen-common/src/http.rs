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

use crate::Result;
use log::{log_enabled, trace, Level};
use reqwest::{header::HeaderMap, redirect::Policy, Client, Request};
use std::time::Duration;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("one2sen/", env!("CARGO_PKG_VERSION"));

const DEFAULT_REDIRECTS: usize = 10;

const REDACTED: &str = "<redacted>";

/// Builds a client where every request carries `timeout`
///
/// # Errors
/// if the TLS backend can't be initialised
pub fn client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .redirect(Policy::limited(DEFAULT_REDIRECTS))
        .build()?)
}

/// A fully read response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// response headers
    pub headers: HeaderMap,
    /// the complete body
    pub body: Vec<u8>,
}

impl Response {
    /// 2xx
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Value of header `name` if present and visible ascii
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The body as text, invalid utf8 is replaced
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

/// Sends `request` and reads the full body. Request and response bodies are
/// dumped at trace level, headers never are since they carry credentials.
///
/// # Errors
/// on connection failures, timeouts or if the body can't be read
pub async fn execute(client: &Client, request: Request) -> Result<Response> {
    send(client, request, true).await
}

/// Like [`execute`] but never dumps bodies, for requests or responses that
/// carry secrets such as token exchanges.
///
/// # Errors
/// on connection failures, timeouts or if the body can't be read
pub async fn execute_sensitive(client: &Client, request: Request) -> Result<Response> {
    send(client, request, false).await
}

async fn send(client: &Client, request: Request, dump_bodies: bool) -> Result<Response> {
    let method = request.method().clone();
    let url = request.url().to_string();
    if log_enabled!(Level::Trace) {
        let body = if dump_bodies {
            request
                .body()
                .and_then(reqwest::Body::as_bytes)
                .map(String::from_utf8_lossy)
                .unwrap_or_default()
        } else {
            REDACTED.into()
        };
        trace!(">>> {method} {url} {body}");
    }
    let response = client.execute(request).await?;
    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();
    let response = Response {
        status,
        headers,
        body,
    };
    if log_enabled!(Level::Trace) {
        let body = if dump_bodies {
            response.text()
        } else {
            REDACTED.to_string()
        };
        trace!("<<< {method} {url} {status} {body}");
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_range() {
        let mut r = Response {
            status: 200,
            headers: HeaderMap::new(),
            body: b"ok".to_vec(),
        };
        assert!(r.is_success());
        r.status = 204;
        assert!(r.is_success());
        r.status = 299;
        assert!(r.is_success());
        r.status = 300;
        assert!(!r.is_success());
        r.status = 199;
        assert!(!r.is_success());
        assert_eq!(r.text(), "ok");
        assert_eq!(r.header("location"), None);
        r.headers
            .insert("location", reqwest::header::HeaderValue::from_static("/x"));
        assert_eq!(r.header("Location"), Some("/x"));
    }

    #[test]
    fn builds_client() {
        assert!(client(Duration::from_secs(1)).is_ok());
    }
}
