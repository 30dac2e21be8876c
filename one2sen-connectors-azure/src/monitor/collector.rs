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

use crate::{
    delivery::Delivery,
    rest::{batch_body, check_ingest, RequestCounter},
    signature::{authorization, build_signature, string_to_sign},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use one2sen_common::{base64, http, time::rfc1123, Error, LogRecord, Result};
use reqwest::{header::CONTENT_TYPE, Client};
use std::fmt;

const API_VERSION: &str = "2016-04-01";

/// Column the data collector takes the record time from
pub const TIME_GENERATED_FIELD: &str = "TimeGenerated";

/// Writes batches to the HTTP Data Collector API, signing every request with
/// the workspace shared key.
pub struct SharedKeyWriter {
    client: Client,
    workspace_id: String,
    shared_key: String,
    log_type: String,
    url: String,
    clock: fn() -> DateTime<Utc>,
    requests: RequestCounter,
}

impl fmt::Debug for SharedKeyWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKeyWriter")
            .field("workspace_id", &self.workspace_id)
            .field("log_type", &self.log_type)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl SharedKeyWriter {
    /// A writer for `https://{workspace_id}.{ingestion_host}/api/logs`
    ///
    /// # Errors
    /// `Signature` if the workspace id is empty or the key isn't base64
    pub fn new(
        client: Client,
        workspace_id: &str,
        shared_key: &str,
        ingestion_host: &str,
        log_type: &str,
    ) -> Result<Self> {
        if workspace_id.is_empty() {
            return Err(Error::Signature("no workspace id provided".to_string()));
        }
        if !base64::is_valid(shared_key) {
            return Err(Error::Signature("invalid base64 secret".to_string()));
        }
        Ok(Self {
            client,
            workspace_id: workspace_id.to_string(),
            shared_key: shared_key.to_string(),
            log_type: log_type.to_string(),
            url: format!(
                "https://{workspace_id}.{ingestion_host}/api/logs?api-version={API_VERSION}"
            ),
            clock: Utc::now,
            requests: RequestCounter::default(),
        })
    }

    /// Sends to `{base_url}/api/logs` instead
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.url = format!(
            "{}/api/logs?api-version={API_VERSION}",
            base_url.trim_end_matches('/')
        );
        self
    }

    #[cfg(test)]
    fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// The endpoint batches are posted to
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Delivery for SharedKeyWriter {
    fn name(&self) -> &'static str {
        "shared key"
    }

    async fn deliver(&self, batch: &[LogRecord]) -> Result<()> {
        let id = self.requests.next();
        let body = batch_body(batch)?;
        let date = rfc1123(&(self.clock)());
        let signature = build_signature(&string_to_sign(body.len(), &date), &self.shared_key)?;

        let request = self
            .client
            .post(&self.url)
            .header("Log-Type", &self.log_type)
            .header("Authorization", authorization(&self.workspace_id, &signature))
            .header(CONTENT_TYPE, "application/json")
            .header("x-ms-date", &date)
            .header("time-generated-field", TIME_GENERATED_FIELD)
            .body(body)
            .build()?;
        let response = http::execute(&self.client, request).await?;
        debug!(
            "[Request {id}] got ingest response {}: {}",
            response.status,
            response.text()
        );
        check_ingest(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockito::Matcher;
    use std::time::Duration;

    const KEY: &str = "c25vdGJhZGdlcg==";

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0)
            .single()
            .unwrap_or_default()
    }

    fn record() -> LogRecord {
        LogRecord {
            log_type: "Signin".to_string(),
            time_generated: "2024-01-15T10:30:00Z".to_string(),
            user: "{}".to_string(),
            client: "{}".to_string(),
            location: "{}".to_string(),
            data: "{}".to_string(),
        }
    }

    fn writer(server: &mockito::ServerGuard) -> Result<SharedKeyWriter> {
        Ok(SharedKeyWriter::new(
            http::client(Duration::from_secs(5))?,
            "ws-id",
            KEY,
            "ods.opinsights.azure.com",
            "OnePasswordLogs_CL",
        )?
        .with_base_url(&server.url())
        .with_clock(fixed_clock))
    }

    #[test]
    fn default_url() -> Result<()> {
        let w = SharedKeyWriter::new(
            http::client(Duration::from_secs(1))?,
            "ws-id",
            KEY,
            "ods.opinsights.azure.com",
            "OnePasswordLogs_CL",
        )?;
        assert_eq!(
            w.url(),
            "https://ws-id.ods.opinsights.azure.com/api/logs?api-version=2016-04-01"
        );
        assert!(!format!("{w:?}").contains(KEY));
        Ok(())
    }

    #[test]
    fn rejects_bad_keys() -> Result<()> {
        let client = http::client(Duration::from_secs(1))?;
        assert!(SharedKeyWriter::new(client.clone(), "ws", "", "h", "T_CL").is_err());
        assert!(SharedKeyWriter::new(client.clone(), "ws", "***", "h", "T_CL").is_err());
        assert!(SharedKeyWriter::new(client, "", KEY, "h", "T_CL").is_err());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn signs_and_posts_the_batch() -> Result<()> {
        let batch = vec![record(), record()];
        let body = batch_body(&batch)?;
        let date = "Mon, 15 Jan 2024 10:30:00 GMT";
        let signature = build_signature(&string_to_sign(body.len(), date), KEY)?;

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/logs")
            .match_query(Matcher::UrlEncoded(
                "api-version".into(),
                "2016-04-01".into(),
            ))
            .match_header("log-type", "OnePasswordLogs_CL")
            .match_header("authorization", format!("SharedKey ws-id:{signature}").as_str())
            .match_header("content-type", "application/json")
            .match_header("x-ms-date", date)
            .match_header("time-generated-field", "TimeGenerated")
            .match_body(Matcher::Exact(String::from_utf8_lossy(&body).to_string()))
            .with_status(200)
            .create_async()
            .await;

        writer(&server)?.deliver(&batch).await?;
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rejected_batches() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/logs")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body("InvalidLogType")
            .create_async()
            .await;
        let res = writer(&server)?.deliver(&[record()]).await;
        match res {
            Err(Error::Ingest { status, body }) => {
                assert_eq!(status, 400);
                assert_eq!(body, "InvalidLogType");
            }
            other => panic!("expected ingest error, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn forbidden_is_auth() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/logs")
            .match_query(Matcher::Any)
            .with_status(403)
            .create_async()
            .await;
        let res = writer(&server)?.deliver(&[record()]).await;
        assert!(matches!(res, Err(Error::Auth { status: 403, .. })));
        Ok(())
    }
}
