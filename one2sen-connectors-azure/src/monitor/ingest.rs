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
    auth::TokenSource,
    delivery::Delivery,
    rest::{batch_body, check_ingest, RequestCounter},
};
use async_trait::async_trait;
use log::debug;
use one2sen_common::{http, LogRecord, Result};
use reqwest::{header::CONTENT_TYPE, Client};
use std::sync::Arc;

/// Api version of the logs ingestion API
pub const API_VERSION: &str = "2023-01-01";

/// Writes batches to a data collection rule stream of the Logs Ingestion API.
///
/// The endpoint answers `204 No Content` whether or not the rule accepts the
/// data, a successful delivery only means the request was well formed.
pub struct IngestWriter {
    client: Client,
    url: String,
    tokens: Arc<dyn TokenSource>,
    requests: RequestCounter,
}

impl IngestWriter {
    /// A writer for `{endpoint}/dataCollectionRules/{rule_id}/streams/{stream}`
    #[must_use]
    pub fn new(
        client: Client,
        tokens: Arc<dyn TokenSource>,
        endpoint: &str,
        rule_id: &str,
        stream: &str,
    ) -> Self {
        let url = format!(
            "{dce_base_url}/dataCollectionRules/{rule_id}/streams/{stream}?api-version={API_VERSION}",
            dce_base_url = endpoint.trim_end_matches('/'),
        );
        Self {
            client,
            url,
            tokens,
            requests: RequestCounter::default(),
        }
    }

    /// The endpoint batches are posted to
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Delivery for IngestWriter {
    fn name(&self) -> &'static str {
        "logs ingestion"
    }

    async fn deliver(&self, batch: &[LogRecord]) -> Result<()> {
        let id = self.requests.next();
        let body = batch_body(batch)?;
        let token = self.tokens.token().await?;
        let request = self
            .client
            .post(&self.url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .build()?;
        let response = http::execute(&self.client, request).await?;
        debug!("[Request {id}] got ingest response {}", response.status);
        check_ingest(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        test::{mock_auth_server, mock_credentials},
        StaticToken, MONITOR_SCOPE,
    };
    use mockito::Matcher;
    use one2sen_common::Error;
    use serde_json::json;
    use std::time::Duration;

    const PATH: &str = "/dataCollectionRules/dcr-uuidv4/streams/Custom-OnePassword";

    fn record(user: &str) -> LogRecord {
        LogRecord {
            log_type: "Usage".to_string(),
            time_generated: "2024-01-15T10:30:00Z".to_string(),
            user: user.to_string(),
            client: "{}".to_string(),
            location: "{}".to_string(),
            data: "{}".to_string(),
        }
    }

    fn writer(server: &mockito::ServerGuard, tokens: Arc<dyn TokenSource>) -> Result<IngestWriter> {
        Ok(IngestWriter::new(
            http::client(Duration::from_secs(5))?,
            tokens,
            &format!("{}/", server.url()),
            "dcr-uuidv4",
            "Custom-OnePassword",
        ))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn posts_with_bearer_token() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .match_query(Matcher::UrlEncoded("api-version".into(), API_VERSION.into()))
            .match_header("authorization", "Bearer snot")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!([
                {
                    "LogType": "Usage", "TimeGenerated": "2024-01-15T10:30:00Z", "User": "a",
                    "Client": "{}", "Location": "{}", "Data": "{}"
                },
                {
                    "LogType": "Usage", "TimeGenerated": "2024-01-15T10:30:00Z", "User": "b",
                    "Client": "{}", "Location": "{}", "Data": "{}"
                }
            ])))
            .with_status(204)
            .create_async()
            .await;

        let w = writer(&server, Arc::new(StaticToken::new("snot")))?;
        assert!(w.url().ends_with(
            "/dataCollectionRules/dcr-uuidv4/streams/Custom-OnePassword?api-version=2023-01-01"
        ));
        assert!(!w.url().contains("//dataCollectionRules"));
        w.deliver(&[record("a"), record("b")]).await?;
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn uses_client_credentials() -> Result<()> {
        let auth = mock_auth_server().await;
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .match_query(Matcher::Any)
            .match_header("authorization", "Bearer test_access_token")
            .with_status(204)
            .expect(2)
            .create_async()
            .await;
        let w = writer(&server, Arc::new(mock_credentials(&auth, MONITOR_SCOPE)?))?;
        w.deliver(&[record("a")]).await?;
        w.deliver(&[record("b")]).await?;
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn refused_batches() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PATH)
            .match_query(Matcher::Any)
            .with_status(413)
            .with_body("too large")
            .create_async()
            .await;
        let w = writer(&server, Arc::new(StaticToken::new("snot")))?;
        let res = w.deliver(&[record("a")]).await;
        assert!(matches!(res, Err(Error::Ingest { status: 413, .. })));
        Ok(())
    }
}
