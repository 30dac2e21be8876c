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

//! Creates or updates the destination table through the resource manager.

use crate::auth::TokenSource;
use log::{debug, info};
use one2sen_common::{
    http::{self, Response},
    record::COLUMNS,
    Error, Result,
};
use reqwest::{header::CONTENT_TYPE, Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio::time::sleep;

/// Api version of the tables API
pub const API_VERSION: &str = "2022-10-01";

const ASYNC_OPERATION: &str = "azure-asyncoperation";
const DESCRIPTION: &str = "Table that contains events ingested from 1Password.";

/// Column type of each record column
#[must_use]
pub fn column_type(name: &str) -> &'static str {
    match name {
        "TimeGenerated" => "datetime",
        "LogType" => "string",
        _ => "dynamic",
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TableProperties<'t> {
    retention_in_days: u32,
    total_retention_in_days: u32,
    schema: Schema<'t>,
}

#[derive(Serialize)]
struct Schema<'t> {
    name: &'t str,
    description: &'t str,
    columns: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct Operation {
    #[serde(default)]
    status: String,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Where the table lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLocation {
    /// resource manager, `https://management.azure.com`
    pub management_url: String,
    /// subscription id
    pub subscription_id: String,
    /// resource group
    pub resource_group: String,
    /// workspace name
    pub workspace_name: String,
    /// table name, ends with `_CL`
    pub table_name: String,
}

impl TableLocation {
    fn resource(&self) -> String {
        format!(
            concat!(
                "{}/subscriptions/{}/resourcegroups/{}",
                "/providers/Microsoft.OperationalInsights/workspaces/{}/tables/{}"
            ),
            self.management_url.trim_end_matches('/'),
            self.subscription_id,
            self.resource_group,
            self.workspace_name,
            self.table_name
        )
    }
}

/// Provisions the table with the fixed record schema
pub struct TableProvisioner {
    client: Client,
    tokens: Arc<dyn TokenSource>,
    location: TableLocation,
    poll_interval: Duration,
    max_polls: u32,
}

impl TableProvisioner {
    /// `tokens` must be valid for the resource manager scope
    #[must_use]
    pub fn new(client: Client, tokens: Arc<dyn TokenSource>, location: TableLocation) -> Self {
        Self {
            client,
            tokens,
            location,
            poll_interval: Duration::from_secs(1),
            max_polls: 300,
        }
    }

    /// Changes how often and how long a pending operation is polled
    #[must_use]
    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }

    /// The create or update request body
    #[must_use]
    pub fn table_definition(&self, retention_days: u32) -> serde_json::Value {
        let properties = TableProperties {
            retention_in_days: retention_days,
            total_retention_in_days: retention_days.saturating_mul(2),
            schema: Schema {
                name: &self.location.table_name,
                description: DESCRIPTION,
                columns: COLUMNS
                    .iter()
                    .map(|name| json!({"name": name, "type": column_type(name)}))
                    .collect(),
            },
        };
        json!({ "properties": properties })
    }

    async fn send(&self, method: Method, url: &str, body: Option<Vec<u8>>) -> Result<Response> {
        let token = self.tokens.token().await?;
        let mut request = self.client.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }
        let response = http::execute(&self.client, request.build()?).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(Error::from_status(url, response.status, response.text()))
        }
    }

    /// Migrates the table to the current plan, if it is a classic one.
    /// Failures are expected for new tables and only logged.
    async fn migrate(&self) {
        let url = format!("{}/migrate?api-version={API_VERSION}", self.location.resource());
        if let Err(e) = self.send(Method::POST, &url, None).await {
            debug!("could not migrate table: {e}");
        }
    }

    /// Creates or updates the table and waits for the operation to finish.
    ///
    /// # Errors
    /// if the token can't be obtained, the request is refused, the operation
    /// fails or doesn't finish in time
    pub async fn create_or_update(&self, retention_days: u32) -> Result<()> {
        let table = &self.location.table_name;
        info!("creating or updating table {table}");
        self.migrate().await;

        let url = format!("{}?api-version={API_VERSION}", self.location.resource());
        let body = serde_json::to_vec(&self.table_definition(retention_days))
            .map_err(|e| Error::Protocol(format!("could not encode table: {e}")))?;
        let response = self.send(Method::PUT, &url, Some(body)).await?;
        if response.status == 202 {
            let operation = response
                .header(ASYNC_OPERATION)
                .map(ToString::to_string)
                .ok_or_else(|| Error::Protocol("accepted without an async operation".to_string()))?;
            self.wait_for(&operation).await?;
        }
        info!("created table {table}");
        Ok(())
    }

    async fn wait_for(&self, operation: &str) -> Result<()> {
        for poll in 1..=self.max_polls {
            sleep(self.poll_interval).await;
            let response = self.send(Method::GET, operation, None).await?;
            let op: Operation = serde_json::from_slice(&response.body)
                .map_err(|e| Error::Protocol(format!("could not decode operation status: {e}")))?;
            debug!("table operation status after {poll} polls: {}", op.status);
            match op.status.as_str() {
                "Succeeded" => return Ok(()),
                "Failed" | "Canceled" => {
                    let reason = op.error.map(|e| e.to_string()).unwrap_or_default();
                    return Err(Error::Protocol(format!(
                        "table operation {}: {reason}",
                        op.status.to_lowercase()
                    )));
                }
                _ => (),
            }
        }
        Err(Error::Protocol(format!(
            "table operation did not finish after {} polls",
            self.max_polls
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use mockito::Matcher;
    use pretty_assertions::assert_eq;

    const RESOURCE: &str = concat!(
        "/subscriptions/sub/resourcegroups/rg",
        "/providers/Microsoft.OperationalInsights/workspaces/ws/tables/OnePasswordLogs_CL"
    );

    fn provisioner(server: &mockito::ServerGuard) -> Result<TableProvisioner> {
        Ok(TableProvisioner::new(
            http::client(Duration::from_secs(5))?,
            Arc::new(StaticToken::new("mgmt")),
            TableLocation {
                management_url: server.url(),
                subscription_id: "sub".to_string(),
                resource_group: "rg".to_string(),
                workspace_name: "ws".to_string(),
                table_name: "OnePasswordLogs_CL".to_string(),
            },
        )
        .with_polling(Duration::from_millis(1), 3))
    }

    #[test]
    fn definition() -> Result<()> {
        let server_less = TableProvisioner::new(
            http::client(Duration::from_secs(1))?,
            Arc::new(StaticToken::new("mgmt")),
            TableLocation {
                management_url: "https://management.azure.com".to_string(),
                subscription_id: "sub".to_string(),
                resource_group: "rg".to_string(),
                workspace_name: "ws".to_string(),
                table_name: "OnePasswordLogs_CL".to_string(),
            },
        );
        assert_eq!(
            server_less.table_definition(90),
            json!({
                "properties": {
                    "retentionInDays": 90,
                    "totalRetentionInDays": 180,
                    "schema": {
                        "name": "OnePasswordLogs_CL",
                        "description": "Table that contains events ingested from 1Password.",
                        "columns": [
                            {"name": "LogType", "type": "string"},
                            {"name": "TimeGenerated", "type": "datetime"},
                            {"name": "User", "type": "dynamic"},
                            {"name": "Client", "type": "dynamic"},
                            {"name": "Location", "type": "dynamic"},
                            {"name": "Data", "type": "dynamic"}
                        ]
                    }
                }
            })
        );
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn synchronous_create() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let migrate = server
            .mock("POST", format!("{RESOURCE}/migrate").as_str())
            .match_query(Matcher::UrlEncoded("api-version".into(), API_VERSION.into()))
            .with_status(404)
            .create_async()
            .await;
        let put = server
            .mock("PUT", RESOURCE)
            .match_query(Matcher::UrlEncoded("api-version".into(), API_VERSION.into()))
            .match_header("authorization", "Bearer mgmt")
            .match_body(Matcher::PartialJson(json!({
                "properties": {"retentionInDays": 30, "totalRetentionInDays": 60}
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        provisioner(&server)?.create_or_update(30).await?;
        migrate.assert_async().await;
        put.assert_async().await;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn polls_async_operation() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let operation = format!("{}/operations/op1", server.url());
        server
            .mock("POST", format!("{RESOURCE}/migrate").as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .create_async()
            .await;
        server
            .mock("PUT", RESOURCE)
            .match_query(Matcher::Any)
            .with_status(202)
            .with_header("Azure-AsyncOperation", &operation)
            .create_async()
            .await;
        let poll = server
            .mock("GET", "/operations/op1")
            .match_header("authorization", "Bearer mgmt")
            .with_status(200)
            .with_body(r#"{"status":"Succeeded"}"#)
            .expect(1)
            .create_async()
            .await;

        provisioner(&server)?.create_or_update(90).await?;
        poll.assert_async().await;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_operation() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let operation = format!("{}/operations/op2", server.url());
        server
            .mock("PUT", RESOURCE)
            .match_query(Matcher::Any)
            .with_status(202)
            .with_header("Azure-AsyncOperation", &operation)
            .create_async()
            .await;
        server
            .mock("GET", "/operations/op2")
            .with_status(200)
            .with_body(r#"{"status":"Failed","error":{"code":"InvalidSchema"}}"#)
            .create_async()
            .await;

        match provisioner(&server)?.create_or_update(90).await {
            Err(Error::Protocol(msg)) => assert!(msg.contains("InvalidSchema"), "{msg}"),
            other => panic!("expected protocol error, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn polling_is_bounded() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let operation = format!("{}/operations/op3", server.url());
        server
            .mock("PUT", RESOURCE)
            .match_query(Matcher::Any)
            .with_status(202)
            .with_header("Azure-AsyncOperation", &operation)
            .create_async()
            .await;
        let poll = server
            .mock("GET", "/operations/op3")
            .with_status(200)
            .with_body(r#"{"status":"InProgress"}"#)
            .expect(3)
            .create_async()
            .await;

        let res = provisioner(&server)?.create_or_update(90).await;
        assert!(matches!(res, Err(Error::Protocol(_))));
        poll.assert_async().await;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn forbidden() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", RESOURCE)
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body("AuthorizationFailed")
            .create_async()
            .await;
        let res = provisioner(&server)?.create_or_update(90).await;
        assert!(matches!(res, Err(Error::Auth { status: 403, .. })));
        Ok(())
    }
}
