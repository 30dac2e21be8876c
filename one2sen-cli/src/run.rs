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

use crate::{cli::Cli, logging};
use anyhow::Context;
use futures::StreamExt;
use log::LevelFilter;
use one2sen::{KillSwitch, Pipeline, RunReport};
use one2sen_common::{http, retry::ExponentialBackoff, Error};
use one2sen_config::{Config, DeliveryMode, Microsoft};
use one2sen_connectors_azure::{
    auth::{MANAGEMENT_SCOPE, MONITOR_SCOPE},
    ClientCredentials, Delivery, IngestWriter, SharedKeyWriter, Shipper, TableLocation,
    TableProvisioner,
};
use one2sen_connectors_onepassword::{EventsClient, Fetcher};
use reqwest::Client;
use signal_hook::{
    consts::signal::{SIGINT, SIGQUIT, SIGTERM},
    low_level::signal_name,
};
use signal_hook_tokio::Signals;
use std::{future::Future, num::NonZeroUsize, process::ExitCode, sync::Arc};

/// Exit code of a run that delivered what it could but skipped categories or records
const DEGRADED: u8 = 2;

/// Loads the configuration, sets up logging and runs the pipeline once
pub(crate) async fn run(cli: &Cli) -> ExitCode {
    let config = Config::load(cli.config.as_deref());
    let level = config
        .as_ref()
        .ok()
        .and_then(|c| c.log.level_filter().ok())
        .unwrap_or(LevelFilter::Info);
    if let Err(e) = logging::init(cli.logger_config.as_deref(), level) {
        eprintln!("could not set up logging: {e}");
        return ExitCode::FAILURE;
    }
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        "one2sen {} shipping via {}",
        env!("CARGO_PKG_VERSION"),
        config.delivery_mode()
    );

    match run_with_signals(&config).await {
        Ok(report) => {
            report.log();
            if report.is_degraded() {
                warn!("run finished degraded");
                ExitCode::from(DEGRADED)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!("run failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run_with_signals(config: &Config) -> anyhow::Result<RunReport> {
    let kill_switch = KillSwitch::new();
    let signals = Signals::new([SIGTERM, SIGINT, SIGQUIT])?;
    let signal_handle = signals.handle();
    let signal_handler_task = tokio::spawn(handle_signals(signals, kill_switch.clone()));

    let res = ship(config, kill_switch).await;

    signal_handle.close();
    signal_handler_task.await?;
    res
}

async fn ship(config: &Config, kill_switch: KillSwitch) -> anyhow::Result<RunReport> {
    let client = http::client(config.delivery.timeout)?;
    if config.microsoft.update_table {
        let provisioner = provisioner(&config.microsoft, client.clone());
        until_stopped(
            &kill_switch,
            provisioner.create_or_update(config.microsoft.retention_days),
        )
        .await
        .context("could not create or update the table")?;
    }
    let pipeline = Pipeline::new(
        fetcher(config)?,
        shipper(config, client)?,
        config.onepassword.lookback,
    )
    .with_kill_switch(kill_switch);
    Ok(pipeline.run().await?)
}

/// Runs `work` unless the kill switch is tripped first
async fn until_stopped<T, F>(kill_switch: &KillSwitch, work: F) -> one2sen_common::Result<T>
where
    F: Future<Output = one2sen_common::Result<T>>,
{
    tokio::select! {
        biased;
        () = kill_switch.stopped() => Err(Error::Cancelled),
        res = work => res,
    }
}

async fn handle_signals(signals: Signals, kill_switch: KillSwitch) {
    let mut signals = signals.fuse();

    while let Some(signal) = signals.next().await {
        info!(
            "Received SIGNAL: {}",
            signal_name(signal).unwrap_or(&signal.to_string())
        );
        match signal {
            // a second interrupt doesn't wait for the run to unwind
            SIGINT | SIGTERM if !kill_switch.is_stopped() => kill_switch.stop(),
            signal => {
                if let Err(e) = signal_hook::low_level::emulate_default_handler(signal) {
                    error!("Error handling signal {}: {}", signal, e);
                }
            }
        }
    }
}

fn credentials(ms: &Microsoft, client: Client, scope: &str) -> ClientCredentials {
    ClientCredentials::new(
        client,
        &ms.authority,
        &ms.tenant_id,
        &ms.app_id,
        ms.secret_key.expose(),
        scope,
    )
}

fn provisioner(ms: &Microsoft, client: Client) -> TableProvisioner {
    let tokens = Arc::new(credentials(ms, client.clone(), MANAGEMENT_SCOPE));
    TableProvisioner::new(
        client,
        tokens,
        TableLocation {
            management_url: ms.management_url.clone(),
            subscription_id: ms.subscription_id.clone(),
            resource_group: ms.resource_group.clone(),
            workspace_name: ms.workspace_name.clone(),
            table_name: ms.table_name.clone(),
        },
    )
}

fn fetcher(config: &Config) -> anyhow::Result<Fetcher> {
    let op = &config.onepassword;
    let client = EventsClient::new(&op.url, op.api_token.expose(), http::client(op.timeout)?)?;
    Ok(Fetcher::new(Arc::new(client), op.page_limit, op.max_rounds))
}

fn delivery(config: &Config, client: Client) -> anyhow::Result<Box<dyn Delivery>> {
    let ms = &config.microsoft;
    Ok(match config.delivery_mode() {
        DeliveryMode::SharedKey => Box::new(SharedKeyWriter::new(
            client,
            &ms.workspace_id,
            ms.workspace_key.expose(),
            &ms.ingestion_host,
            &ms.table_name,
        )?),
        DeliveryMode::Dcr => {
            let tokens = Arc::new(credentials(ms, client.clone(), MONITOR_SCOPE));
            Box::new(IngestWriter::new(
                client,
                tokens,
                &ms.dcr.endpoint,
                &ms.dcr.rule_id,
                &ms.dcr.stream_name,
            ))
        }
    })
}

fn shipper(config: &Config, client: Client) -> anyhow::Result<Shipper> {
    let batch_size =
        NonZeroUsize::new(config.delivery.batch_size).context("batch_size must be at least 1")?;
    let backoff = ExponentialBackoff::new(config.delivery.retries, config.delivery.backoff);
    Ok(Shipper::new(delivery(config, client)?, batch_size, backoff))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const SHARED_KEY: &str = r"
onepassword:
  api_token: op-token
microsoft:
  workspace_id: ws-id
  workspace_key: c25vdGJhZGdlcg==
delivery:
  batch_size: 5
";

    const DCR: &str = r"
onepassword:
  api_token: op-token
microsoft:
  tenant_id: tenant
  app_id: app
  secret_key: secret
  dcr:
    endpoint: https://dce.northeurope-1.ingest.monitor.azure.com
    rule_id: dcr-1
    stream_name: Custom-OnePassword
";

    fn config(raw: &str) -> anyhow::Result<Config> {
        let mut config = Config::from_yaml(raw)?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    fn client() -> anyhow::Result<Client> {
        Ok(http::client(Duration::from_secs(1))?)
    }

    #[test]
    fn shared_key_delivery() -> anyhow::Result<()> {
        let config = config(SHARED_KEY)?;
        assert_eq!(config.delivery_mode(), DeliveryMode::SharedKey);
        assert_eq!(delivery(&config, client()?)?.name(), "shared key");
        assert!(shipper(&config, client()?).is_ok());
        Ok(())
    }

    #[test]
    fn dcr_delivery() -> anyhow::Result<()> {
        let config = config(DCR)?;
        assert_eq!(config.delivery_mode(), DeliveryMode::Dcr);
        assert_eq!(delivery(&config, client()?)?.name(), "logs ingestion");
        Ok(())
    }

    #[test]
    fn unchecked_batch_size() -> anyhow::Result<()> {
        let mut config = config(SHARED_KEY)?;
        config.delivery.batch_size = 0;
        assert!(shipper(&config, client()?).is_err());
        Ok(())
    }

    #[tokio::test]
    async fn stop_interrupts_pending_work() {
        let kill_switch = KillSwitch::new();
        let stopper = kill_switch.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            stopper.stop();
        });
        let res = tokio::time::timeout(
            Duration::from_secs(5),
            until_stopped(
                &kill_switch,
                std::future::pending::<one2sen_common::Result<()>>(),
            ),
        )
        .await;
        assert!(matches!(res, Ok(Err(Error::Cancelled))));
    }

    #[tokio::test]
    async fn provisioning_is_cancellable() -> anyhow::Result<()> {
        let mut config = config(DCR)?;
        // nothing listens here, a started request would fail with a transport error
        config.microsoft.management_url = "http://127.0.0.1:9".to_string();
        config.microsoft.authority = "http://127.0.0.1:9".to_string();
        let kill_switch = KillSwitch::new();
        kill_switch.stop();
        let provisioner = provisioner(&config.microsoft, client()?);
        let res = until_stopped(&kill_switch, provisioner.create_or_update(30)).await;
        assert!(matches!(res, Err(Error::Cancelled)));
        Ok(())
    }

    #[tokio::test]
    async fn finished_work_passes_through() -> anyhow::Result<()> {
        let kill_switch = KillSwitch::new();
        assert_eq!(until_stopped(&kill_switch, async { Ok(42) }).await?, 42);
        Ok(())
    }

    #[test]
    fn builds_fetcher() -> anyhow::Result<()> {
        let mut config = config(SHARED_KEY)?;
        assert!(fetcher(&config).is_ok());
        config.onepassword.api_token = "".into();
        assert!(fetcher(&config).is_err());
        Ok(())
    }
}
