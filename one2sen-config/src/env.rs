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

use crate::{duration, Config, DeliveryMode, Error, Result, Secret};
use std::{str::FromStr, time::Duration};

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    // empty variables count as unset
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn string(&self, key: &str, target: &mut String) {
        if let Some(v) = self.get(key) {
            *target = v;
        }
    }

    fn secret(&self, key: &str, target: &mut Secret) {
        if let Some(v) = self.get(key) {
            *target = Secret::from(v);
        }
    }

    fn parse<T: FromStr>(&self, key: &'static str, target: &mut T) -> Result<()> {
        if let Some(value) = self.get(key) {
            *target = value.trim().parse().map_err(|_| Error::Env { key, value })?;
        }
        Ok(())
    }

    fn duration(&self, key: &'static str, target: &mut Duration) -> Result<()> {
        if let Some(value) = self.get(key) {
            *target = duration::parse(&value).map_err(|_| Error::Env { key, value })?;
        }
        Ok(())
    }

    fn flag(&self, key: &'static str, target: &mut bool) -> Result<()> {
        if let Some(value) = self.get(key) {
            *target = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(Error::Env { key, value }),
            };
        }
        Ok(())
    }

    fn mode(&self, key: &'static str, target: &mut Option<DeliveryMode>) -> Result<()> {
        if let Some(value) = self.get(key) {
            *target = Some(value.parse().map_err(|()| Error::Env { key, value })?);
        }
        Ok(())
    }
}

pub(crate) fn overlay<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let env = Env { lookup };

    env.string("LOG_LEVEL", &mut config.log.level);

    let op = &mut config.onepassword;
    env.secret("ONE_API_TOKEN", &mut op.api_token);
    env.duration("ONE_LOOKBACK", &mut op.lookback)?;
    env.string("ONE_URL", &mut op.url);
    env.parse("ONE_PAGE_LIMIT", &mut op.page_limit)?;
    env.parse("ONE_MAX_ROUNDS", &mut op.max_rounds)?;
    env.duration("ONE_TIMEOUT", &mut op.timeout)?;

    let ms = &mut config.microsoft;
    env.string("MS_APP_ID", &mut ms.app_id);
    env.secret("MS_SECRET_KEY", &mut ms.secret_key);
    env.string("MS_TENANT_ID", &mut ms.tenant_id);
    env.string("MS_SUB_ID", &mut ms.subscription_id);
    env.string("MS_RSG_ID", &mut ms.resource_group);
    env.string("MS_WS_NAME", &mut ms.workspace_name);
    env.string("MS_WS_ID", &mut ms.workspace_id);
    env.secret("MS_WS_KEY", &mut ms.workspace_key);
    env.string("MS_INGESTION_HOST", &mut ms.ingestion_host);
    env.string("MS_TABLE_NAME", &mut ms.table_name);
    env.string("MS_DCR_ENDPOINT", &mut ms.dcr.endpoint);
    env.string("MS_DCR_RULE", &mut ms.dcr.rule_id);
    env.string("MS_DCR_STREAM", &mut ms.dcr.stream_name);
    env.parse("MS_RETENTION_DAYS", &mut ms.retention_days)?;
    env.flag("MS_UPDATE_TABLE", &mut ms.update_table)?;
    env.string("MS_AUTHORITY", &mut ms.authority);
    env.string("MS_MANAGEMENT_URL", &mut ms.management_url);

    let d = &mut config.delivery;
    env.mode("DELIVERY_MODE", &mut d.mode)?;
    env.parse("DELIVERY_BATCH_SIZE", &mut d.batch_size)?;
    env.parse("DELIVERY_RETRIES", &mut d.retries)?;
    env.duration("DELIVERY_BACKOFF", &mut d.backoff)?;
    env.duration("DELIVERY_TIMEOUT", &mut d.timeout)?;

    Ok(())
}
