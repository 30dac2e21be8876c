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

use log::LevelFilter;
use std::path::Path;

/// Installs `log4rs` from `logger_config` if given, `env_logger` otherwise.
/// `RUST_LOG` takes precedence over `level` for the latter.
pub(crate) fn init(logger_config: Option<&Path>, level: LevelFilter) -> anyhow::Result<()> {
    if let Some(logger_config) = logger_config {
        log4rs::init_file(logger_config, log4rs::config::Deserializers::default())?;
    } else {
        env_logger::Builder::new()
            .filter_level(level)
            .parse_default_env()
            .try_init()?;
    }
    Ok(())
}
