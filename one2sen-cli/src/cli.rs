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

use clap::Parser;
use std::path::PathBuf;

/// Ships 1Password events to Microsoft Sentinel
#[derive(Parser, Debug)]
#[clap(name = "one2sen", author, version, about)]
pub(crate) struct Cli {
    /// Configuration file, `config.yml` is used if it exists
    #[clap(short, long, value_parser = clap::value_parser!(PathBuf))]
    pub(crate) config: Option<PathBuf>,
    /// Configuration for Log4RS
    #[clap(short, long, value_parser = clap::value_parser!(PathBuf))]
    pub(crate) logger_config: Option<PathBuf>,
}
