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

#![recursion_limit = "1024"]
#![deny(
    clippy::all,
    clippy::unwrap_used,
    clippy::unnecessary_unwrap,
    clippy::pedantic,
    clippy::mod_module_files
)]
#![allow(clippy::must_use_candidate)]

#[macro_use]
extern crate log;

use crate::cli::Cli;
use clap::Parser;
use std::process::ExitCode;

mod cli;
mod logging;
mod run;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    run::run(&cli).await
}
