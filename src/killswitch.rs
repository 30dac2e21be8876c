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

use log::info;
use std::sync::Arc;
use tokio::sync::watch;

/// Stops a running pipeline. Clones share the same switch.
#[derive(Debug, Clone)]
pub struct KillSwitch(Arc<watch::Sender<bool>>);

impl Default for KillSwitch {
    fn default() -> Self {
        Self::new()
    }
}

impl KillSwitch {
    /// Creates a new kill switch that isn't tripped
    #[must_use]
    pub fn new() -> Self {
        KillSwitch(Arc::new(watch::channel(false).0))
    }

    /// Trips the switch, waking everyone waiting in [`KillSwitch::stopped`]
    pub fn stop(&self) {
        if !self.0.send_replace(true) {
            info!("stop requested");
        }
    }

    /// true once [`KillSwitch::stop`] was called
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once the switch is tripped
    pub async fn stopped(&self) {
        let mut rx = self.0.subscribe();
        // the sender lives as long as `self`, so this can't fail
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}
