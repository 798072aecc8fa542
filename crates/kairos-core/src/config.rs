// Copyright 2025 eraflo
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

//! Configuration for the ticker manager.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::event::TickerTrigger;

/// Tunables for a [`TickerManager`](crate::TickerManager).
///
/// All fields may be set before construction (plain struct) or after it
/// through the manager's setters. The struct serializes, so hosts can keep
/// these settings in their configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerConfig {
    /// Whether the leak-detection cleanup sweep runs.
    pub cleanup_enabled: bool,
    /// Time between cleanup sweeps while the shared clock is running.
    pub cleanup_interval: Duration,
    /// Reserved cadence for extensions that keep working while paused; the
    /// core algorithms do not consume it.
    pub pause_update_interval: Duration,
    /// Minimum period requested from the shared clock for the manager's own
    /// subscription.
    pub tick_interval: Duration,
    /// Lifecycle events that start the shared clock.
    pub auto_start_triggers: HashSet<TickerTrigger>,
    /// Lifecycle events that stop the shared clock.
    pub auto_stop_triggers: HashSet<TickerTrigger>,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            cleanup_enabled: true,
            cleanup_interval: Duration::from_secs(30),
            pause_update_interval: Duration::from_millis(100),
            tick_interval: Duration::from_millis(1),
            auto_start_triggers: HashSet::new(),
            auto_stop_triggers: HashSet::new(),
        }
    }
}
