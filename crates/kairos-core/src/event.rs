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

//! Lifecycle-event kinds flowing through the ticker runtime.

use serde::{Deserialize, Serialize};

/// The closed set of lifecycle transitions the manager reacts to.
///
/// These values are both the manager's internal view of a relayed event and
/// the members of the auto start/stop trigger sets in
/// [`TickerConfig`](crate::TickerConfig): when a relayed event's kind is in
/// `auto_start_triggers` the shared clock is started, when it is in
/// `auto_stop_triggers` the clock is stopped, before any module hears about
/// the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TickerTrigger {
    /// Pseudo-event applied exactly once, immediately after manager
    /// construction.
    Init,
    /// A session started.
    SessionStarted,
    /// The running session ended.
    SessionEnded,
    /// The host entered the paused state.
    Paused,
    /// The host left the paused state.
    Unpaused,
}

/// Tag describing which kind of session started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SessionKind {
    /// A regular game session.
    #[default]
    Game,
    /// An editor session.
    Editor,
    /// An in-editor preview session.
    Preview,
}

/// Payload broadcast by [`SessionSource`](crate::SessionSource).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A session of the tagged kind started.
    Started(SessionKind),
    /// The running session is ending.
    Ended,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn triggers_work_as_set_members() {
        let set = HashSet::from([TickerTrigger::Init, TickerTrigger::SessionStarted]);
        assert!(set.contains(&TickerTrigger::Init));
        assert!(!set.contains(&TickerTrigger::SessionEnded));
    }

    #[test]
    fn triggers_round_trip_through_serde() {
        let trigger = TickerTrigger::SessionEnded;
        let json = serde_json::to_string(&trigger).expect("serialize trigger");
        let back: TickerTrigger = serde_json::from_str(&json).expect("deserialize trigger");
        assert_eq!(trigger, back);
    }
}
