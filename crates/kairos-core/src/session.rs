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

//! Session lifecycle announcements.
//!
//! A [`SessionSource`] is the host-facing switch for "a session began" and
//! "the session ended". It enforces at-most-once semantics per transition:
//! announcing a start while a session is already active (or an end while none
//! is) is ignored with a warning, so downstream subscribers only ever see
//! clean start/end pairs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::event::{SessionEvent, SessionKind};
use crate::signal::{Signal, SignalHandle};

/// Broadcasts session start and end transitions to its subscribers.
///
/// Cloning is cheap and yields another handle onto the same session state.
#[derive(Clone)]
pub struct SessionSource {
    signal: Signal<SessionEvent>,
    active: Arc<AtomicBool>,
}

impl SessionSource {
    /// Creates a source with no active session and no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            signal: Signal::new(),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Announces that a session of `kind` has started.
    ///
    /// Returns `false` without notifying anyone when a session is already
    /// active.
    pub fn announce_started(&self, kind: SessionKind) -> bool {
        if self.active.swap(true, Ordering::SeqCst) {
            log::warn!("[SessionSource] session already active; ignoring start announcement");
            return false;
        }
        log::info!("[SessionSource] session started: {kind:?}");
        self.signal.broadcast(&SessionEvent::Started(kind));
        true
    }

    /// Announces that the active session has ended.
    ///
    /// Returns `false` without notifying anyone when no session is active.
    pub fn announce_ended(&self) -> bool {
        if !self.active.swap(false, Ordering::SeqCst) {
            log::warn!("[SessionSource] no active session; ignoring end announcement");
            return false;
        }
        log::info!("[SessionSource] session ended");
        self.signal.broadcast(&SessionEvent::Ended);
        true
    }

    /// Whether a session is currently active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Registers `callback` for session transitions.
    pub fn subscribe(&self, callback: impl FnMut(&SessionEvent) + Send + 'static) -> SignalHandle {
        self.signal.subscribe(callback)
    }

    /// Removes the subscription behind `handle`.
    pub fn unsubscribe(&self, handle: SignalHandle) -> bool {
        self.signal.unsubscribe(handle)
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.signal.subscriber_count()
    }
}

impl Default for SessionSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn start_and_end_are_delivered_once_each() {
        let source = SessionSource::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        source.subscribe(move |event| sink.lock().unwrap().push(*event));

        assert!(source.announce_started(SessionKind::Editor));
        assert!(source.is_active());
        assert!(
            !source.announce_started(SessionKind::Game),
            "a second start must be swallowed"
        );
        assert!(source.announce_ended());
        assert!(!source.announce_ended(), "a second end must be swallowed");

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                SessionEvent::Started(SessionKind::Editor),
                SessionEvent::Ended
            ]
        );
    }

    #[test]
    fn a_new_session_can_follow_a_finished_one() {
        let source = SessionSource::new();

        assert!(source.announce_started(SessionKind::Game));
        assert!(source.announce_ended());
        assert!(source.announce_started(SessionKind::Preview));
        assert!(source.is_active());
    }

    #[test]
    fn unsubscribed_listeners_miss_later_transitions() {
        let source = SessionSource::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let handle = source.subscribe(move |event| sink.lock().unwrap().push(*event));

        source.announce_started(SessionKind::Game);
        assert!(source.unsubscribe(handle));
        source.announce_ended();

        assert_eq!(
            *events.lock().unwrap(),
            vec![SessionEvent::Started(SessionKind::Game)]
        );
        assert_eq!(source.subscriber_count(), 0);
    }
}
