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

//! Pause state announcements.
//!
//! A [`PauseSource`] holds the host's pause flag and broadcasts it on every
//! *edge*: subscribers hear `true` once when the host pauses and `false` once
//! when it resumes, never repeats of the current level.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::signal::{Signal, SignalHandle};

/// Broadcasts pause and resume edges to its subscribers.
///
/// Cloning is cheap and yields another handle onto the same pause state.
#[derive(Clone)]
pub struct PauseSource {
    signal: Signal<bool>,
    paused: Arc<AtomicBool>,
}

impl PauseSource {
    /// Creates an unpaused source with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            signal: Signal::new(),
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sets the pause flag, broadcasting only when it actually changes.
    ///
    /// Returns `false` when `paused` matches the current state.
    pub fn set_paused(&self, paused: bool) -> bool {
        if self.paused.swap(paused, Ordering::SeqCst) == paused {
            return false;
        }
        log::debug!("[PauseSource] paused: {paused}");
        self.signal.broadcast(&paused);
        true
    }

    /// Whether the host is currently paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Registers `callback` for pause edges.
    pub fn subscribe(&self, callback: impl FnMut(&bool) + Send + 'static) -> SignalHandle {
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

impl Default for PauseSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn broadcasts_only_on_edges() {
        let source = PauseSource::new();
        let edges = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&edges);
        source.subscribe(move |paused| sink.lock().unwrap().push(*paused));

        assert!(!source.set_paused(false), "already unpaused");
        assert!(source.set_paused(true));
        assert!(source.is_paused());
        assert!(!source.set_paused(true), "already paused");
        assert!(source.set_paused(false));

        assert_eq!(*edges.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn unsubscribed_listeners_miss_later_edges() {
        let source = PauseSource::new();
        let edges = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&edges);
        let handle = source.subscribe(move |paused| sink.lock().unwrap().push(*paused));

        source.set_paused(true);
        assert!(source.unsubscribe(handle));
        source.set_paused(false);

        assert_eq!(*edges.lock().unwrap(), vec![true]);
        assert_eq!(source.subscriber_count(), 0);
    }
}
