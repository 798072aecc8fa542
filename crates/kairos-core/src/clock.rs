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

//! Shared periodic callback source.
//!
//! [`CoreTicker`] is the single clock every ticker manager hangs off. The
//! host pumps it once per frame (or per loop iteration) with the elapsed
//! wall-clock delta; each registered callback carries its own interval and
//! fires whenever its accumulated time crosses it, receiving the time that
//! actually went by. Intervals are therefore a *minimum* spacing, not an
//! exact period.
//!
//! A callback signals its own retirement by returning `false`; it can also be
//! removed externally through its [`TickHandle`]. Callbacks run with no
//! internal lock held, so a callback may register or remove callbacks on the
//! same clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

type TickCallback = Box<dyn FnMut(Duration) -> bool + Send>;

/// Identifies one callback registration on a [`CoreTicker`].
///
/// Handles are unique for the lifetime of the clock and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(u64);

struct TickEntry {
    id: u64,
    interval: Duration,
    accumulated: Duration,
    /// Taken out while the callback is being invoked.
    callback: Option<TickCallback>,
    /// Set when removal is requested while the callback is taken out.
    removed: bool,
}

struct ClockState {
    entries: Vec<TickEntry>,
    next_id: u64,
}

/// The shared clock behind one or more ticker managers.
///
/// Cloning is cheap and yields another handle onto the same callback set.
#[derive(Clone)]
pub struct CoreTicker {
    state: Arc<Mutex<ClockState>>,
}

impl CoreTicker {
    /// Creates a clock with no registered callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ClockState {
                entries: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Registers `callback` to fire roughly every `interval`.
    ///
    /// A zero interval fires on every pump. The callback stays registered
    /// until it returns `false` or [`CoreTicker::remove_ticker`] is called
    /// with the returned handle.
    pub fn add_ticker(
        &self,
        interval: Duration,
        callback: impl FnMut(Duration) -> bool + Send + 'static,
    ) -> TickHandle {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        state.entries.push(TickEntry {
            id,
            interval,
            accumulated: Duration::ZERO,
            callback: Some(Box::new(callback)),
            removed: false,
        });
        TickHandle(id)
    }

    /// Removes the callback behind `handle`.
    ///
    /// Returns `false` when the handle is unknown or already removed. Safe to
    /// call from inside a tick callback, including the one being removed; a
    /// removal observed mid-invocation overrides the callback's return value.
    pub fn remove_ticker(&self, handle: TickHandle) -> bool {
        let mut state = self.state.lock().unwrap();
        match state
            .entries
            .iter()
            .position(|entry| entry.id == handle.0 && !entry.removed)
        {
            Some(position) => {
                if state.entries[position].callback.is_some() {
                    state.entries.remove(position);
                } else {
                    state.entries[position].removed = true;
                }
                true
            }
            None => false,
        }
    }

    /// Advances every registered callback by `delta`, invoking the ones whose
    /// interval elapsed.
    ///
    /// Callbacks registered from inside a callback are not advanced until the
    /// next pump.
    pub fn tick(&self, delta: Duration) {
        // Accumulate and collect the due callbacks under one lock, then run
        // them with the lock released.
        let mut due: Vec<(u64, Duration, TickCallback)> = Vec::new();
        {
            let mut state = self.state.lock().unwrap();
            for entry in state.entries.iter_mut() {
                if entry.removed || entry.callback.is_none() {
                    continue;
                }
                entry.accumulated += delta;
                if entry.accumulated >= entry.interval {
                    let elapsed = entry.accumulated;
                    entry.accumulated = Duration::ZERO;
                    if let Some(callback) = entry.callback.take() {
                        due.push((entry.id, elapsed, callback));
                    }
                }
            }
        }

        for (id, elapsed, mut callback) in due {
            let keep = callback(elapsed);

            let mut state = self.state.lock().unwrap();
            if let Some(entry) = state.entries.iter_mut().find(|entry| entry.id == id) {
                if entry.removed || !keep {
                    entry.removed = true;
                } else {
                    entry.callback = Some(callback);
                }
            }
        }

        let mut state = self.state.lock().unwrap();
        state.entries.retain(|entry| !entry.removed);
    }

    /// Number of live callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .entries
            .iter()
            .filter(|entry| !entry.removed)
            .count()
    }

    /// Whether `handle` still refers to a live callback.
    #[must_use]
    pub fn is_registered(&self, handle: TickHandle) -> bool {
        self.state
            .lock()
            .unwrap()
            .entries
            .iter()
            .any(|entry| entry.id == handle.0 && !entry.removed)
    }
}

impl Default for CoreTicker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_callback(
        clock: &CoreTicker,
        interval: Duration,
        log: &Arc<Mutex<Vec<Duration>>>,
    ) -> TickHandle {
        let sink = Arc::clone(log);
        clock.add_ticker(interval, move |elapsed| {
            sink.lock().unwrap().push(elapsed);
            true
        })
    }

    #[test]
    fn fires_once_the_interval_accumulates() {
        let clock = CoreTicker::new();
        let fires = Arc::new(Mutex::new(Vec::new()));
        recording_callback(&clock, Duration::from_millis(100), &fires);

        clock.tick(Duration::from_millis(60));
        assert!(fires.lock().unwrap().is_empty(), "60ms < 100ms interval");

        clock.tick(Duration::from_millis(60));
        assert_eq!(
            *fires.lock().unwrap(),
            vec![Duration::from_millis(120)],
            "the callback must see the time that actually elapsed"
        );
    }

    #[test]
    fn zero_interval_fires_on_every_pump() {
        let clock = CoreTicker::new();
        let fires = Arc::new(Mutex::new(Vec::new()));
        recording_callback(&clock, Duration::ZERO, &fires);

        clock.tick(Duration::from_millis(5));
        clock.tick(Duration::from_millis(7));

        assert_eq!(
            *fires.lock().unwrap(),
            vec![Duration::from_millis(5), Duration::from_millis(7)]
        );
    }

    #[test]
    fn returning_false_retires_the_callback() {
        let clock = CoreTicker::new();
        let fired = Arc::new(Mutex::new(0u32));

        let count = Arc::clone(&fired);
        let handle = clock.add_ticker(Duration::ZERO, move |_| {
            *count.lock().unwrap() += 1;
            false
        });

        clock.tick(Duration::from_millis(1));
        clock.tick(Duration::from_millis(1));

        assert_eq!(*fired.lock().unwrap(), 1);
        assert_eq!(clock.callback_count(), 0);
        assert!(!clock.is_registered(handle));
    }

    #[test]
    fn external_removal_wins_over_the_return_value() {
        let clock = CoreTicker::new();

        let own_handle = Arc::new(Mutex::new(None));
        let handle_slot = Arc::clone(&own_handle);
        let inner_clock = clock.clone();
        let handle = clock.add_ticker(Duration::ZERO, move |_| {
            if let Some(handle) = *handle_slot.lock().unwrap() {
                assert!(inner_clock.remove_ticker(handle));
            }
            // Asking to stay registered must not resurrect the entry.
            true
        });
        *own_handle.lock().unwrap() = Some(handle);

        clock.tick(Duration::from_millis(1));

        assert_eq!(clock.callback_count(), 0);
        assert!(!clock.remove_ticker(handle), "already removed");
    }

    #[test]
    fn callbacks_added_mid_pump_wait_for_the_next_pump() {
        let clock = CoreTicker::new();
        let late_fires = Arc::new(Mutex::new(0u32));

        let inner_clock = clock.clone();
        let count = Arc::clone(&late_fires);
        clock.add_ticker(Duration::ZERO, move |_| {
            let count = Arc::clone(&count);
            inner_clock.add_ticker(Duration::ZERO, move |_| {
                *count.lock().unwrap() += 1;
                false
            });
            false
        });

        clock.tick(Duration::from_millis(1));
        assert_eq!(*late_fires.lock().unwrap(), 0);

        clock.tick(Duration::from_millis(1));
        assert_eq!(*late_fires.lock().unwrap(), 1);
    }

    #[test]
    fn independent_intervals_divide_one_pump_rate() {
        let clock = CoreTicker::new();
        let fast = Arc::new(Mutex::new(Vec::new()));
        let slow = Arc::new(Mutex::new(Vec::new()));
        recording_callback(&clock, Duration::from_millis(10), &fast);
        recording_callback(&clock, Duration::from_millis(25), &slow);

        for _ in 0..3 {
            clock.tick(Duration::from_millis(10));
        }

        assert_eq!(fast.lock().unwrap().len(), 3);
        assert_eq!(
            *slow.lock().unwrap(),
            vec![Duration::from_millis(30)],
            "the slow callback fires once, seeing all three pumps' time"
        );
    }
}
