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

//! Synchronous multicast delivery.
//!
//! A [`Signal`] fans a borrowed value out to every live subscriber, in
//! subscription order, on the broadcasting thread. It is the delivery
//! primitive behind the session and pause sources.
//!
//! Subscriber callbacks run with no internal lock held, so a callback may
//! freely subscribe or unsubscribe (including unsubscribing itself) while a
//! broadcast is in flight. An unsubscription observed mid-broadcast is final;
//! a subscriber added mid-broadcast first hears the *next* broadcast.

use std::sync::{Arc, Mutex};

/// Identifies one subscription on a [`Signal`].
///
/// Handles are unique for the lifetime of the signal and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalHandle(u64);

type Subscriber<T> = Box<dyn FnMut(&T) + Send>;

struct Slot<T> {
    id: u64,
    /// Taken out for the duration of a delivery to this subscriber.
    callback: Option<Subscriber<T>>,
    /// Set by `unsubscribe` when the callback is currently taken out; the
    /// slot is dropped at the next maintenance point instead of immediately.
    removed: bool,
}

struct SignalState<T> {
    slots: Vec<Slot<T>>,
    next_id: u64,
}

/// A synchronous multicast channel.
///
/// Cloning is cheap and yields another handle onto the same subscriber set.
///
/// # Examples
///
/// ```
/// use kairos_core::Signal;
/// use std::sync::{Arc, Mutex};
///
/// let signal = Signal::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
/// let handle = signal.subscribe(move |value: &u32| sink.lock().unwrap().push(*value));
///
/// signal.broadcast(&7);
/// signal.unsubscribe(handle);
/// signal.broadcast(&8);
///
/// assert_eq!(*seen.lock().unwrap(), vec![7]);
/// ```
pub struct Signal<T> {
    state: Arc<Mutex<SignalState<T>>>,
}

impl<T> Signal<T> {
    /// Creates a signal with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SignalState {
                slots: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Registers `callback` and returns its subscription handle.
    pub fn subscribe(&self, callback: impl FnMut(&T) + Send + 'static) -> SignalHandle {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        state.slots.push(Slot {
            id,
            callback: Some(Box::new(callback)),
            removed: false,
        });
        SignalHandle(id)
    }

    /// Removes the subscription behind `handle`.
    ///
    /// Returns `false` when the handle is unknown or already removed. Safe to
    /// call from inside a subscriber callback.
    pub fn unsubscribe(&self, handle: SignalHandle) -> bool {
        let mut state = self.state.lock().unwrap();
        match state
            .slots
            .iter()
            .position(|slot| slot.id == handle.0 && !slot.removed)
        {
            Some(position) => {
                if state.slots[position].callback.is_some() {
                    state.slots.remove(position);
                } else {
                    // Mid-delivery to this subscriber; the broadcast loop
                    // drops it once the callback returns.
                    state.slots[position].removed = true;
                }
                true
            }
            None => false,
        }
    }

    /// Delivers `value` to every subscriber present when the broadcast began.
    pub fn broadcast(&self, value: &T) {
        let cutoff = self.state.lock().unwrap().next_id;
        let mut last_id: Option<u64> = None;
        loop {
            // Pull the next live callback out under the lock, run it with the
            // lock released, then put it back if the subscriber survived.
            let taken = {
                let mut state = self.state.lock().unwrap();
                let mut found: Option<(u64, Subscriber<T>)> = None;
                for slot in state.slots.iter_mut() {
                    if slot.id >= cutoff || slot.removed {
                        continue;
                    }
                    if let Some(last) = last_id {
                        if slot.id <= last {
                            continue;
                        }
                    }
                    if let Some(callback) = slot.callback.take() {
                        found = Some((slot.id, callback));
                        break;
                    }
                }
                found
            };
            let (id, mut callback) = match taken {
                Some(taken) => taken,
                None => break,
            };
            callback(value);
            last_id = Some(id);

            let mut state = self.state.lock().unwrap();
            if let Some(slot) = state.slots.iter_mut().find(|slot| slot.id == id) {
                if slot.removed {
                    log::trace!("[Signal] subscriber {id} unsubscribed during delivery");
                } else {
                    slot.callback = Some(callback);
                }
            }
        }

        let mut state = self.state.lock().unwrap();
        state.slots.retain(|slot| !slot.removed);
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .slots
            .iter()
            .filter(|slot| !slot.removed)
            .count()
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}
