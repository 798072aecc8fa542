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

//! The module contract.
//!
//! A [`TickerModule`] is a unit of periodic work owned by a
//! [`TickerManager`](crate::manager::TickerManager). Modules never talk to the
//! manager directly; every callback hands them a [`TickerContext`] through
//! which they can queue start/stop requests, applied by the manager after the
//! callback round completes. That indirection is what keeps a module free to
//! ask for the clock to stop from inside its own tick.

use std::any::TypeId;
use std::time::Duration;

/// Per-module bookkeeping owned by the manager, readable by the module.
#[derive(Debug, Default, Clone)]
pub struct ModuleState {
    paused: bool,
    tick_while_paused: bool,
}

impl ModuleState {
    /// Whether the manager currently considers the host paused.
    ///
    /// Mirrors the manager's pause flag; updated just before
    /// [`TickerModule::on_paused`] / [`TickerModule::on_unpaused`] runs.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether this module keeps receiving ticks while the host is paused.
    #[must_use]
    pub fn ticks_while_paused(&self) -> bool {
        self.tick_while_paused
    }

    /// Opts this module in or out of ticking while paused.
    ///
    /// Defaults to `false`: a paused host suspends the module's ticks.
    pub fn set_tick_while_paused(&mut self, tick_while_paused: bool) {
        self.tick_while_paused = tick_while_paused;
    }

    pub(crate) fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }
}

/// A deferred start/stop request queued through a [`TickerContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickerRequest {
    Start,
    Stop {
        requester: TypeId,
        requester_name: &'static str,
    },
}

/// The manager-provided context handed to every module callback.
///
/// Requests queued here are applied by the manager once the current callback
/// round has finished, so a stop requested mid-tick never cuts off the other
/// modules in the same round.
pub struct TickerContext<'a> {
    pub(crate) requests: &'a mut Vec<TickerRequest>,
    pub(crate) paused: bool,
    pub(crate) module: TypeId,
    pub(crate) module_name: &'static str,
}

impl TickerContext<'_> {
    /// Whether the manager currently considers the host paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Queues a request to start the shared clock.
    pub fn request_start(&mut self) {
        self.requests.push(TickerRequest::Start);
    }

    /// Queues a request to stop the shared clock.
    ///
    /// The request is refused later if another module still needs updates;
    /// the calling module's own demand is not counted against it.
    pub fn request_stop(&mut self) {
        self.requests.push(TickerRequest::Stop {
            requester: self.module,
            requester_name: self.module_name,
        });
    }
}

/// A unit of periodic work managed by a
/// [`TickerManager`](crate::manager::TickerManager).
///
/// Only the demand query and the state accessors are required; ticking and the
/// lifecycle hooks default to no-ops, so a passive module implements almost
/// nothing. [`TickerModule::needs_update`] is the load-bearing method: the
/// manager keeps the shared clock alive exactly as long as some module answers
/// `true`.
///
/// # Examples
///
/// A module that ticks a countdown and lets the clock wind down with it:
///
/// ```
/// use kairos_core::{ModuleState, TickerContext, TickerModule};
/// use std::any::Any;
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Blinker {
///     state: ModuleState,
///     remaining: u32,
/// }
///
/// impl TickerModule for Blinker {
///     fn tick(&mut self, _delta_time: Duration, ctx: &mut TickerContext<'_>) {
///         self.remaining = self.remaining.saturating_sub(1);
///         self.request_stop_if_idle(ctx);
///     }
///
///     fn needs_update(&self) -> bool {
///         self.remaining > 0
///     }
///
///     fn state(&self) -> &ModuleState {
///         &self.state
///     }
///
///     fn state_mut(&mut self) -> &mut ModuleState {
///         &mut self.state
///     }
///
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
///
///     fn as_any_mut(&mut self) -> &mut dyn Any {
///         self
///     }
/// }
/// ```
pub trait TickerModule: Send + 'static {
    /// Called on every shared-clock tick this module participates in.
    ///
    /// `delta_time` is the time elapsed since the clock last fired, which can
    /// exceed the configured tick interval. Not called while the host is
    /// paused unless [`ModuleState::ticks_while_paused`] is set.
    fn tick(&mut self, _delta_time: Duration, _ctx: &mut TickerContext<'_>) {}

    /// Called once when a session starts.
    fn on_session_started(&mut self, _ctx: &mut TickerContext<'_>) {}

    /// Called once when the session ends.
    fn on_session_ended(&mut self, _ctx: &mut TickerContext<'_>) {}

    /// Called once when the host pauses; the module's [`ModuleState`] already
    /// reflects the new flag.
    fn on_paused(&mut self, _ctx: &mut TickerContext<'_>) {}

    /// Called once when the host resumes; the module's [`ModuleState`] already
    /// reflects the new flag.
    fn on_unpaused(&mut self, _ctx: &mut TickerContext<'_>) {}

    /// Whether this module currently has work that needs the shared clock.
    fn needs_update(&self) -> bool;

    /// The manager-owned bookkeeping for this module.
    fn state(&self) -> &ModuleState;

    /// Mutable access to the manager-owned bookkeeping.
    fn state_mut(&mut self) -> &mut ModuleState;

    /// Upcasts to [`Any`](std::any::Any) for typed retrieval.
    fn as_any(&self) -> &dyn std::any::Any;

    /// Mutable upcast to [`Any`](std::any::Any) for typed retrieval.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;

    /// Queues a stop request only when this module has no pending work.
    ///
    /// Convenience for the common tail pattern: tick the work down, then call
    /// this to let the clock wind down once the work is gone.
    fn request_stop_if_idle(&self, ctx: &mut TickerContext<'_>) {
        if !self.needs_update() {
            ctx.request_stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;

    struct Idler {
        state: ModuleState,
        busy: bool,
    }

    impl Idler {
        fn new(busy: bool) -> Self {
            Self {
                state: ModuleState::default(),
                busy,
            }
        }
    }

    impl TickerModule for Idler {
        fn needs_update(&self) -> bool {
            self.busy
        }

        fn state(&self) -> &ModuleState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut ModuleState {
            &mut self.state
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn context_for<M: TickerModule>(requests: &mut Vec<TickerRequest>) -> TickerContext<'_> {
        TickerContext {
            requests,
            paused: false,
            module: TypeId::of::<M>(),
            module_name: std::any::type_name::<M>(),
        }
    }

    #[test]
    fn state_defaults_to_unpaused_and_suspended_while_paused() {
        let mut state = ModuleState::default();
        assert!(!state.is_paused());
        assert!(!state.ticks_while_paused());

        state.set_tick_while_paused(true);
        state.set_paused(true);
        assert!(state.is_paused());
        assert!(state.ticks_while_paused());
    }

    #[test]
    fn context_queues_requests_tagged_with_the_calling_module() {
        let mut requests = Vec::new();
        let mut ctx = context_for::<Idler>(&mut requests);
        ctx.request_start();
        ctx.request_stop();

        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0], TickerRequest::Start);
        assert_eq!(
            requests[1],
            TickerRequest::Stop {
                requester: TypeId::of::<Idler>(),
                requester_name: std::any::type_name::<Idler>(),
            }
        );
    }

    #[test]
    fn request_stop_if_idle_respects_remaining_demand() {
        let mut requests = Vec::new();

        let busy = Idler::new(true);
        busy.request_stop_if_idle(&mut context_for::<Idler>(&mut requests));
        assert!(requests.is_empty(), "a busy module must not queue a stop");

        let idle = Idler::new(false);
        idle.request_stop_if_idle(&mut context_for::<Idler>(&mut requests));
        assert_eq!(requests.len(), 1);
        assert!(matches!(requests[0], TickerRequest::Stop { .. }));
    }
}
