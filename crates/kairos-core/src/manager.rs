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

//! Module registry and shared-clock control.
//!
//! The [`TickerManager`] owns a set of [`TickerModule`]s and drives them from
//! a single [`CoreTicker`] callback that exists only while some module needs
//! it. Start and stop are demand-driven: anyone may ask, but a stop is
//! refused while another module still reports pending work, and a periodic
//! cleanup sweep retires a clock that is running with no demand at all.
//!
//! A manager is always shared as a [`SharedTickerManager`]; the constructor
//! wires it to the session and pause sources through weak references, so
//! dropping the last strong handle tears everything down.
//!
//! The inner mutex is not reentrant: never announce into the session or pause
//! sources, and never pump the clock, while holding the manager lock.

use std::any::{type_name, TypeId};
use std::collections::HashSet;
use std::error::Error;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use crate::clock::{CoreTicker, TickHandle};
use crate::config::TickerConfig;
use crate::error::{TickerError, TickerResult};
use crate::event::{SessionEvent, SessionKind, TickerTrigger};
use crate::module::{TickerContext, TickerModule, TickerRequest};
use crate::pause::PauseSource;
use crate::session::SessionSource;
use crate::signal::SignalHandle;

/// A [`TickerManager`] behind its sharing boundary.
pub type SharedTickerManager = Arc<Mutex<TickerManager>>;

struct ModuleSlot {
    key: TypeId,
    name: &'static str,
    module: Box<dyn TickerModule>,
}

/// Owns registered modules and the demand-driven shared-clock subscription.
pub struct TickerManager {
    /// Insertion order is fan-out order.
    modules: Vec<ModuleSlot>,
    config: TickerConfig,
    cleanup_accumulator: Duration,
    /// Mirror of the pause source, refreshed on every pause edge.
    paused: bool,
    tick_handle: Option<TickHandle>,
    /// Start/stop requests queued by modules during the current callback
    /// round, applied once the round completes.
    pending: Vec<TickerRequest>,
    self_handle: Weak<Mutex<TickerManager>>,
    clock: CoreTicker,
    session: SessionSource,
    pause: PauseSource,
    session_subscription: Option<SignalHandle>,
    pause_subscription: Option<SignalHandle>,
}

impl TickerManager {
    /// Creates a manager wired to the given clock and event sources.
    ///
    /// The manager subscribes itself to both sources and, when
    /// [`TickerTrigger::Init`] is among the configured auto-start triggers,
    /// starts the shared clock before returning. The initial pause mirror is
    /// seeded from `pause`.
    pub fn new(
        config: TickerConfig,
        clock: &CoreTicker,
        session: &SessionSource,
        pause: &PauseSource,
    ) -> SharedTickerManager {
        let manager = Arc::new_cyclic(|weak: &Weak<Mutex<TickerManager>>| {
            Mutex::new(Self {
                modules: Vec::new(),
                config,
                cleanup_accumulator: Duration::ZERO,
                paused: pause.is_paused(),
                tick_handle: None,
                pending: Vec::new(),
                self_handle: weak.clone(),
                clock: clock.clone(),
                session: session.clone(),
                pause: pause.clone(),
                session_subscription: None,
                pause_subscription: None,
            })
        });

        {
            let mut locked = manager.lock().unwrap();

            let weak = Arc::downgrade(&manager);
            locked.session_subscription = Some(session.subscribe(move |event| {
                if let Some(manager) = weak.upgrade() {
                    let mut manager = manager.lock().unwrap();
                    match *event {
                        SessionEvent::Started(kind) => manager.on_session_started(kind),
                        SessionEvent::Ended => manager.on_session_ended(),
                    }
                }
            }));

            let weak = Arc::downgrade(&manager);
            locked.pause_subscription = Some(pause.subscribe(move |paused| {
                if let Some(manager) = weak.upgrade() {
                    manager.lock().unwrap().on_pause_changed(*paused);
                }
            }));

            locked.apply_trigger(TickerTrigger::Init);
        }

        manager
    }

    /// Registers a [`Default`]-constructible module and returns it.
    ///
    /// Fails with [`TickerError::AlreadyRegistered`] when a module of the
    /// same type is already present.
    pub fn add_module<M>(&mut self) -> TickerResult<&mut M>
    where
        M: TickerModule + Default,
    {
        self.add_module_with(|| Ok(M::default()))
    }

    /// Registers the module produced by `build` and returns it.
    ///
    /// The registry is left untouched when the factory fails; the error is
    /// reported as [`TickerError::ConstructionFailed`] with the factory's
    /// error as its source.
    pub fn add_module_with<M, F>(&mut self, build: F) -> TickerResult<&mut M>
    where
        M: TickerModule,
        F: FnOnce() -> Result<M, Box<dyn Error + Send + Sync>>,
    {
        let key = TypeId::of::<M>();
        let name = type_name::<M>();
        if self.modules.iter().any(|slot| slot.key == key) {
            let err = TickerError::AlreadyRegistered { module: name };
            log::warn!("[TickerManager] {err}");
            return Err(err);
        }
        let module = match build() {
            Ok(module) => module,
            Err(source) => {
                let err = TickerError::ConstructionFailed {
                    module: name,
                    source,
                };
                log::error!("[TickerManager] {err}");
                return Err(err);
            }
        };
        self.modules.push(ModuleSlot {
            key,
            name,
            module: Box::new(module),
        });
        log::debug!("[TickerManager] registered module '{name}'");
        let module = self
            .modules
            .last_mut()
            .and_then(|slot| slot.module.as_any_mut().downcast_mut::<M>())
            .expect("freshly registered module has type M");
        Ok(module)
    }

    /// Looks up a registered module by type.
    ///
    /// A miss is logged as a warning and answered with `None`.
    #[must_use]
    pub fn module<M: TickerModule>(&self) -> Option<&M> {
        match self
            .modules
            .iter()
            .find(|slot| slot.key == TypeId::of::<M>())
        {
            Some(slot) => slot.module.as_any().downcast_ref::<M>(),
            None => {
                let err = TickerError::NotFound {
                    module: type_name::<M>(),
                };
                log::warn!("[TickerManager] {err}");
                None
            }
        }
    }

    /// Looks up a registered module by type, mutably.
    #[must_use]
    pub fn module_mut<M: TickerModule>(&mut self) -> Option<&mut M> {
        match self
            .modules
            .iter_mut()
            .find(|slot| slot.key == TypeId::of::<M>())
        {
            Some(slot) => slot.module.as_any_mut().downcast_mut::<M>(),
            None => {
                let err = TickerError::NotFound {
                    module: type_name::<M>(),
                };
                log::warn!("[TickerManager] {err}");
                None
            }
        }
    }

    /// Looks up a registered module by [`TypeId`], type-erased.
    #[must_use]
    pub fn module_dyn(&self, key: TypeId) -> Option<&dyn TickerModule> {
        match self.modules.iter().find(|slot| slot.key == key) {
            Some(slot) => Some(slot.module.as_ref()),
            None => {
                log::warn!("[TickerManager] no module registered for {key:?}");
                None
            }
        }
    }

    /// Looks up a registered module by [`TypeId`], type-erased and mutable.
    #[must_use]
    pub fn module_dyn_mut(&mut self, key: TypeId) -> Option<&mut dyn TickerModule> {
        match self.modules.iter_mut().find(|slot| slot.key == key) {
            Some(slot) => Some(slot.module.as_mut()),
            None => {
                log::warn!("[TickerManager] no module registered for {key:?}");
                None
            }
        }
    }

    /// Whether a module of type `M` is registered.
    #[must_use]
    pub fn contains<M: TickerModule>(&self) -> bool {
        let key = TypeId::of::<M>();
        self.modules.iter().any(|slot| slot.key == key)
    }

    /// Number of registered modules.
    #[must_use]
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Whether no modules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Starts the shared clock.
    ///
    /// Fails with [`TickerError::AlreadyRunning`] when it is already
    /// running. Starting with no module demanding updates is allowed; the
    /// cleanup sweep will eventually retire the idle clock.
    pub fn try_start(&mut self) -> TickerResult<()> {
        if self.tick_handle.is_some() {
            let err = TickerError::AlreadyRunning;
            log::warn!("[TickerManager] {err}");
            return Err(err);
        }
        self.cleanup_accumulator = Duration::ZERO;
        let weak = self.self_handle.clone();
        let handle = self
            .clock
            .add_ticker(self.config.tick_interval, move |delta| {
                match weak.upgrade() {
                    Some(manager) => manager.lock().unwrap().on_tick(delta),
                    None => false,
                }
            });
        self.tick_handle = Some(handle);
        log::debug!("[TickerManager] shared clock started");
        Ok(())
    }

    /// Stops the shared clock on behalf of the module identified by
    /// `requester`.
    ///
    /// Refused with [`TickerError::StopRefused`] when any *other* module
    /// still needs updates; the requester's own demand never blocks its own
    /// request.
    pub fn try_stop(&mut self, requester: TypeId) -> TickerResult<()> {
        if let Some(slot) = self
            .modules
            .iter()
            .find(|slot| slot.key != requester && slot.module.needs_update())
        {
            let err = TickerError::StopRefused {
                blocked_by: slot.name,
            };
            log::warn!("[TickerManager] {err}");
            return Err(err);
        }
        self.stop()
    }

    /// [`TickerManager::try_stop`] with the requester named by type.
    pub fn try_stop_for<M: TickerModule>(&mut self) -> TickerResult<()> {
        self.try_stop(TypeId::of::<M>())
    }

    /// Stops the shared clock unconditionally.
    ///
    /// Fails with [`TickerError::AlreadyStopped`] when it is not running.
    pub fn stop(&mut self) -> TickerResult<()> {
        match self.tick_handle.take() {
            Some(handle) => {
                self.clock.remove_ticker(handle);
                log::debug!("[TickerManager] shared clock stopped");
                Ok(())
            }
            None => {
                let err = TickerError::AlreadyStopped;
                log::warn!("[TickerManager] {err}");
                Err(err)
            }
        }
    }

    /// Whether any module needs updates, optionally ignoring one module.
    ///
    /// `ignore` is how a stopping module excludes its own demand from the
    /// answer.
    #[must_use]
    pub fn requires_clock(&self, ignore: Option<TypeId>) -> bool {
        self.modules
            .iter()
            .any(|slot| Some(slot.key) != ignore && slot.module.needs_update())
    }

    /// Whether the shared clock subscription is currently alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.tick_handle.is_some()
    }

    /// Whether the manager currently mirrors the host as paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &TickerConfig {
        &self.config
    }

    /// Enables or disables the leak-detection cleanup sweep.
    pub fn set_cleanup_enabled(&mut self, enabled: bool) {
        self.config.cleanup_enabled = enabled;
    }

    /// Sets how much running time passes between cleanup sweeps.
    pub fn set_cleanup_interval(&mut self, interval: Duration) {
        self.config.cleanup_interval = interval;
    }

    /// Sets the shared-clock tick interval.
    ///
    /// Applies the next time the clock starts; a running subscription keeps
    /// the interval it started with.
    pub fn set_tick_interval(&mut self, interval: Duration) {
        self.config.tick_interval = interval;
    }

    /// Sets the reduced update cadence reserved for paused hosts.
    pub fn set_pause_update_interval(&mut self, interval: Duration) {
        self.config.pause_update_interval = interval;
    }

    /// Replaces the set of events that start the clock automatically.
    pub fn set_auto_start_triggers(&mut self, triggers: HashSet<TickerTrigger>) {
        self.config.auto_start_triggers = triggers;
    }

    /// Replaces the set of events that stop the clock automatically.
    pub fn set_auto_stop_triggers(&mut self, triggers: HashSet<TickerTrigger>) {
        self.config.auto_stop_triggers = triggers;
    }

    /// Detaches from the clock and both event sources and drops all modules.
    ///
    /// Idempotent; also run by [`Drop`], so calling it explicitly is only
    /// needed to tear down early.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.session_subscription.take() {
            self.session.unsubscribe(handle);
        }
        if let Some(handle) = self.pause_subscription.take() {
            self.pause.unsubscribe(handle);
        }
        if let Some(handle) = self.tick_handle.take() {
            self.clock.remove_ticker(handle);
        }
        if !self.modules.is_empty() {
            log::debug!(
                "[TickerManager] dropping {count} module(s) at shutdown",
                count = self.modules.len()
            );
            self.modules.clear();
        }
        self.pending.clear();
    }

    /// Relays a session start: applies the trigger mapping, then notifies
    /// every module, then applies the requests they queued.
    ///
    /// Normally driven by the subscription wired at construction; exposed for
    /// hosts that carry their own event plumbing.
    pub fn on_session_started(&mut self, kind: SessionKind) {
        log::info!("[TickerManager] session started: {kind:?}");
        self.apply_trigger(TickerTrigger::SessionStarted);
        self.relay(|module, ctx| module.on_session_started(ctx));
        self.apply_pending();
    }

    /// Relays a session end; same shape as [`TickerManager::on_session_started`].
    pub fn on_session_ended(&mut self) {
        log::info!("[TickerManager] session ended");
        self.apply_trigger(TickerTrigger::SessionEnded);
        self.relay(|module, ctx| module.on_session_ended(ctx));
        self.apply_pending();
    }

    /// Relays a pause edge: records the new flag, applies the trigger
    /// mapping, then walks the modules, refreshing each one's state mirror
    /// just before its hook runs.
    pub fn on_pause_changed(&mut self, paused: bool) {
        log::info!("[TickerManager] paused: {paused}");
        self.paused = paused;
        self.apply_trigger(if paused {
            TickerTrigger::Paused
        } else {
            TickerTrigger::Unpaused
        });
        let Self {
            modules, pending, ..
        } = self;
        for slot in modules.iter_mut() {
            slot.module.state_mut().set_paused(paused);
            let mut ctx = TickerContext {
                requests: &mut *pending,
                paused,
                module: slot.key,
                module_name: slot.name,
            };
            if paused {
                slot.module.on_paused(&mut ctx);
            } else {
                slot.module.on_unpaused(&mut ctx);
            }
        }
        self.apply_pending();
    }

    /// One shared-clock round: fan out ticks, apply queued requests, run the
    /// cleanup sweep. Returns whether the subscription should stay alive.
    fn on_tick(&mut self, delta: Duration) -> bool {
        let paused = self.paused;
        let Self {
            modules, pending, ..
        } = self;
        for slot in modules.iter_mut() {
            if paused && !slot.module.state().ticks_while_paused() {
                continue;
            }
            let mut ctx = TickerContext {
                requests: &mut *pending,
                paused,
                module: slot.key,
                module_name: slot.name,
            };
            slot.module.tick(delta, &mut ctx);
        }
        self.apply_pending();
        self.cleanup_sweep(delta);
        self.tick_handle.is_some()
    }

    fn apply_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let requests: Vec<TickerRequest> = self.pending.drain(..).collect();
        for request in requests {
            let result = match request {
                TickerRequest::Start => {
                    log::trace!("[TickerManager] module requested clock start");
                    self.try_start()
                }
                TickerRequest::Stop {
                    requester,
                    requester_name,
                } => {
                    log::trace!("[TickerManager] module '{requester_name}' requested clock stop");
                    self.try_stop(requester)
                }
            };
            if let Err(err) = result {
                log::trace!("[TickerManager] module request not applied: {err}");
            }
        }
    }

    /// Accumulates running time and, once per cleanup interval, stops a clock
    /// nobody needs anymore.
    fn cleanup_sweep(&mut self, delta: Duration) {
        if self.tick_handle.is_none() || !self.config.cleanup_enabled {
            return;
        }
        self.cleanup_accumulator += delta;
        if self.cleanup_accumulator < self.config.cleanup_interval {
            return;
        }
        self.cleanup_accumulator = Duration::ZERO;
        if !self.requires_clock(None) {
            let err = TickerError::LeakDetected;
            log::error!("[TickerManager] {err}");
            // The callback sees the cleared handle and retires itself on
            // return, so handle and subscription die in the same round.
            self.tick_handle = None;
        }
    }

    /// Fans a lifecycle hook out to every module in insertion order.
    fn relay<F>(&mut self, mut call: F)
    where
        F: FnMut(&mut dyn TickerModule, &mut TickerContext<'_>),
    {
        let paused = self.paused;
        let Self {
            modules, pending, ..
        } = self;
        for slot in modules.iter_mut() {
            let mut ctx = TickerContext {
                requests: &mut *pending,
                paused,
                module: slot.key,
                module_name: slot.name,
            };
            call(slot.module.as_mut(), &mut ctx);
        }
    }

    /// Applies the configured trigger mapping for one event, before any
    /// module hears it. An event in both sets starts, then stops: it nets
    /// out stopped.
    fn apply_trigger(&mut self, trigger: TickerTrigger) {
        if self.config.auto_start_triggers.contains(&trigger) {
            if let Err(err) = self.try_start() {
                log::trace!("[TickerManager] auto-start on {trigger:?} skipped: {err}");
            }
        }
        if self.config.auto_stop_triggers.contains(&trigger) {
            if let Err(err) = self.stop() {
                log::trace!("[TickerManager] auto-stop on {trigger:?} skipped: {err}");
            }
        }
    }
}

impl Drop for TickerManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleState;
    use std::any::Any;

    #[derive(Default)]
    struct Busy {
        state: ModuleState,
        busy: bool,
    }

    impl TickerModule for Busy {
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

    #[derive(Default)]
    struct AlsoBusy {
        state: ModuleState,
        busy: bool,
    }

    impl TickerModule for AlsoBusy {
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

    #[test]
    fn requires_clock_skips_only_the_ignored_module() {
        let manager = TickerManager::new(
            TickerConfig::default(),
            &CoreTicker::new(),
            &SessionSource::new(),
            &PauseSource::new(),
        );
        let mut manager = manager.lock().unwrap();
        manager.add_module::<Busy>().unwrap().busy = true;
        manager.add_module::<AlsoBusy>().unwrap();

        assert!(manager.requires_clock(None));
        assert!(
            !manager.requires_clock(Some(TypeId::of::<Busy>())),
            "the only demand comes from the ignored module"
        );
        assert!(
            manager.requires_clock(Some(TypeId::of::<AlsoBusy>())),
            "ignoring an idle module must not hide the busy one"
        );
    }

    #[test]
    fn a_trigger_in_both_sets_nets_out_stopped() {
        let clock = CoreTicker::new();
        let mut config = TickerConfig::default();
        config.auto_start_triggers = HashSet::from([TickerTrigger::Init]);
        config.auto_stop_triggers = HashSet::from([TickerTrigger::Init]);

        let manager = TickerManager::new(
            config,
            &clock,
            &SessionSource::new(),
            &PauseSource::new(),
        );

        assert!(!manager.lock().unwrap().is_running());
        assert_eq!(clock.callback_count(), 0, "start-then-stop must not leak");
    }
}
