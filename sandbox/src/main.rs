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

// Kairos Sandbox
// Demo binary driving the ticker runtime from a plain main loop

use std::any::Any;
use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use kairos_core::{
    CoreTicker, ModuleState, PauseSource, SessionKind, SessionSource, TickerConfig, TickerContext,
    TickerManager, TickerModule, TickerTrigger,
};

/// Beats at a fixed cadence until its beat budget runs out, then lets the
/// shared clock wind down with it.
struct HeartbeatModule {
    state: ModuleState,
    remaining: u32,
    cadence: Duration,
    accumulated: Duration,
}

impl Default for HeartbeatModule {
    fn default() -> Self {
        Self {
            state: ModuleState::default(),
            remaining: 0,
            cadence: Duration::from_millis(160),
            accumulated: Duration::ZERO,
        }
    }
}

impl TickerModule for HeartbeatModule {
    fn tick(&mut self, delta_time: Duration, ctx: &mut TickerContext<'_>) {
        self.accumulated += delta_time;
        if self.accumulated >= self.cadence && self.remaining > 0 {
            self.accumulated = Duration::ZERO;
            self.remaining -= 1;
            log::info!(
                "[Heartbeat] beat ({remaining} left)",
                remaining = self.remaining
            );
        }
        self.request_stop_if_idle(ctx);
    }

    fn on_session_started(&mut self, _ctx: &mut TickerContext<'_>) {
        log::info!(
            "[Heartbeat] session begins; beating {remaining} times",
            remaining = self.remaining
        );
    }

    fn needs_update(&self) -> bool {
        self.remaining > 0
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

/// Counts every round it sees; opted into ticking through pauses, so its
/// count keeps climbing while the heartbeat is suspended.
#[derive(Default)]
struct MetronomeModule {
    state: ModuleState,
    rounds: u32,
}

impl TickerModule for MetronomeModule {
    fn tick(&mut self, _delta_time: Duration, _ctx: &mut TickerContext<'_>) {
        self.rounds += 1;
    }

    fn on_paused(&mut self, _ctx: &mut TickerContext<'_>) {
        log::info!("[Metronome] paused at round {rounds}", rounds = self.rounds);
    }

    fn on_unpaused(&mut self, _ctx: &mut TickerContext<'_>) {
        log::info!("[Metronome] resumed at round {rounds}", rounds = self.rounds);
    }

    fn needs_update(&self) -> bool {
        false
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

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let clock = CoreTicker::new();
    let session = SessionSource::new();
    let pause = PauseSource::new();

    let mut config = TickerConfig::default();
    config.auto_start_triggers = HashSet::from([TickerTrigger::SessionStarted]);
    config.cleanup_interval = Duration::from_secs(2);

    let manager = TickerManager::new(config, &clock, &session, &pause);
    {
        let mut manager = manager.lock().unwrap();
        manager.add_module::<HeartbeatModule>()?.remaining = 12;
        manager
            .add_module::<MetronomeModule>()?
            .state_mut()
            .set_tick_while_paused(true);
    }

    // The SessionStarted trigger starts the shared clock; nobody calls
    // try_start by hand.
    session.announce_started(SessionKind::Game);

    let frame = Duration::from_millis(16);
    for round in 0..600 {
        if !manager.lock().unwrap().is_running() {
            break;
        }
        // A pause episode in the middle of the run.
        if round == 40 {
            pause.set_paused(true);
        }
        if round == 60 {
            pause.set_paused(false);
        }
        clock.tick(frame);
        thread::sleep(frame);
    }

    session.announce_ended();

    let rounds = manager
        .lock()
        .unwrap()
        .module::<MetronomeModule>()
        .map_or(0, |metronome| metronome.rounds);
    log::info!("[Sandbox] run complete after {rounds} metronome rounds");

    manager.lock().unwrap().shutdown();
    Ok(())
}
