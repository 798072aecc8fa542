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

//! # Kairos Core
//!
//! Demand-driven ticker runtime. Modules declare when they need periodic
//! updates; a [`TickerManager`] keeps a single subscription on the shared
//! [`CoreTicker`] alive exactly as long as some module does, relays session
//! and pause transitions to every module, and sweeps up a clock left running
//! with no demand behind it.
//!
//! The manager is shared as a [`SharedTickerManager`]; the host owns the
//! [`CoreTicker`], [`SessionSource`] and [`PauseSource`] and pumps or
//! announces into them from its main loop.

#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod manager;
pub mod module;
pub mod pause;
pub mod session;
pub mod signal;

pub use clock::{CoreTicker, TickHandle};
pub use config::TickerConfig;
pub use error::{TickerError, TickerResult};
pub use event::{SessionEvent, SessionKind, TickerTrigger};
pub use manager::{SharedTickerManager, TickerManager};
pub use module::{ModuleState, TickerContext, TickerModule};
pub use pause::PauseSource;
pub use session::SessionSource;
pub use signal::{Signal, SignalHandle};
