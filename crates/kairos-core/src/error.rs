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

//! Error types reported by the ticker runtime.

use std::error::Error;
use std::fmt;

/// Convenience alias for results produced by the ticker runtime.
pub type TickerResult<T> = Result<T, TickerError>;

/// Errors reported by [`TickerManager`](crate::TickerManager) operations.
///
/// Every variant is locally recoverable: the failing call leaves manager
/// state untouched and emits a matching log diagnostic. The one exception is
/// [`TickerError::LeakDetected`], which carries an automatic corrective
/// action (the shared clock is force-stopped when the leak is found).
#[derive(Debug)]
pub enum TickerError {
    /// A module of this concrete type is already registered.
    AlreadyRegistered {
        /// Type name of the duplicate module.
        module: &'static str,
    },
    /// No module of the requested type is registered.
    NotFound {
        /// Type name used for the lookup.
        module: &'static str,
    },
    /// A module factory failed during registration.
    ConstructionFailed {
        /// Type name of the module that could not be built.
        module: &'static str,
        /// The factory's underlying error.
        source: Box<dyn Error + Send + Sync>,
    },
    /// The shared clock is already running.
    AlreadyRunning,
    /// The shared clock is not running.
    AlreadyStopped,
    /// Another module still needs the shared clock.
    StopRefused {
        /// Type name of the first module still reporting demand.
        blocked_by: &'static str,
    },
    /// The shared clock was running with zero demand and has been
    /// force-stopped.
    LeakDetected,
}

impl fmt::Display for TickerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickerError::AlreadyRegistered { module } => {
                write!(f, "cannot add module '{module}' because it is already registered")
            }
            TickerError::NotFound { module } => {
                write!(f, "cannot find module '{module}'")
            }
            TickerError::ConstructionFailed { module, source } => {
                write!(f, "cannot construct module '{module}': {source}")
            }
            TickerError::AlreadyRunning => {
                write!(f, "cannot start the shared clock because it is already running")
            }
            TickerError::AlreadyStopped => {
                write!(f, "cannot stop the shared clock because it is not running")
            }
            TickerError::StopRefused { blocked_by } => {
                write!(f, "cannot stop the shared clock because module '{blocked_by}' is still using it")
            }
            TickerError::LeakDetected => {
                write!(f, "ticker leak: the shared clock was running with no module requiring updates")
            }
        }
    }
}

impl Error for TickerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TickerError::ConstructionFailed { source, .. } => {
                let source: &(dyn Error + 'static) = source.as_ref();
                Some(source)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_module() {
        let err = TickerError::AlreadyRegistered { module: "demo::Heartbeat" };
        assert_eq!(
            err.to_string(),
            "cannot add module 'demo::Heartbeat' because it is already registered"
        );

        let err = TickerError::StopRefused { blocked_by: "demo::Heartbeat" };
        assert!(
            err.to_string().contains("'demo::Heartbeat'"),
            "StopRefused should identify the blocking module, got: {err}"
        );
    }

    #[test]
    fn construction_failed_chains_its_source() {
        let inner: Box<dyn Error + Send + Sync> = "allocation refused".into();
        let err = TickerError::ConstructionFailed {
            module: "demo::Heartbeat",
            source: inner,
        };

        let source = err.source().expect("ConstructionFailed must expose a source");
        assert_eq!(source.to_string(), "allocation refused");
        assert!(err.to_string().contains("allocation refused"));
    }

    #[test]
    fn clock_transition_errors_have_no_source() {
        assert!(TickerError::AlreadyRunning.source().is_none());
        assert!(TickerError::AlreadyStopped.source().is_none());
        assert!(TickerError::LeakDetected.source().is_none());
    }

    #[test]
    fn errors_coerce_to_trait_objects() {
        // Callers stash these in `Box<dyn Error>` chains; keep that working.
        let boxed: Box<dyn Error + Send + Sync> = Box::new(TickerError::LeakDetected);
        assert!(boxed.to_string().starts_with("ticker leak"));
    }
}
