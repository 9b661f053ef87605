//! Generation sessions: the explicit owner of all registration state.
//!
//! A session holds the installed routines, the calls made by the driver,
//! the discovered call list and the kernel registry. Independent runs in
//! one process use independent sessions, or [`reset`](GenerationSession::reset)
//! between runs.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::args::Args;
use crate::discovery::{self, CallList, Routines};
use crate::dispatch::{self, DispatchMode};
use crate::error::{RegistryError, Result};
use crate::record::KernelRecord;
use crate::registry::KernelRegistry;
use crate::routine::KernelRoutine;

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Project name, used in log output.
    pub name: String,
    pub dispatch: DispatchMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: "nrgen".to_string(),
            dispatch: DispatchMode::Sequential,
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }
}

/// All state of one code-generation run.
pub struct GenerationSession {
    config: SessionConfig,
    routines: Routines,
    calls: Vec<(String, Args)>,
    plan: CallList,
    registry: KernelRegistry,
    open: bool,
}

impl GenerationSession {
    pub fn open(config: SessionConfig) -> Self {
        info!(session = %config.name, dispatch = ?config.dispatch, "session opened");
        Self {
            config,
            routines: BTreeMap::new(),
            calls: Vec::new(),
            plan: CallList::new(),
            registry: KernelRegistry::new(),
            open: true,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(RegistryError::SessionClosed)
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Make `routine` callable under its name.
    pub fn install(&mut self, routine: impl KernelRoutine + 'static) -> Result<()> {
        self.ensure_open()?;
        let name = routine.name().to_string();
        if self.routines.contains_key(&name) {
            return Err(RegistryError::DuplicateRoutine(name));
        }
        self.routines.insert(name, Arc::new(routine));
        Ok(())
    }

    /// Record a top-level call. Nothing runs until [`discover`](Self::discover).
    pub fn call(&mut self, routine: &str, args: Args) -> Result<()> {
        self.ensure_open()?;
        if !self.routines.contains_key(routine) {
            return Err(RegistryError::UnknownRoutine(routine.to_string()));
        }
        self.calls.push((routine.to_string(), args));
        Ok(())
    }

    /// Phase 1: walk every recorded call and what it transitively requests.
    ///
    /// A failed pass discards the calls recorded since the last discovery
    /// and leaves the plan unchanged.
    pub fn discover(&mut self) -> Result<&CallList> {
        self.ensure_open()?;
        let calls = std::mem::take(&mut self.calls);
        let before = self.plan.len();
        discovery::discover(&self.routines, calls, &mut self.plan)?;
        info!(
            session = %self.config.name,
            new = self.plan.len() - before,
            total = self.plan.len(),
            "discovery complete"
        );
        Ok(&self.plan)
    }

    /// Phase 2 with the configured dispatch mode.
    pub fn dispatch(&mut self) -> Result<()> {
        let mode = self.config.dispatch.clone();
        self.dispatch_with(&mode)
    }

    /// Phase 2: build every discovered, not yet dispatched call and merge
    /// the results into the registry. Calls recorded since the last
    /// discovery are discovered first.
    pub fn dispatch_with(&mut self, mode: &DispatchMode) -> Result<()> {
        self.ensure_open()?;
        if !self.calls.is_empty() {
            self.discover()?;
        }
        let result = dispatch::dispatch(&self.routines, &mut self.plan, &mut self.registry, mode);
        if let Err(err) = &result {
            warn!(session = %self.config.name, "dispatch aborted: {err}");
        }
        result
    }

    /// Discover and dispatch.
    pub fn run(&mut self) -> Result<&KernelRegistry> {
        self.discover()?;
        self.dispatch()?;
        Ok(&self.registry)
    }

    /// Register a kernel directly, bypassing the deferred protocol.
    pub fn register(&mut self, record: KernelRecord) -> Result<()> {
        self.ensure_open()?;
        self.registry.register(record)
    }

    pub fn plan(&self) -> &CallList {
        &self.plan
    }

    pub fn registry(&self) -> &KernelRegistry {
        &self.registry
    }

    /// Drop all calls, discovered entries and kernels. Installed routines
    /// stay.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.calls.clear();
        self.plan = CallList::new();
        self.registry.reset();
        info!(session = %self.config.name, "session reset");
        Ok(())
    }

    /// Close the session and hand back its registry. Every later call
    /// fails with [`RegistryError::SessionClosed`].
    pub fn close(&mut self) -> Result<KernelRegistry> {
        self.ensure_open()?;
        self.open = false;
        self.calls.clear();
        self.plan = CallList::new();
        info!(session = %self.config.name, kernels = self.registry.len(), "session closed");
        Ok(std::mem::take(&mut self.registry))
    }
}
