//! Phase 2: run discovered calls and merge their kernels.
//!
//! ```text
//!   discovered: [e0, e1, e2, e3, e4]
//!                  └─ partition ─┘
//!   workers:     {e0, e1} {e2, e3} {e4}      (any completion order)
//!                  └───────┬───────┘
//!   outcomes indexed by entry, applied in discovery order
//! ```
//!
//! Workers share nothing. Each entry builds inside its own expression graph
//! and returns its records; only the merge step touches the registry.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::anyhow;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::args::Args;
use crate::discovery::{CallList, EntryState, Routines};
use crate::error::{RegistryError, Result};
use crate::partition::Partition;
use crate::record::KernelRecord;
use crate::registry::KernelRegistry;
use crate::routine::{KernelBatch, KernelRoutine};

/// How phase 2 runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DispatchMode {
    #[default]
    Sequential,
    /// A rayon pool of `workers` threads (0 picks the rayon default).
    Parallel { workers: usize, partition: Partition },
}

type Outcome = anyhow::Result<Vec<KernelRecord>>;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Build one entry in a fresh expression graph.
fn run_entry(routine: &dyn KernelRoutine, args: &Args) -> Outcome {
    let caught = panic::catch_unwind(AssertUnwindSafe(|| {
        let (_graph, built) = nrgen_expr::trace(|| {
            let mut batch = KernelBatch::new();
            routine.build(args, &mut batch).map(|()| batch)
        });
        built
    }));
    match caught {
        Ok(built) => built.map(KernelBatch::into_records),
        Err(payload) => Err(anyhow!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

/// Resolve the routine for every pending entry before any work starts.
fn resolve(routines: &Routines, list: &CallList, pending: &[usize]) -> Result<Vec<Arc<dyn KernelRoutine>>> {
    pending
        .iter()
        .map(|&i| {
            let name = &list.entry(i).routine;
            routines
                .get(name)
                .cloned()
                .ok_or_else(|| RegistryError::UnknownRoutine(name.clone()))
        })
        .collect()
}

fn run_sequential(list: &CallList, pending: &[usize], resolved: &[Arc<dyn KernelRoutine>]) -> Vec<Option<Outcome>> {
    let mut outcomes: Vec<Option<Outcome>> = Vec::with_capacity(pending.len());
    for (k, &i) in pending.iter().enumerate() {
        let outcome = run_entry(resolved[k].as_ref(), &list.entry(i).args);
        let failed = outcome.is_err();
        outcomes.push(Some(outcome));
        if failed {
            break;
        }
    }
    outcomes.resize_with(pending.len(), || None);
    outcomes
}

fn run_parallel(
    list: &CallList,
    pending: &[usize],
    resolved: &[Arc<dyn KernelRoutine>],
    workers: usize,
    partition: Partition,
) -> Result<Vec<Option<Outcome>>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("nrgen-dispatch-{i}"))
        .build()?;
    let groups = partition.assign(pending.len());
    info!(workers = pool.current_num_threads(), tasks = groups.len(), "parallel dispatch");

    let finished: Vec<Vec<(usize, Outcome)>> = pool.install(|| {
        groups
            .par_iter()
            .map(|group| {
                group
                    .iter()
                    .map(|&k| (k, run_entry(resolved[k].as_ref(), &list.entry(pending[k]).args)))
                    .collect()
            })
            .collect()
    });

    let mut outcomes: Vec<Option<Outcome>> = Vec::new();
    outcomes.resize_with(pending.len(), || None);
    for (k, outcome) in finished.into_iter().flatten() {
        outcomes[k] = Some(outcome);
    }
    Ok(outcomes)
}

/// Dispatch every pending entry of `list` and merge the results into
/// `registry` in discovery order.
///
/// On failure nothing is merged, the failing entries are marked
/// [`EntryState::Failed`] and the first of them, in discovery order, is
/// returned.
pub fn dispatch(
    routines: &Routines,
    list: &mut CallList,
    registry: &mut KernelRegistry,
    mode: &DispatchMode,
) -> Result<()> {
    if list.has_failures() {
        return Err(RegistryError::NeedsReset);
    }
    let pending = list.pending();
    let resolved = resolve(routines, list, &pending)?;
    info!(entries = pending.len(), ?mode, "dispatching");

    let outcomes = match mode {
        DispatchMode::Sequential => run_sequential(list, &pending, &resolved),
        DispatchMode::Parallel { workers, partition } => {
            run_parallel(list, &pending, &resolved, *workers, *partition)?
        }
    };

    // Apply in discovery order.
    let mut first_failure: Option<RegistryError> = None;
    let mut records = Vec::new();
    for (k, outcome) in outcomes.into_iter().enumerate() {
        let i = pending[k];
        match outcome {
            Some(Ok(built)) => {
                debug!(routine = %list.entry(i).qualified, kernels = built.len(), "built");
                records.extend(built);
            }
            Some(Err(source)) => {
                let entry = list.entry(i);
                warn!(routine = %entry.qualified, args = %entry.args, "dispatch failed: {source:#}");
                let failure = RegistryError::DispatchFailure {
                    routine: entry.qualified.clone(),
                    args: entry.args.clone(),
                    source,
                };
                list.set_state(i, EntryState::Failed);
                first_failure.get_or_insert(failure);
            }
            None => {}
        }
    }
    if let Some(err) = first_failure {
        return Err(err);
    }

    let kernels = records.len();
    registry.register_all(records)?;
    for &i in &pending {
        list.set_state(i, EntryState::Dispatched);
    }
    info!(entries = pending.len(), kernels, "merged");
    Ok(())
}
