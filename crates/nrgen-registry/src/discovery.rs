//! Phase 1: discover every (routine, arguments) pair a run needs.
//!
//! Discovery is a single-threaded preorder walk. Each top-level call is
//! recorded, then the calls it requests are walked, recursively, before the
//! next top-level call. A qualified name seen again with identical arguments
//! is skipped; with different arguments it is an error.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::args::Args;
use crate::error::{RegistryError, Result};
use crate::routine::{qualified_name, Discovery, KernelRoutine};

/// Installed routines, by name.
pub type Routines = BTreeMap<String, Arc<dyn KernelRoutine>>;

/// Where a discovered call is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryState {
    Discovered,
    Dispatched,
    Failed,
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryState::Discovered => "discovered",
            EntryState::Dispatched => "dispatched",
            EntryState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One discovered call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub qualified: String,
    pub routine: String,
    pub args: Args,
    pub state: EntryState,
}

/// Discovered calls in discovery order.
#[derive(Debug, Clone, Default)]
pub struct CallList {
    entries: Vec<CallRecord>,
    index: HashMap<String, usize>,
}

impl CallList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[CallRecord] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, qualified: &str) -> Option<&CallRecord> {
        self.index.get(qualified).map(|&i| &self.entries[i])
    }

    /// Indices of entries still waiting to be dispatched.
    pub fn pending(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.state == EntryState::Discovered)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(|e| e.state == EntryState::Failed)
    }

    pub(crate) fn set_state(&mut self, i: usize, state: EntryState) {
        self.entries[i].state = state;
    }

    pub(crate) fn entry(&self, i: usize) -> &CallRecord {
        &self.entries[i]
    }

    /// Record a call; `false` when an identical call was already recorded.
    fn record(&mut self, qualified: String, routine: &str, args: Args) -> Result<bool> {
        if let Some(&i) = self.index.get(&qualified) {
            let first = &self.entries[i].args;
            if *first != args {
                return Err(RegistryError::AmbiguousRegistration {
                    qualified,
                    first: first.clone(),
                    second: args,
                });
            }
            return Ok(false);
        }
        self.index.insert(qualified.clone(), self.entries.len());
        self.entries.push(CallRecord {
            qualified,
            routine: routine.to_string(),
            args,
            state: EntryState::Discovered,
        });
        Ok(true)
    }
}

/// Walk `calls`, and everything they transitively request, into `list`.
///
/// All or nothing: on error `list` is left as it was.
pub fn discover(routines: &Routines, calls: Vec<(String, Args)>, list: &mut CallList) -> Result<()> {
    let mut scratch = list.clone();
    for (name, args) in calls {
        visit(routines, name, args, &mut scratch)?;
    }
    *list = scratch;
    Ok(())
}

fn visit(routines: &Routines, name: String, args: Args, list: &mut CallList) -> Result<()> {
    let routine = routines
        .get(&name)
        .ok_or_else(|| RegistryError::UnknownRoutine(name.clone()))?;
    let qualified = qualified_name(routine.as_ref(), &args)?;
    if !list.record(qualified.clone(), &name, args.clone())? {
        return Ok(());
    }
    debug!(routine = %qualified, %args, "discovered");

    let mut requests = Discovery::new();
    routine
        .discover(&args, &mut requests)
        .map_err(|source| RegistryError::DiscoveryFailure {
            routine: qualified,
            source,
        })?;
    for (callee, callee_args) in requests.into_requests() {
        visit(routines, callee, callee_args, list)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routine::KernelBatch;

    /// Requests each name in `deps` with the same `thorn_name`.
    struct Node {
        name: &'static str,
        deps: Vec<&'static str>,
    }

    impl KernelRoutine for Node {
        fn name(&self) -> &str {
            self.name
        }

        fn instance_args(&self) -> &[&'static str] {
            &["thorn_name"]
        }

        fn discover(&self, args: &Args, calls: &mut Discovery) -> anyhow::Result<()> {
            for dep in &self.deps {
                calls.call(*dep, args.clone());
            }
            Ok(())
        }

        fn build(&self, _args: &Args, _out: &mut KernelBatch) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct Broken;

    impl KernelRoutine for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn discover(&self, _args: &Args, _calls: &mut Discovery) -> anyhow::Result<()> {
            anyhow::bail!("bad configuration")
        }

        fn build(&self, _args: &Args, _out: &mut KernelBatch) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn routines() -> Routines {
        let mut r: Routines = BTreeMap::new();
        let nodes = [
            Node { name: "rhs", deps: vec!["fd_helper", "params"] },
            Node { name: "fd_helper", deps: vec!["params"] },
            Node { name: "params", deps: vec![] },
            Node { name: "cycle_a", deps: vec!["cycle_b"] },
            Node { name: "cycle_b", deps: vec!["cycle_a"] },
        ];
        for n in nodes {
            r.insert(n.name.to_string(), Arc::new(n));
        }
        r.insert("broken".to_string(), Arc::new(Broken));
        r
    }

    fn thorn(t: &str) -> Args {
        Args::new().with("thorn_name", t)
    }

    #[test]
    fn preorder_with_dedup() {
        let mut list = CallList::new();
        discover(&routines(), vec![("rhs".into(), thorn("W"))], &mut list).unwrap();
        let order: Vec<&str> = list.entries().iter().map(|e| e.routine.as_str()).collect();
        assert_eq!(order, vec!["rhs", "fd_helper", "params"]);
        assert!(list.entries().iter().all(|e| e.state == EntryState::Discovered));
        assert_eq!(list.pending(), vec![0, 1, 2]);
    }

    #[test]
    fn instance_args_separate_calls() {
        let mut list = CallList::new();
        let calls = vec![("params".into(), thorn("A")), ("params".into(), thorn("B"))];
        discover(&routines(), calls, &mut list).unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.get("params[thorn_name=A]").is_some());
        assert!(list.get("params[thorn_name=B]").is_some());
    }

    #[test]
    fn cycles_terminate() {
        let mut list = CallList::new();
        discover(&routines(), vec![("cycle_a".into(), thorn("W"))], &mut list).unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn ambiguous_arguments_rejected() {
        let mut list = CallList::new();
        let calls = vec![
            ("params".into(), thorn("A")),
            ("params".into(), thorn("A").with("fd_order", 4)),
        ];
        let err = discover(&routines(), calls, &mut list).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::AmbiguousRegistration { qualified, .. } if qualified == "params[thorn_name=A]"
        ));
    }

    #[test]
    fn unknown_and_failing_routines_abort() {
        let mut list = CallList::new();
        let err = discover(&routines(), vec![("nope".into(), Args::new())], &mut list).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownRoutine(n) if n == "nope"));

        let err = discover(&routines(), vec![("broken".into(), Args::new())], &mut list).unwrap_err();
        assert!(matches!(err, RegistryError::DiscoveryFailure { routine, .. } if routine == "broken"));
    }

    #[test]
    fn reordered_bindings_are_the_same_call() {
        let mut list = CallList::new();
        let calls = vec![
            ("params".into(), thorn("A").with("fd_order", 4)),
            ("params".into(), Args::new().with("fd_order", 4).with("thorn_name", "A")),
        ];
        discover(&routines(), calls, &mut list).unwrap();
        assert_eq!(list.len(), 1);
        let kept = list.get("params[thorn_name=A]").unwrap();
        assert_eq!(kept.args.iter().next().map(|(n, _)| n), Some("thorn_name"));
    }

    #[test]
    fn failed_pass_leaves_list_untouched() {
        let mut list = CallList::new();
        discover(&routines(), vec![("params".into(), thorn("A"))], &mut list).unwrap();

        let calls = vec![
            ("rhs".into(), thorn("B")),
            ("broken".into(), Args::new()),
        ];
        assert!(discover(&routines(), calls, &mut list).is_err());
        assert_eq!(list.len(), 1);
        assert!(list.get("rhs[thorn_name=B]").is_none());
        assert!(list.get("broken").is_none());
        assert_eq!(list.pending(), vec![0]);
    }
}
