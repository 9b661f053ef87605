//! Kernel-producing routines.
//!
//! A routine has two entry points. [`discover`](KernelRoutine::discover) is
//! cheap: it only names the further calls this invocation depends on.
//! [`build`](KernelRoutine::build) does the symbolic construction and
//! lowering and hands finished records to a [`KernelBatch`].

use crate::args::Args;
use crate::error::{RegistryError, Result};
use crate::record::KernelRecord;

/// A routine that generates one or more kernels from its arguments.
pub trait KernelRoutine: Send + Sync {
    /// Name the routine is installed and called under.
    fn name(&self) -> &str;

    /// Arguments whose values distinguish independent invocations.
    ///
    /// The qualified name of a call is the routine name plus the values of
    /// these arguments; two calls with the same qualified name must bind
    /// identical arguments.
    fn instance_args(&self) -> &[&'static str] {
        &[]
    }

    /// Record the further calls this invocation needs. Must not do any
    /// expensive work.
    fn discover(&self, _args: &Args, _calls: &mut Discovery) -> anyhow::Result<()> {
        Ok(())
    }

    /// Build this invocation's kernels.
    fn build(&self, args: &Args, out: &mut KernelBatch) -> anyhow::Result<()>;
}

/// Qualified name of a call to `routine` with `args`.
pub fn qualified_name(routine: &dyn KernelRoutine, args: &Args) -> Result<String> {
    let instance = routine.instance_args();
    if instance.is_empty() {
        return Ok(routine.name().to_string());
    }
    let mut parts = Vec::with_capacity(instance.len());
    for &name in instance {
        let value = args
            .get(name)
            .ok_or_else(|| RegistryError::MissingArgument(name.to_string()))?;
        parts.push(format!("{name}={}", value.bare()));
    }
    Ok(format!("{}[{}]", routine.name(), parts.join(",")))
}

/// Calls requested by a routine during discovery.
#[derive(Debug, Default)]
pub struct Discovery {
    requested: Vec<(String, Args)>,
}

impl Discovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a call to the routine installed as `routine`.
    pub fn call(&mut self, routine: impl Into<String>, args: Args) {
        self.requested.push((routine.into(), args));
    }

    pub fn is_empty(&self) -> bool {
        self.requested.is_empty()
    }

    pub(crate) fn into_requests(self) -> Vec<(String, Args)> {
        self.requested
    }
}

/// Records built by one dispatch entry.
#[derive(Debug, Default)]
pub struct KernelBatch {
    records: Vec<KernelRecord>,
}

impl KernelBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, record: KernelRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[KernelRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<KernelRecord> {
        self.records
    }
}
