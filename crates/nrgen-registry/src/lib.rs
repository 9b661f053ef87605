//! Kernel registry and deferred, optionally parallel, kernel registration.
//!
//! Kernel-producing code is written as [`KernelRoutine`]s installed into a
//! [`GenerationSession`]. A run has two phases:
//!
//! 1. **Discovery**: every call the driver makes is recorded together with
//!    the calls it requests, transitively, without doing any symbolic work.
//! 2. **Dispatch**: each discovered call is built, sequentially or on a
//!    rayon pool, and the resulting [`KernelRecord`]s are merged into the
//!    [`KernelRegistry`] in discovery order.
//!
//! The registry ends up identical whatever the dispatch mode.
//!
//! # Example
//!
//! ```
//! use nrgen_registry::{Args, GenerationSession, KernelBatch, KernelRecord, KernelRoutine, SessionConfig};
//!
//! struct Hello;
//!
//! impl KernelRoutine for Hello {
//!     fn name(&self) -> &str {
//!         "hello"
//!     }
//!
//!     fn build(&self, _args: &Args, out: &mut KernelBatch) -> anyhow::Result<()> {
//!         out.register(KernelRecord::builder("hello").build()?);
//!         Ok(())
//!     }
//! }
//!
//! let mut session = GenerationSession::open(SessionConfig::default());
//! session.install(Hello).unwrap();
//! session.call("hello", Args::new()).unwrap();
//! let registry = session.run().unwrap();
//! assert_eq!(registry.names(), vec!["hello"]);
//! ```

pub mod args;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod partition;
pub mod record;
pub mod registry;
pub mod routine;
pub mod session;

pub use args::{ArgValue, Args};
pub use discovery::{CallList, CallRecord, EntryState};
pub use dispatch::DispatchMode;
pub use error::{RegistryError, Result};
pub use partition::Partition;
pub use record::{KernelBody, KernelRecord, KernelRecordBuilder};
pub use registry::KernelRegistry;
pub use routine::{qualified_name, Discovery, KernelBatch, KernelRoutine};
pub use session::{GenerationSession, SessionConfig};
