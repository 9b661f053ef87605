//! Error types for nrgen-registry.

use thiserror::Error;

use crate::args::Args;

/// Errors raised by the kernel registry and the registration controller.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A kernel with this name is already registered.
    #[error("kernel `{0}` is already registered")]
    DuplicateKernel(String),

    /// Kernel names must be valid C identifiers.
    #[error("`{0}` is not a valid C function name")]
    InvalidKernelName(String),

    /// The same qualified routine was discovered with different arguments.
    #[error("routine `{qualified}` discovered twice with different arguments: {first} vs {second}")]
    AmbiguousRegistration {
        qualified: String,
        first: Args,
        second: Args,
    },

    /// No routine is installed under this name.
    #[error("no routine named `{0}` is installed")]
    UnknownRoutine(String),

    /// A routine with this name is already installed.
    #[error("routine `{0}` is already installed")]
    DuplicateRoutine(String),

    /// A required argument was not bound.
    #[error("missing argument `{0}`")]
    MissingArgument(String),

    /// An argument was bound to a value of the wrong kind.
    #[error("argument `{name}` is not a {expected}")]
    ArgumentType { name: String, expected: &'static str },

    /// A routine failed while its calls were being discovered.
    #[error("discovery of `{routine}` failed: {source}")]
    DiscoveryFailure {
        routine: String,
        #[source]
        source: anyhow::Error,
    },

    /// A routine failed while building its kernels.
    #[error("dispatch of `{routine}` with {args} failed: {source}")]
    DispatchFailure {
        routine: String,
        args: Args,
        #[source]
        source: anyhow::Error,
    },

    /// An earlier dispatch failed and the session was not reset.
    #[error("a previous dispatch failed; reset the session before dispatching again")]
    NeedsReset,

    /// The session was closed.
    #[error("generation session is closed")]
    SessionClosed,

    /// The worker pool could not be built.
    #[error("worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Configuration or registry (de)serialization failed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
