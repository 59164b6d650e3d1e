//! Isolated invocation of compiler entry points.
//!
//! Builds a private loading context from an explicit classpath, resolves a
//! qualified entry-point name within that context, and executes the entry
//! point on a dedicated worker arena that is fully drained (including
//! transitively spawned workers) before control returns to the caller.

mod arena;
mod context;
mod entry;
mod invoker;
mod request;

pub use arena::{ArenaHandle, WorkerArena, WorkerError, WorkerFailure};
pub use context::{ContextError, LoadContext};
pub use entry::{
	DylibResolver, ENTRY_ABI_VERSION, EntryContext, EntryPoint, EntryPointResolver, RawEntryFn,
	RawEntryTable, RegistryResolver, ResolutionError,
};
pub use invoker::{InvocationError, Invoker, WorkerFailures};
pub use request::{ClasspathSpec, InvocationRequest, QualifiedName};
