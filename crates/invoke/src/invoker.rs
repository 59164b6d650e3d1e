use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::arena::{WorkerArena, WorkerFailure};
use crate::context::{ContextError, LoadContext};
use crate::entry::{EntryContext, EntryPointResolver};
use crate::request::InvocationRequest;

/// Aggregated failures from one invocation's workers.
///
/// Always non-empty; the first captured failure is the error source, so the
/// underlying cause chain stays intact for the top-level caller.
#[derive(Debug)]
pub struct WorkerFailures(Vec<WorkerFailure>);

impl WorkerFailures {
	/// The first captured failure.
	pub fn first(&self) -> &WorkerFailure {
		&self.0[0]
	}

	/// All captured failures, in capture order.
	pub fn iter(&self) -> impl Iterator<Item = &WorkerFailure> {
		self.0.iter()
	}

	/// Number of captured failures.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Always false; an aggregation is only built from at least one failure.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Display for WorkerFailures {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} worker(s) failed; first: {}", self.0.len(), self.0[0])
	}
}

impl std::error::Error for WorkerFailures {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		Some(&self.0[0])
	}
}

/// Errors surfaced by [`Invoker::invoke`].
#[derive(Error, Debug)]
pub enum InvocationError {
	#[error("failed to create output directory {path}")]
	Output {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid classpath entry: {0}")]
	Classpath(#[from] std::env::JoinPathsError),

	#[error(transparent)]
	Context(#[from] ContextError),

	#[error("failed to spawn entry worker")]
	Spawn(#[source] std::io::Error),

	#[error(transparent)]
	Workers(#[from] WorkerFailures),
}

/// Executes entry points inside isolated, invocation-scoped contexts.
///
/// Each invocation gets a fresh load context and a fresh worker arena;
/// nothing is shared or reused across invocations except the filesystem.
pub struct Invoker {
	resolver: Arc<dyn EntryPointResolver>,
}

impl Invoker {
	/// Creates an engine resolving entry points through `resolver`.
	pub fn new(resolver: Arc<dyn EntryPointResolver>) -> Self {
		Self { resolver }
	}

	/// Runs one entry point to completion.
	///
	/// Ensures the request's output directory exists, appends it to the
	/// effective classpath, opens the isolated load context, and executes
	/// the entry point on a dedicated worker. Returns only once every
	/// worker spawned by the invocation, directly or transitively, has
	/// terminated; captured worker failures (including entry-point
	/// resolution failures) come back as one aggregated
	/// [`InvocationError::Workers`].
	pub fn invoke(&self, request: InvocationRequest) -> Result<(), InvocationError> {
		tracing::debug!(
			entry_point = %request.entry_point(),
			args = request.arg_list().len(),
			"invoke.start"
		);

		std::fs::create_dir_all(request.output_dir()).map_err(|source| InvocationError::Output {
			path: request.output_dir().to_path_buf(),
			source,
		})?;

		let mut classpath = request.classpath_spec().clone();
		classpath.push(request.output_dir());
		tracing::debug!(classpath = %classpath, "invoke.classpath");
		let search_path = classpath.to_search_path()?;

		let context = Arc::new(LoadContext::open(classpath, request.output_dir())?);

		let arena = WorkerArena::new(request.entry_point().as_str());
		let ctx = EntryContext::new(
			request.arg_list().to_vec(),
			request.output_dir().to_path_buf(),
			search_path,
			arena.handle(),
		);

		let resolver = Arc::clone(&self.resolver);
		let name = request.entry_point().clone();
		arena
			.handle()
			.spawn("entry", move || {
				let entry = resolver.resolve(&context, &name)?;
				entry.run(&ctx)
			})
			.map_err(InvocationError::Spawn)?;

		let failures = arena.drain();
		tracing::debug!(failures = failures.len(), "invoke.complete");
		if failures.is_empty() {
			Ok(())
		} else {
			Err(WorkerFailures(failures).into())
		}
	}
}
