use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use parking_lot::Mutex;
use thiserror::Error;

use crate::entry::ResolutionError;

/// One failure reported by a worker.
#[derive(Error, Debug)]
pub enum WorkerError {
	#[error(transparent)]
	Resolution(#[from] ResolutionError),

	#[error("entry point exited with status {0}")]
	Status(i32),

	#[error("worker panicked: {0}")]
	Panicked(String),

	#[error("{0}")]
	Failed(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

impl WorkerError {
	/// Entry-point-reported failure with a free-form message.
	pub fn failed(message: impl Into<String>) -> Self {
		Self::Failed(message.into())
	}
}

/// A captured failure attributed to the worker that raised it.
#[derive(Error, Debug)]
#[error("worker {worker} failed")]
pub struct WorkerFailure {
	worker: String,
	#[source]
	error: WorkerError,
}

impl WorkerFailure {
	/// Name of the failed worker.
	pub fn worker(&self) -> &str {
		&self.worker
	}

	/// The captured error.
	pub fn error(&self) -> &WorkerError {
		&self.error
	}
}

struct Worker {
	name: String,
	handle: JoinHandle<()>,
}

#[derive(Default)]
struct ArenaState {
	handles: Mutex<Vec<Worker>>,
	failures: Mutex<Vec<WorkerFailure>>,
	cancel: AtomicBool,
}

/// The set of worker threads rooted at one invocation.
///
/// Created fresh per invocation, populated by the launched entry point
/// (which may itself spawn further workers through its [`ArenaHandle`]),
/// and fully drained before the invocation is considered complete. Never
/// reused across invocations.
pub struct WorkerArena {
	name: String,
	state: Arc<ArenaState>,
}

impl WorkerArena {
	/// Creates an empty arena.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			state: Arc::new(ArenaState::default()),
		}
	}

	/// Arena name, used as the worker thread-name prefix.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Returns a handle for spawning workers into this arena.
	pub fn handle(&self) -> ArenaHandle {
		ArenaHandle {
			arena: self.name.clone(),
			state: Arc::clone(&self.state),
		}
	}

	/// Whether cancellation has been requested.
	pub fn cancel_requested(&self) -> bool {
		self.state.cancel.load(Ordering::Acquire)
	}

	/// Joins every worker, repeating until a full pass over the arena finds
	/// none, then returns all captured failures.
	///
	/// Workers register synchronously at spawn, so a worker's children are
	/// visible here before the worker itself exits; the loop terminates only
	/// once the arena has stopped growing. A cancellation request is
	/// observed between joins, recorded as a warning, and left in place;
	/// supervision continues until the arena is drained.
	pub fn drain(self) -> Vec<WorkerFailure> {
		let mut joined = 0usize;
		let mut warned = false;

		loop {
			let batch = std::mem::take(&mut *self.state.handles.lock());
			if batch.is_empty() {
				break;
			}

			for worker in batch {
				if !warned && self.state.cancel.load(Ordering::Acquire) {
					tracing::warn!(arena = %self.name, "invoke.drain.interrupted");
					warned = true;
				}

				tracing::debug!(arena = %self.name, worker = %worker.name, "invoke.worker.join");
				if let Err(payload) = worker.handle.join() {
					let message = panic_message(payload.as_ref());
					self.state.failures.lock().push(WorkerFailure {
						worker: worker.name,
						error: WorkerError::Panicked(message),
					});
				}
				joined += 1;
			}
		}

		tracing::debug!(arena = %self.name, joined, "invoke.drain.complete");
		std::mem::take(&mut *self.state.failures.lock())
	}
}

/// Cloneable handle for spawning workers into an arena.
#[derive(Clone)]
pub struct ArenaHandle {
	arena: String,
	state: Arc<ArenaState>,
}

impl ArenaHandle {
	/// Spawns one named worker whose failure (returned or panicked) is
	/// captured by the arena rather than propagated.
	pub fn spawn<F>(&self, name: impl Into<String>, f: F) -> std::io::Result<()>
	where
		F: FnOnce() -> Result<(), WorkerError> + Send + 'static,
	{
		let name = name.into();
		tracing::debug!(arena = %self.arena, worker = %name, "invoke.worker.spawn");

		let state = Arc::clone(&self.state);
		let worker_name = name.clone();
		let handle = std::thread::Builder::new()
			.name(format!("{}-{name}", self.arena))
			.spawn(move || {
				if let Err(error) = f() {
					state.failures.lock().push(WorkerFailure {
						worker: worker_name,
						error,
					});
				}
			})?;

		self.state.handles.lock().push(Worker { name, handle });
		Ok(())
	}

	/// Requests cancellation of the drain phase.
	///
	/// Draining is not abortable: the request is recorded, surfaced as a
	/// warning by [`WorkerArena::drain`], and left observable here.
	pub fn request_cancel(&self) {
		self.state.cancel.store(true, Ordering::Release);
	}

	/// Whether cancellation has been requested.
	pub fn cancel_requested(&self) -> bool {
		self.state.cancel.load(Ordering::Acquire)
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&'static str>() {
		(*message).to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"unknown panic payload".to_string()
	}
}
