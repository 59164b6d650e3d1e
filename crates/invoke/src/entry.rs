use std::collections::HashMap;
use std::ffi::{CString, OsStr, OsString, c_char};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::arena::{ArenaHandle, WorkerError};
use crate::context::LoadContext;
use crate::request::QualifiedName;

/// ABI version understood by [`DylibResolver`].
pub const ENTRY_ABI_VERSION: u32 = 1;

/// The conventional args-vector entry routine: argument count, argument
/// vector, C status return (zero is success).
pub type RawEntryFn = unsafe extern "C" fn(argc: usize, argv: *const *const c_char) -> i32;

/// Entry table filled by a library's entry symbol.
#[repr(C)]
pub struct RawEntryTable {
	/// Must equal [`ENTRY_ABI_VERSION`].
	pub abi_version: u32,
	/// The entry routine; a null routine is a signature failure.
	pub run: Option<RawEntryFn>,
}

type EntrySymbol = unsafe extern "C" fn(*mut RawEntryTable) -> i32;

/// Errors raised while resolving an entry point.
#[derive(Error, Debug)]
pub enum ResolutionError {
	#[error("entry point not found: {0}")]
	NotFound(QualifiedName),

	#[error("entry point {name} has incompatible ABI version {found} (host {ENTRY_ABI_VERSION})")]
	AbiMismatch { name: QualifiedName, found: u32 },

	#[error("entry point {0} is missing the args-vector run routine")]
	Signature(QualifiedName),

	#[error("entry symbol {symbol} for {name} reported status {status}")]
	EntryInit {
		name: QualifiedName,
		symbol: String,
		status: i32,
	},
}

/// Ambient state handed to a resolved entry point.
///
/// Explicit replacements for what a host would otherwise make ambient: the
/// argument vector, the invocation's output directory, the rendered
/// classpath, and a handle for spawning further workers into the
/// invocation's arena.
pub struct EntryContext {
	args: Vec<String>,
	output_dir: PathBuf,
	classpath: OsString,
	arena: ArenaHandle,
}

impl EntryContext {
	pub(crate) fn new(args: Vec<String>, output_dir: PathBuf, classpath: OsString, arena: ArenaHandle) -> Self {
		Self {
			args,
			output_dir,
			classpath,
			arena,
		}
	}

	/// Argument vector for the entry routine.
	pub fn args(&self) -> &[String] {
		&self.args
	}

	/// Output directory the invoked compiler writes into.
	pub fn output_dir(&self) -> &Path {
		&self.output_dir
	}

	/// Effective classpath, rendered as one search-path string.
	pub fn classpath(&self) -> &OsStr {
		&self.classpath
	}

	/// Handle for spawning further workers into the invocation's arena.
	pub fn arena(&self) -> &ArenaHandle {
		&self.arena
	}
}

/// A resolved compiler entry point.
pub trait EntryPoint: Send + Sync {
	/// Runs the entry routine to completion on the calling worker.
	fn run(&self, ctx: &EntryContext) -> Result<(), WorkerError>;
}

impl<F> EntryPoint for F
where
	F: Fn(&EntryContext) -> Result<(), WorkerError> + Send + Sync,
{
	fn run(&self, ctx: &EntryContext) -> Result<(), WorkerError> {
		self(ctx)
	}
}

/// Maps (load context, qualified name) to a runnable entry point.
pub trait EntryPointResolver: Send + Sync {
	fn resolve(&self, context: &Arc<LoadContext>, name: &QualifiedName) -> Result<Box<dyn EntryPoint>, ResolutionError>;
}

/// Resolves entry points from the context's loaded libraries.
///
/// Searches libraries in load order for the derived entry symbol, an
/// `extern "C" fn(*mut RawEntryTable) -> i32` that fills the entry table;
/// the table's ABI version and run routine are then validated.
#[derive(Debug, Default, Clone, Copy)]
pub struct DylibResolver;

impl EntryPointResolver for DylibResolver {
	fn resolve(&self, context: &Arc<LoadContext>, name: &QualifiedName) -> Result<Box<dyn EntryPoint>, ResolutionError> {
		let symbol = name.symbol_name();

		for (path, library) in context.libraries() {
			let entry: libloading::Symbol<'_, EntrySymbol> = match unsafe { library.get(symbol.as_bytes()) } {
				Ok(entry) => entry,
				Err(_) => continue,
			};

			let mut table = RawEntryTable {
				abi_version: 0,
				run: None,
			};
			let status = unsafe { entry(&mut table) };
			if status != 0 {
				return Err(ResolutionError::EntryInit {
					name: name.clone(),
					symbol,
					status,
				});
			}
			if table.abi_version != ENTRY_ABI_VERSION {
				return Err(ResolutionError::AbiMismatch {
					name: name.clone(),
					found: table.abi_version,
				});
			}
			let Some(run) = table.run else {
				return Err(ResolutionError::Signature(name.clone()));
			};

			tracing::debug!(name = %name, library = %path.display(), "invoke.entry.resolved");
			return Ok(Box::new(DylibEntryPoint {
				_context: Arc::clone(context),
				run,
			}));
		}

		Err(ResolutionError::NotFound(name.clone()))
	}
}

struct DylibEntryPoint {
	// Keeps the originating libraries loaded for as long as the callable exists.
	_context: Arc<LoadContext>,
	run: RawEntryFn,
}

impl EntryPoint for DylibEntryPoint {
	fn run(&self, ctx: &EntryContext) -> Result<(), WorkerError> {
		let mut storage = Vec::with_capacity(ctx.args().len());
		for arg in ctx.args() {
			let arg = CString::new(arg.as_str()).map_err(|_| WorkerError::failed(format!("argument contains NUL byte: {arg:?}")))?;
			storage.push(arg);
		}
		let argv: Vec<*const c_char> = storage.iter().map(|arg| arg.as_ptr()).collect();

		let status = unsafe { (self.run)(argv.len(), argv.as_ptr()) };
		if status == 0 { Ok(()) } else { Err(WorkerError::Status(status)) }
	}
}

/// In-process entry points registered under their qualified names.
///
/// For hosts embedding a compiler directly instead of loading it from the
/// classpath; resolution ignores the load context's libraries.
#[derive(Default, Clone)]
pub struct RegistryResolver {
	inner: Arc<RwLock<HashMap<String, Arc<dyn EntryPoint>>>>,
}

impl RegistryResolver {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers one entry point, replacing any previous registration.
	pub fn register(&self, name: impl Into<QualifiedName>, entry: Arc<dyn EntryPoint>) {
		let name = name.into();
		self.inner.write().insert(name.as_str().to_string(), entry);
	}
}

impl EntryPointResolver for RegistryResolver {
	fn resolve(&self, _context: &Arc<LoadContext>, name: &QualifiedName) -> Result<Box<dyn EntryPoint>, ResolutionError> {
		let guard = self.inner.read();
		let Some(entry) = guard.get(name.as_str()) else {
			return Err(ResolutionError::NotFound(name.clone()));
		};
		Ok(Box::new(RegisteredEntryPoint {
			entry: Arc::clone(entry),
		}))
	}
}

struct RegisteredEntryPoint {
	entry: Arc<dyn EntryPoint>,
}

impl EntryPoint for RegisteredEntryPoint {
	fn run(&self, ctx: &EntryContext) -> Result<(), WorkerError> {
		self.entry.run(ctx)
	}
}

#[cfg(test)]
mod tests {
	use crate::arena::WorkerArena;
	use crate::request::ClasspathSpec;

	use super::*;

	fn empty_context() -> Arc<LoadContext> {
		Arc::new(LoadContext::open(ClasspathSpec::new(), "out").unwrap())
	}

	fn test_entry_context(arena: &WorkerArena) -> EntryContext {
		EntryContext::new(vec!["one".to_string()], PathBuf::from("out"), OsString::new(), arena.handle())
	}

	#[test]
	fn dylib_resolution_fails_when_no_library_exports_the_symbol() {
		let err = DylibResolver
			.resolve(&empty_context(), &QualifiedName::from("compiler.main"))
			.err()
			.unwrap();
		assert!(matches!(err, ResolutionError::NotFound(name) if name.as_str() == "compiler.main"));
	}

	#[test]
	fn registry_resolves_registered_names() {
		let registry = RegistryResolver::new();
		registry.register(
			"compiler.main",
			Arc::new(|_ctx: &EntryContext| -> Result<(), WorkerError> { Ok(()) }),
		);

		let entry = registry
			.resolve(&empty_context(), &QualifiedName::from("compiler.main"))
			.unwrap();

		let arena = WorkerArena::new("test");
		assert!(entry.run(&test_entry_context(&arena)).is_ok());
		assert!(arena.drain().is_empty());
	}

	#[test]
	fn registry_rejects_unknown_names() {
		let registry = RegistryResolver::new();
		let err = registry
			.resolve(&empty_context(), &QualifiedName::from("missing.main"))
			.err()
			.unwrap();
		assert!(matches!(err, ResolutionError::NotFound(_)));
	}
}
