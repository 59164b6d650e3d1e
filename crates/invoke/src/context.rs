use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use libloading::Library;
use thiserror::Error;

use crate::request::ClasspathSpec;

/// Errors raised while opening a load context.
#[derive(Error, Debug)]
pub enum ContextError {
	#[error("failed to load library {path}")]
	Load {
		path: PathBuf,
		#[source]
		source: libloading::Error,
	},

	#[error("failed to scan classpath directory {path}")]
	Scan {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

struct LoadedLibrary {
	path: PathBuf,
	library: Library,
}

/// Private loading context scoped to one invocation's classpath.
///
/// Owns every library it loads; nothing resolves against the host's own
/// loaded code, so invocations never see each other's artifacts. Dropped
/// (unloading its libraries) once the invocation completes. The output
/// directory is an explicit field of the context rather than any
/// process-global setting.
pub struct LoadContext {
	classpath: ClasspathSpec,
	output_dir: PathBuf,
	libraries: Vec<LoadedLibrary>,
}

impl LoadContext {
	/// Opens a context over `classpath`, loading every dynamic library the
	/// classpath names, in classpath order.
	///
	/// Directory entries are scanned one level deep in file-name order;
	/// entries that are neither libraries nor directories stay path-only
	/// (visible to the compiler via the rendered classpath, not loadable
	/// code). Nonexistent entries are skipped.
	pub fn open(classpath: ClasspathSpec, output_dir: impl Into<PathBuf>) -> Result<Self, ContextError> {
		let output_dir = output_dir.into();
		let mut libraries = Vec::new();

		for entry in classpath.entries() {
			if entry.is_file() && is_dynamic_lib(entry) {
				libraries.push(load(entry)?);
			} else if entry.is_dir() {
				let mut candidates = Vec::new();
				let entries = std::fs::read_dir(entry).map_err(|source| ContextError::Scan {
					path: entry.clone(),
					source,
				})?;
				for dirent in entries {
					let dirent = dirent.map_err(|source| ContextError::Scan {
						path: entry.clone(),
						source,
					})?;
					let path = dirent.path();
					if path.is_file() && is_dynamic_lib(&path) {
						candidates.push(path);
					}
				}
				candidates.sort();
				for path in candidates {
					libraries.push(load(&path)?);
				}
			} else {
				tracing::trace!(path = %entry.display(), "invoke.context.passthrough");
			}
		}

		tracing::debug!(libraries = libraries.len(), "invoke.context.open");
		Ok(Self {
			classpath,
			output_dir,
			libraries,
		})
	}

	/// The effective classpath this context was opened over.
	pub fn classpath(&self) -> &ClasspathSpec {
		&self.classpath
	}

	/// The invocation's output directory.
	pub fn output_dir(&self) -> &Path {
		&self.output_dir
	}

	/// Number of libraries this context loaded.
	pub fn library_count(&self) -> usize {
		self.libraries.len()
	}

	pub(crate) fn libraries(&self) -> impl Iterator<Item = (&Path, &Library)> {
		self.libraries.iter().map(|loaded| (loaded.path.as_path(), &loaded.library))
	}
}

fn load(path: &Path) -> Result<LoadedLibrary, ContextError> {
	tracing::debug!(path = %path.display(), "invoke.context.load");
	let library = unsafe { Library::new(path) }.map_err(|source| ContextError::Load {
		path: path.to_path_buf(),
		source,
	})?;
	Ok(LoadedLibrary {
		path: path.to_path_buf(),
		library,
	})
}

fn is_dynamic_lib(path: &Path) -> bool {
	match path.extension().and_then(OsStr::to_str) {
		Some("so") | Some("dylib") | Some("dll") => true,
		_ => false,
	}
}
