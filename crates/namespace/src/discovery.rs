use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use thiserror::Error;

use crate::namespace::NamespaceId;
use crate::roots::SourceRoot;

/// Errors raised while discovering namespaces.
#[derive(Error, Debug)]
pub enum DiscoveryError {
	#[error("source root does not exist: {0}")]
	MissingRoot(PathBuf),

	#[error("declared namespace not found under any source root: {0}")]
	UnresolvedNamespace(NamespaceId),

	#[error("failed to walk source root {root}")]
	Walk {
		root: PathBuf,
		#[source]
		source: ignore::Error,
	},
}

/// Namespace discovery configuration.
///
/// Discovery order follows root order, with a stable file-name-sorted
/// traversal within each root. Callers must not rely on any ordering beyond
/// that.
#[derive(Debug, Clone)]
pub struct Discovery {
	extensions: Vec<String>,
	declared_only: bool,
	require_declared: bool,
}

impl Default for Discovery {
	fn default() -> Self {
		Self {
			extensions: vec!["clj".to_string()],
			declared_only: false,
			require_declared: false,
		}
	}
}

impl Discovery {
	/// Creates a discovery with default settings.
	pub fn new() -> Self {
		Self::default()
	}

	/// Replaces the recognized compilable-unit extensions.
	///
	/// Leading dots are tolerated; matching is case-insensitive.
	#[must_use]
	pub fn extensions<I, S>(mut self, extensions: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.extensions = extensions
			.into_iter()
			.map(|ext| ext.into().trim_start_matches('.').to_ascii_lowercase())
			.filter(|ext| !ext.is_empty())
			.collect();
		self
	}

	/// Restricts the result to the explicitly declared namespaces.
	#[must_use]
	pub fn declared_only(mut self, declared_only: bool) -> Self {
		self.declared_only = declared_only;
		self
	}

	/// Validates (by scanning) that every declared namespace exists under
	/// the roots when running in declared-only mode. A missing declaration
	/// is then [`DiscoveryError::UnresolvedNamespace`] instead of being
	/// passed through.
	#[must_use]
	pub fn require_declared(mut self, require_declared: bool) -> Self {
		self.require_declared = require_declared;
		self
	}

	/// Discovers the namespaces to compile.
	///
	/// With `declared_only` set and a non-empty `explicit` list, returns
	/// exactly that list. Otherwise scans every root in order and unions
	/// the scanned set with `explicit` (explicit entries not found by
	/// scanning are still included, so namespaces outside the roots can be
	/// force-compiled).
	pub fn discover(&self, explicit: &[NamespaceId], roots: &[SourceRoot]) -> Result<Vec<NamespaceId>, DiscoveryError> {
		tracing::debug!(
			roots = roots.len(),
			explicit = explicit.len(),
			declared_only = self.declared_only,
			"namespace.discover.start"
		);

		if self.declared_only && !explicit.is_empty() {
			if self.require_declared {
				let scanned = self.scan(roots)?;
				let known: HashSet<&NamespaceId> = scanned.iter().collect();
				for id in explicit {
					if !known.contains(id) {
						return Err(DiscoveryError::UnresolvedNamespace(id.clone()));
					}
				}
			}
			tracing::debug!(count = explicit.len(), "namespace.discover.complete");
			return Ok(explicit.to_vec());
		}

		let mut found = self.scan(roots)?;
		let present: HashSet<NamespaceId> = found.iter().cloned().collect();
		for id in explicit {
			if !present.contains(id) {
				tracing::debug!(namespace = %id, "namespace.discover.forced");
				found.push(id.clone());
			}
		}

		tracing::debug!(count = found.len(), "namespace.discover.complete");
		Ok(found)
	}

	fn scan(&self, roots: &[SourceRoot]) -> Result<Vec<NamespaceId>, DiscoveryError> {
		let mut found = Vec::new();
		for root in roots {
			if !root.path().exists() {
				if root.is_optional() {
					tracing::debug!(root = %root.path().display(), "namespace.discover.skip_missing");
					continue;
				}
				return Err(DiscoveryError::MissingRoot(root.path().to_path_buf()));
			}
			self.scan_root(root.path(), &mut found)?;
		}
		Ok(found)
	}

	fn scan_root(&self, root: &Path, found: &mut Vec<NamespaceId>) -> Result<(), DiscoveryError> {
		let mut walker = WalkBuilder::new(root);
		walker
			.standard_filters(false)
			.hidden(true)
			.sort_by_file_name(|a, b| a.cmp(b));

		for entry in walker.build() {
			let entry = entry.map_err(|source| DiscoveryError::Walk {
				root: root.to_path_buf(),
				source,
			})?;
			let Some(file_type) = entry.file_type() else {
				continue;
			};
			if !file_type.is_file() {
				continue;
			}

			let path = entry.path();
			if !self.recognizes(path) {
				continue;
			}

			let relative = path.strip_prefix(root).unwrap_or(path);
			let Some(id) = NamespaceId::from_relative_path(relative) else {
				tracing::debug!(path = %path.display(), "namespace.discover.unnamed");
				continue;
			};
			tracing::trace!(namespace = %id, path = %path.display(), "namespace.discover.found");
			found.push(id);
		}

		Ok(())
	}

	fn recognizes(&self, path: &Path) -> bool {
		let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
			return false;
		};
		let ext = ext.to_ascii_lowercase();
		self.extensions.iter().any(|recognized| *recognized == ext)
	}
}

#[cfg(test)]
mod tests {
	use std::fs;

	use tempfile::TempDir;

	use super::*;

	fn touch(dir: &Path, relative: &str) {
		let path = dir.join(relative);
		fs::create_dir_all(path.parent().unwrap()).unwrap();
		fs::write(path, "").unwrap();
	}

	fn ids(raw: &[&str]) -> Vec<NamespaceId> {
		raw.iter().map(|id| NamespaceId::from(*id)).collect()
	}

	#[test]
	fn scans_roots_relative_to_each_root() {
		let tmp = TempDir::new().unwrap();
		touch(tmp.path(), "src/a/foo.clj");
		touch(tmp.path(), "src/b/bar/baz.clj");

		let roots = [
			SourceRoot::required(tmp.path().join("src/a")),
			SourceRoot::required(tmp.path().join("src/b")),
		];
		let found = Discovery::new().discover(&[], &roots).unwrap();

		assert_eq!(found, ids(&["foo", "bar.baz"]));
	}

	#[test]
	fn traversal_is_sorted_within_a_root() {
		let tmp = TempDir::new().unwrap();
		touch(tmp.path(), "zeta.clj");
		touch(tmp.path(), "alpha.clj");
		touch(tmp.path(), "mid/one.clj");

		let roots = [SourceRoot::required(tmp.path())];
		let found = Discovery::new().discover(&[], &roots).unwrap();

		assert_eq!(found, ids(&["alpha", "mid.one", "zeta"]));
	}

	#[test]
	fn ignores_unrecognized_extensions() {
		let tmp = TempDir::new().unwrap();
		touch(tmp.path(), "core.clj");
		touch(tmp.path(), "notes.txt");

		let roots = [SourceRoot::required(tmp.path())];
		let found = Discovery::new().discover(&[], &roots).unwrap();

		assert_eq!(found, ids(&["core"]));
	}

	#[test]
	fn custom_extensions_replace_the_default() {
		let tmp = TempDir::new().unwrap();
		touch(tmp.path(), "core.clj");
		touch(tmp.path(), "mod.x");

		let roots = [SourceRoot::required(tmp.path())];
		let found = Discovery::new().extensions(["x"]).discover(&[], &roots).unwrap();

		assert_eq!(found, ids(&["mod"]));
	}

	#[test]
	fn declared_only_returns_exactly_the_declared_set() {
		let tmp = TempDir::new().unwrap();
		touch(tmp.path(), "present.clj");

		let roots = [SourceRoot::required(tmp.path())];
		let explicit = ids(&["forced.one", "forced.two"]);
		let found = Discovery::new().declared_only(true).discover(&explicit, &roots).unwrap();

		assert_eq!(found, explicit);
	}

	#[test]
	fn declared_only_with_empty_list_still_scans() {
		let tmp = TempDir::new().unwrap();
		touch(tmp.path(), "present.clj");

		let roots = [SourceRoot::required(tmp.path())];
		let found = Discovery::new().declared_only(true).discover(&[], &roots).unwrap();

		assert_eq!(found, ids(&["present"]));
	}

	#[test]
	fn union_appends_explicit_entries_missing_from_scan() {
		let tmp = TempDir::new().unwrap();
		touch(tmp.path(), "scanned.clj");

		let roots = [SourceRoot::required(tmp.path())];
		let explicit = ids(&["scanned", "outside.extra"]);
		let found = Discovery::new().discover(&explicit, &roots).unwrap();

		assert_eq!(found, ids(&["scanned", "outside.extra"]));
	}

	#[test]
	fn discovery_is_idempotent() {
		let tmp = TempDir::new().unwrap();
		touch(tmp.path(), "a/one.clj");
		touch(tmp.path(), "b/two.clj");

		let roots = [SourceRoot::required(tmp.path())];
		let explicit = ids(&["outside.extra"]);
		let discovery = Discovery::new();

		let first = discovery.discover(&explicit, &roots).unwrap();
		let second = discovery.discover(&explicit, &roots).unwrap();
		assert_eq!(first, second);
	}

	#[test]
	fn missing_required_root_fails() {
		let tmp = TempDir::new().unwrap();
		let roots = [SourceRoot::required(tmp.path().join("absent"))];

		let err = Discovery::new().discover(&[], &roots).unwrap_err();
		assert!(matches!(err, DiscoveryError::MissingRoot(_)));
	}

	#[test]
	fn missing_optional_root_is_skipped() {
		let tmp = TempDir::new().unwrap();
		touch(tmp.path(), "real/core.clj");

		let roots = [
			SourceRoot::optional(tmp.path().join("generated")),
			SourceRoot::required(tmp.path().join("real")),
		];
		let found = Discovery::new().discover(&[], &roots).unwrap();

		assert_eq!(found, ids(&["core"]));
	}

	#[test]
	fn require_declared_rejects_unknown_namespaces() {
		let tmp = TempDir::new().unwrap();
		touch(tmp.path(), "known.clj");

		let roots = [SourceRoot::required(tmp.path())];
		let discovery = Discovery::new().declared_only(true).require_declared(true);

		let ok = discovery.discover(&ids(&["known"]), &roots).unwrap();
		assert_eq!(ok, ids(&["known"]));

		let err = discovery.discover(&ids(&["known", "ghost"]), &roots).unwrap_err();
		assert!(matches!(err, DiscoveryError::UnresolvedNamespace(id) if id.as_str() == "ghost"));
	}

	#[test]
	fn duplicate_derivations_across_roots_are_kept() {
		let tmp = TempDir::new().unwrap();
		touch(tmp.path(), "a/core.clj");
		touch(tmp.path(), "b/core.clj");

		let roots = [
			SourceRoot::required(tmp.path().join("a")),
			SourceRoot::required(tmp.path().join("b")),
		];
		let found = Discovery::new().discover(&[], &roots).unwrap();

		assert_eq!(found, ids(&["core", "core"]));
	}
}
