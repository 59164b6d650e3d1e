use std::path::{Path, PathBuf};

/// One directory designated as a root of compilable sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRoot {
	path: PathBuf,
	optional: bool,
}

impl SourceRoot {
	/// A root that must exist; discovery fails when it is missing.
	pub fn required(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			optional: false,
		}
	}

	/// A root that is skipped when missing (e.g. a generated-sources dir
	/// before anything has been generated).
	pub fn optional(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			optional: true,
		}
	}

	/// Root directory path.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Whether a missing root is tolerated.
	pub fn is_optional(&self) -> bool {
		self.optional
	}
}

/// Purpose of a source-root group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceRootKind {
	/// Hand-written and generated compile sources.
	Compile,
	/// Test sources.
	Test,
}

/// Host-supplied source directory wiring for one project.
///
/// Ordering is significant: the generated-sources directory always precedes
/// hand-written compile roots, so generated code can shadow or supplement
/// hand-written code on the classpath.
#[derive(Debug, Clone, Default)]
pub struct SourceLayout {
	generated_dir: Option<PathBuf>,
	compile_dirs: Vec<PathBuf>,
	base_test_dir: Option<PathBuf>,
	test_dirs: Vec<PathBuf>,
}

impl SourceLayout {
	/// Creates an empty layout.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the generated-sources directory (searched first for compile).
	#[must_use]
	pub fn generated_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.generated_dir = Some(dir.into());
		self
	}

	/// Appends one hand-written compile source directory.
	#[must_use]
	pub fn compile_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.compile_dirs.push(dir.into());
		self
	}

	/// Sets the base test source directory (searched first for test).
	#[must_use]
	pub fn base_test_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.base_test_dir = Some(dir.into());
		self
	}

	/// Appends one extra test source directory.
	#[must_use]
	pub fn test_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.test_dirs.push(dir.into());
		self
	}

	/// Roots for the requested kinds, concatenated in the order given.
	///
	/// The generated directory is an optional root; everything else is
	/// required.
	pub fn roots(&self, kinds: &[SourceRootKind]) -> Vec<SourceRoot> {
		let mut roots = Vec::new();
		for kind in kinds {
			match kind {
				SourceRootKind::Compile => {
					if let Some(generated) = &self.generated_dir {
						roots.push(SourceRoot::optional(generated));
					}
					roots.extend(self.compile_dirs.iter().map(SourceRoot::required));
				}
				SourceRootKind::Test => {
					if let Some(base) = &self.base_test_dir {
						roots.push(SourceRoot::required(base));
					}
					roots.extend(self.test_dirs.iter().map(SourceRoot::required));
				}
			}
		}
		roots
	}

	/// Compile roots: generated sources first, then hand-written roots.
	pub fn compile_roots(&self) -> Vec<SourceRoot> {
		self.roots(&[SourceRootKind::Compile])
	}

	/// Test roots: base test root first, then extra test roots.
	pub fn test_roots(&self) -> Vec<SourceRoot> {
		self.roots(&[SourceRootKind::Test])
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn generated_sources_come_first() {
		let layout = SourceLayout::new()
			.compile_dir("src/main")
			.generated_dir("target/generated");

		let roots = layout.compile_roots();
		assert_eq!(roots[0], SourceRoot::optional("target/generated"));
		assert_eq!(roots[1], SourceRoot::required("src/main"));
	}

	#[test]
	fn kinds_concatenate_in_request_order() {
		let layout = SourceLayout::new()
			.compile_dir("src/main")
			.base_test_dir("src/test")
			.test_dir("src/extra-test");

		let roots = layout.roots(&[SourceRootKind::Test, SourceRootKind::Compile]);
		let paths: Vec<_> = roots.iter().map(|root| root.path().to_path_buf()).collect();
		assert_eq!(
			paths,
			vec![
				PathBuf::from("src/test"),
				PathBuf::from("src/extra-test"),
				PathBuf::from("src/main"),
			]
		);
	}
}
