use std::env;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// Ordered classpath for one invocation.
///
/// Order is resolution precedence; entries are not deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClasspathSpec {
	entries: Vec<PathBuf>,
}

impl ClasspathSpec {
	/// Creates an empty classpath.
	pub fn new() -> Self {
		Self::default()
	}

	/// Assembles the conventional compile classpath: dependency elements,
	/// then source roots, then the output directory.
	pub fn assemble<D, S>(dependencies: D, source_roots: S, output_dir: impl Into<PathBuf>) -> Self
	where
		D: IntoIterator,
		D::Item: Into<PathBuf>,
		S: IntoIterator,
		S::Item: Into<PathBuf>,
	{
		let mut classpath = Self::new();
		classpath.entries.extend(dependencies.into_iter().map(Into::into));
		classpath.entries.extend(source_roots.into_iter().map(Into::into));
		classpath.entries.push(output_dir.into());
		classpath
	}

	/// Appends one entry, builder style.
	#[must_use]
	pub fn entry(mut self, path: impl Into<PathBuf>) -> Self {
		self.entries.push(path.into());
		self
	}

	/// Appends one entry.
	pub fn push(&mut self, path: impl Into<PathBuf>) {
		self.entries.push(path.into());
	}

	/// Entries in precedence order.
	pub fn entries(&self) -> &[PathBuf] {
		&self.entries
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Whether the classpath has no entries.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Renders the classpath as one platform search-path string, the form
	/// an invoked compiler expects as a single argument.
	pub fn to_search_path(&self) -> Result<OsString, env::JoinPathsError> {
		env::join_paths(&self.entries)
	}
}

impl fmt::Display for ClasspathSpec {
	/// Diagnostic rendering only; use [`ClasspathSpec::to_search_path`] for
	/// anything handed to an entry point.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut first = true;
		for entry in &self.entries {
			if !first {
				f.write_str(":")?;
			}
			write!(f, "{}", entry.display())?;
			first = false;
		}
		Ok(())
	}
}

/// Dotted qualified name of an entry point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName(String);

impl QualifiedName {
	/// Wraps a qualified name.
	pub fn new(name: impl Into<String>) -> Self {
		Self(name.into())
	}

	/// Name as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// C symbol the dylib resolver looks up: `.` and `-` map to `_`.
	pub fn symbol_name(&self) -> String {
		self.0
			.chars()
			.map(|c| if c == '.' || c == '-' { '_' } else { c })
			.collect()
	}
}

impl fmt::Display for QualifiedName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for QualifiedName {
	fn from(name: &str) -> Self {
		Self(name.to_string())
	}
}

impl From<String> for QualifiedName {
	fn from(name: String) -> Self {
		Self(name)
	}
}

/// One immutable invocation of a compiler entry point.
///
/// Built by value; owned by the engine for the duration of one invocation.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
	entry_point: QualifiedName,
	args: Vec<String>,
	classpath: ClasspathSpec,
	output_dir: PathBuf,
}

impl InvocationRequest {
	/// Creates a request for the given entry point and output directory.
	pub fn new(entry_point: impl Into<QualifiedName>, output_dir: impl Into<PathBuf>) -> Self {
		Self {
			entry_point: entry_point.into(),
			args: Vec::new(),
			classpath: ClasspathSpec::new(),
			output_dir: output_dir.into(),
		}
	}

	/// Appends one argument.
	#[must_use]
	pub fn arg(mut self, arg: impl Into<String>) -> Self {
		self.args.push(arg.into());
		self
	}

	/// Appends arguments.
	#[must_use]
	pub fn args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.args.extend(args.into_iter().map(Into::into));
		self
	}

	/// Sets the classpath.
	#[must_use]
	pub fn classpath(mut self, classpath: ClasspathSpec) -> Self {
		self.classpath = classpath;
		self
	}

	/// Entry-point name.
	pub fn entry_point(&self) -> &QualifiedName {
		&self.entry_point
	}

	/// Argument vector.
	pub fn arg_list(&self) -> &[String] {
		&self.args
	}

	/// Classpath as supplied by the caller (the engine appends the output
	/// directory itself).
	pub fn classpath_spec(&self) -> &ClasspathSpec {
		&self.classpath
	}

	/// Output directory; created by the engine before invocation.
	pub fn output_dir(&self) -> &Path {
		&self.output_dir
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn assemble_orders_deps_then_roots_then_output() {
		let classpath = ClasspathSpec::assemble(["dep.so"], ["src/main"], "target/classes");
		let entries: Vec<_> = classpath.entries().iter().map(|entry| entry.display().to_string()).collect();
		assert_eq!(entries, vec!["dep.so", "src/main", "target/classes"]);
	}

	#[test]
	fn entries_are_not_deduplicated() {
		let classpath = ClasspathSpec::new().entry("a").entry("b").entry("a");
		assert_eq!(classpath.len(), 3);
	}

	#[test]
	fn search_path_preserves_order() {
		let classpath = ClasspathSpec::new().entry("one").entry("two");
		let rendered = classpath.to_search_path().unwrap();
		let parts: Vec<_> = env::split_paths(&rendered).collect();
		assert_eq!(parts, vec![PathBuf::from("one"), PathBuf::from("two")]);
	}

	#[test]
	fn symbol_name_maps_dots_and_dashes() {
		let name = QualifiedName::from("my-lang.compiler.main");
		assert_eq!(name.symbol_name(), "my_lang_compiler_main");
	}

	#[test]
	fn request_builder_accumulates_args() {
		let request = InvocationRequest::new("compiler.main", "out")
			.arg("first")
			.args(["second", "third"]);
		assert_eq!(request.arg_list(), ["first", "second", "third"]);
		assert_eq!(request.entry_point().as_str(), "compiler.main");
	}
}
