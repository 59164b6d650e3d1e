use std::fmt;
use std::path::{Component, Path};

/// Dotted identifier of one compilable source unit.
///
/// Derived from a unit's root-relative path: directory separators map to
/// `.`, the file extension is stripped. Uniqueness across roots is not
/// enforced here; callers tolerate or de-duplicate as needed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespaceId(String);

impl NamespaceId {
	/// Wraps an already-derived identifier.
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// Derives an identifier from a path relative to its source root.
	///
	/// Returns `None` for paths with non-plain components (`..`, prefixes),
	/// non-UTF-8 segments, or no nameable stem.
	pub fn from_relative_path(relative: &Path) -> Option<Self> {
		let mut segments: Vec<&str> = Vec::new();
		for component in relative.components() {
			let Component::Normal(part) = component else {
				return None;
			};
			segments.push(part.to_str()?);
		}

		let file = segments.pop()?;
		let stem = Path::new(file).file_stem()?.to_str()?;
		if stem.is_empty() {
			return None;
		}
		segments.push(stem);

		Some(Self(segments.join(".")))
	}

	/// Identifier as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for NamespaceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for NamespaceId {
	fn from(id: &str) -> Self {
		Self(id.to_string())
	}
}

impl From<String> for NamespaceId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn derives_from_flat_file() {
		let id = NamespaceId::from_relative_path(Path::new("foo.clj")).unwrap();
		assert_eq!(id.as_str(), "foo");
	}

	#[test]
	fn maps_separators_to_dots() {
		let id = NamespaceId::from_relative_path(Path::new("bar/baz/core.clj")).unwrap();
		assert_eq!(id.as_str(), "bar.baz.core");
	}

	#[test]
	fn keeps_inner_dots_in_stem() {
		let id = NamespaceId::from_relative_path(Path::new("a/b.c.clj")).unwrap();
		assert_eq!(id.as_str(), "a.b.c");
	}

	#[test]
	fn rejects_parent_components() {
		assert!(NamespaceId::from_relative_path(Path::new("../escape.clj")).is_none());
	}

	#[test]
	fn rejects_empty_path() {
		assert!(NamespaceId::from_relative_path(Path::new("")).is_none());
	}
}
