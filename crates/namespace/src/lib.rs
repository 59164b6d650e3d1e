//! Namespace discovery over configured source roots.
//!
//! Walks ordered source-root directories, converts relative paths of
//! compilable-unit files into dotted namespace identifiers, and reconciles
//! the scanned set against an optional explicit include list.

mod discovery;
mod namespace;
mod roots;

pub use discovery::{Discovery, DiscoveryError};
pub use namespace::NamespaceId;
pub use roots::{SourceLayout, SourceRoot, SourceRootKind};
