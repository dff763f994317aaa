//! Library value types
//!
//! Identities name a concrete library, ranges name a request for one.

pub mod framework;
pub mod identity;
pub mod range;
pub mod version;

pub use framework::Framework;
pub use identity::{name_key, same_name, LibraryIdentity, LibraryType};
pub use range::{LibraryDependency, LibraryDependencyTarget, LibraryRange, ReferenceType};
pub use version::{FloatBehavior, FloatRange, SemanticVersion, VersionRange};
