pub mod version_validator;

pub use version_validator::{VersionResolver, validate_version};
