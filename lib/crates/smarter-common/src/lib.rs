pub mod kinds;
pub mod manifest;
pub mod types;

pub use manifest::{API_VERSION, Kind, ManifestDocument, ManifestStatus, Metadata, UnknownKind};
pub use types::*;
