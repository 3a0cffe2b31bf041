//! Manifest loading and schema validation.
//!
//! `loader` turns text into a `RawManifest`; `schema` turns a `RawManifest`
//! into a typed `ValidatedManifest`. Neither touches persistence.

pub mod coerce;
pub mod loader;
pub mod schema;

pub use loader::{ManifestFormat, RawManifest, load};
pub use schema::{ManifestSchema, SchemaValidator, ValidatedManifest};
