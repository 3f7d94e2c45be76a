//! Feed ingestion: source descriptions, schema normalization and loading.

pub mod error;
pub mod loader;
pub mod normalize;
pub mod source;

pub use error::{FetchError, LoadError, NormalizeError};
pub use loader::{
    FileFetcher, LoadHandle, LoadRequest, LoadUpdate, SourceFetcher, load_blocking, spawn_load,
};
pub use normalize::{
    normalize, normalize_delimited, normalize_grid, normalize_hierarchical, normalize_key_value,
};
pub use source::{
    DEFAULT_CONTAINER, DEFAULT_PARAMETER_ATTRIBUTE, DEFAULT_PARAMETER_TAG, HierarchyLayout,
    Payload, Source, SourceFormat,
};
