pub mod config;
pub mod error;
pub mod normalize;
pub mod storage;
pub mod text;
pub mod types;

pub use error::{Error, Result};
pub use config::{Config, SelectorStrategy, SourceConfig, SourceKind, StorageKind};
pub use normalize::{normalize, SourceContext};
pub use storage::ContentStorage;
pub use types::{ComplexityTier, ContentQuery, ContentRecord, ContentType, RawItem};

pub mod prelude {
    pub use super::{ContentQuery, ContentRecord, ContentStorage, ContentType, Error, RawItem, Result};
}
