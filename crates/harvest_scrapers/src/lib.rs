pub mod extractors;
pub mod fetcher;
pub mod logging;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod test_utils;

pub use extractors::{build_extractors, Extract, Extractor};
pub use fetcher::{FetchProfile, Fetcher, HttpFetcher};
pub use logging::{init_logging, Logger};
pub use pipeline::{Pipeline, RunSummary, SourceError, Stage};

pub mod prelude {
    pub use super::extractors::{build_extractors, Extractor};
    pub use super::pipeline::{Pipeline, RunSummary};
    pub use harvest_core::{RawItem, Result, Error};
}
