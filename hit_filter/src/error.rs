use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Empty hit vector passed to the filter.")]
    NoHits,

    #[error("No hits left after filtering.")]
    NoHitsAfterFiltering,

    #[error("Same-order filtering is incompatible with mixed-strand input.")]
    IncompatibleStrandPolicy,
}
