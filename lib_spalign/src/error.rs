use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Identity threshold must be between 0 and 1.")]
    BadIdentityThreshold,

    #[error("Min query coverage out of range.")]
    QueryCoverageOutOfRange,

    #[error("Sequence accessor object not specified.")]
    SequenceAccessorNotSpecified,

    #[error("Spliced aligner object not specified.")]
    AlignerNotSpecified,

    #[error("Empty hit vector passed to the engine.")]
    EmptyHitVector,

    #[error("No hits left after filtering.")]
    NoHitsAfterFiltering,

    #[error("No hits left beyond the poly-A tail.")]
    NoHitsBeyondPolyA,

    #[error("No alignment found.")]
    NoAlignment,

    #[error("No exons found above the identity limit.")]
    NoExonsAboveIdtyLimit,

    #[error("Invalid range data.")]
    InvalidRange,

    #[error("{0}")]
    InvalidPatternCoordinates(&'static str),

    #[error("Unknown symbol in transcript: {0}")]
    UnknownTranscriptSymbol(char),

    #[error("Could not find sequence {0}.")]
    SequenceNotFound(String),

    #[error("Serialized buffer data is incomplete.")]
    SerializationIncomplete,

    #[error(transparent)]
    Filter(hit_filter::Error),
}

impl From<hit_filter::Error> for Error {
    fn from(value: hit_filter::Error) -> Self {
        match value {
            hit_filter::Error::NoHits | hit_filter::Error::NoHitsAfterFiltering => {
                Error::NoHitsAfterFiltering
            }
            other => Error::Filter(other),
        }
    }
}
