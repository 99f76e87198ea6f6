use thiserror::Error;

#[derive(Error, Debug)]
pub enum IzumiError {
    #[error("Empty manifest")]
    EmptyManifest,

    #[error("Invalid manifest XML: {0}")]
    InvalidXml(String),

    #[error("Expected exactly one Period, found {0}")]
    InvalidPeriodCount(usize),

    #[error("SegmentBase requires a resolvable BaseURL")]
    NoBaseUrl,

    #[error("SegmentList requires exactly one of @duration or SegmentTimeline")]
    MissingSegmentTiming,

    #[error("Unsupported UTCTiming scheme: {0}")]
    UnsupportedUtcTimingScheme(String),
}

pub type IzumiResult<T> = Result<T, IzumiError>;
