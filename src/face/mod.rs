pub mod matching;
pub mod similarity;
pub mod summary;

pub use matching::{rank, Candidate, Match, MatchResult, MATCH_THRESHOLD};
pub use similarity::score;
pub use summary::{normalize, resolve, FeatureSummary, RawFeatureSummary, SummaryError};

pub const MALE: &str = "남성";
pub const FEMALE: &str = "여성";
pub const UNCLEAR: &str = "불명확";

pub const ANGULAR_CONTOUR: &str = "각진 형태";
pub const ROUND_CONTOUR: &str = "둥근 형태";
