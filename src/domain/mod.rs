pub mod analysis;
pub mod summary;

pub use analysis::{AnalysisResult, ScoreBand, VerdictTier};
pub use summary::{HeadingLevel, ImageAlt, LoadSpeedIndicator, PageSummary};
