pub mod aggregate;
pub mod normalizer;
pub mod timeframe;

pub use aggregate::{aggregate, AggregationConfig, Verdict};
pub use normalizer::{normalize_answer, SignalContribution};
pub use timeframe::score_timeframe;
