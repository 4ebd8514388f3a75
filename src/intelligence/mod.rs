pub mod aggregator;
pub mod scorer;

pub use aggregator::{ActivityMetricsSource, MetricsSource, OnChainMetricsSource};
pub use scorer::{bounded_saturation_score, linear_clamped_score, ScoringStrategy};
