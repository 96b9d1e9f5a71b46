pub mod agg;
pub mod key;
pub mod metrics;
pub mod registry;
pub mod tags;

pub use agg::Query;
pub use key::KeyId;
pub use metrics::{
    HistogramSummary, MetricHandle, MetricKind, MetricSeriesSummary, MetricValue, Sample,
};
pub use registry::{MetricId, Registry};
pub use tags::TagSet;
