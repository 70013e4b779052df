pub mod bus_metrics;
pub mod pipeline_metrics;

pub use bus_metrics::BusMetrics;
pub use pipeline_metrics::PipelineMetrics;
