pub mod telemetry;

// Re-export the core surface for convenient access
pub use telemetry::measure::{MeasureError, Measurement};
pub use telemetry::sink::{Collector, MemoryCollector, TracingCollector};
pub use telemetry::tracker::Tracker;
