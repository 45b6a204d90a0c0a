use std::sync::Arc;

use super::measure::Measurement;
use super::sink::Collector;

/// Factory for measurement scopes.
///
/// Holds the sink handle, the sink-routing label, and the enablement
/// predicate. Stateless beyond that: trackers create measurements and
/// never store them.
pub struct Tracker {
    type_name: String,
    sink: Arc<dyn Collector>,
    enabled: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl Tracker {
    /// Always-enabled tracker.
    pub fn new(type_name: &str, sink: Arc<dyn Collector>) -> Self {
        Self::with_enablement(type_name, sink, || true)
    }

    /// The predicate runs exactly once per `track` call. A measurement's
    /// live/inert mode is fixed at its creation and inherited by children;
    /// later predicate flips only affect new roots.
    pub fn with_enablement(
        type_name: &str,
        sink: Arc<dyn Collector>,
        enabled: impl Fn() -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            type_name: type_name.to_string(),
            sink,
            enabled: Arc::new(enabled),
        }
    }

    /// Opens a root scope, or an inert one when tracking is disabled.
    pub fn track(&self, operation_name: &str) -> Measurement {
        if (self.enabled)() {
            Measurement::root(operation_name, &self.type_name, Arc::clone(&self.sink))
        } else {
            Measurement::inert()
        }
    }
}
