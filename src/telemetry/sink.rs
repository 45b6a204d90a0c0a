use std::sync::{Mutex, PoisonError};

use anyhow::Result;
use tracing::info;

/// Receiver of finished measurement payloads.
///
/// `collect` is invoked at most once per root scope. `payload` is a JSON
/// array of flattened objects; `type_name` is the routing label of the
/// tracker that created the root. Failures propagate to the caller of
/// `Measurement::close`; the core never retries.
pub trait Collector: Send + Sync {
    fn collect(&self, type_name: &str, payload: &str) -> Result<()>;
}

/// Ships payloads to the active `tracing` subscriber.
pub struct TracingCollector;

impl Collector for TracingCollector {
    fn collect(&self, type_name: &str, payload: &str) -> Result<()> {
        info!("[{}] {}", type_name, payload);
        Ok(())
    }
}

/// Buffers (type_name, payload) pairs in memory. Test double.
#[derive(Debug, Default)]
pub struct MemoryCollector {
    batches: Mutex<Vec<(String, String)>>,
}

impl MemoryCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything collected so far, in arrival order.
    pub fn batches(&self) -> Vec<(String, String)> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Collector for MemoryCollector {
    fn collect(&self, type_name: &str, payload: &str) -> Result<()> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((type_name.to_string(), payload.to_string()));
        Ok(())
    }
}
