use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use super::record::{Record, LOG_TYPE};
use super::sink::Collector;

#[derive(Debug, Error)]
pub enum MeasureError {
    #[error("failed to render measurement record: {0}")]
    Render(#[from] serde_json::Error),
    #[error("sink rejected measurement payload: {0}")]
    Sink(#[source] anyhow::Error),
}

type PayloadBuffer = Arc<Mutex<Vec<String>>>;

/// Where a scope's serialized output goes when it closes.
enum Upstream {
    /// Roots own the single sink emission for their whole subtree.
    Root {
        sink: Arc<dyn Collector>,
        type_name: String,
    },
    /// Children roll their joined buffer into the parent's buffer.
    Child {
        parent_payloads: PayloadBuffer,
        parent_id: String,
    },
}

struct Active {
    operation_name: String,
    operation_id: String,
    upstream: Upstream,
    start: Instant,
    values: Vec<(String, String, i64)>,
    properties: IndexMap<String, String>,
    flags: IndexMap<String, bool>,
    payloads: PayloadBuffer,
    closed: bool,
}

/// One timed unit of work.
///
/// Open scopes accumulate facts and child payloads. Closing records the
/// elapsed time, serializes the scope to one flat JSON object, and either
/// emits the joined subtree to the sink (roots) or appends it to the
/// parent's buffer (children). Closure runs on every exit path: `close`
/// consumes the scope and surfaces sink errors, `Drop` covers the rest.
///
/// An inert measurement (disabled tracker) has the same surface and does
/// nothing. Facts are recorded through `&mut self`; sibling subtrees may
/// close from different threads, the payload buffer append is locked.
pub struct Measurement {
    inner: Option<Active>,
}

impl Measurement {
    pub(crate) fn root(operation_name: &str, type_name: &str, sink: Arc<dyn Collector>) -> Self {
        Self::open(
            operation_name,
            Upstream::Root {
                sink,
                type_name: type_name.to_string(),
            },
        )
    }

    pub(crate) fn inert() -> Self {
        Self { inner: None }
    }

    fn open(operation_name: &str, upstream: Upstream) -> Self {
        Self {
            inner: Some(Active {
                operation_name: operation_name.to_string(),
                operation_id: Uuid::new_v4().to_string(),
                upstream,
                start: Instant::now(),
                values: Vec::new(),
                properties: IndexMap::new(),
                flags: IndexMap::new(),
                payloads: Arc::new(Mutex::new(Vec::new())),
                closed: false,
            }),
        }
    }

    /// Opens a nested scope under this one.
    ///
    /// The child runs its own clock and does not touch this scope until it
    /// closes, at which point its joined output lands in this scope's
    /// buffer. Children of an inert measurement are inert.
    pub fn child(&self, operation_name: &str) -> Measurement {
        match &self.inner {
            Some(active) => Self::open(
                operation_name,
                Upstream::Child {
                    parent_payloads: Arc::clone(&active.payloads),
                    parent_id: active.operation_id.clone(),
                },
            ),
            None => Self::inert(),
        }
    }

    /// Records a numeric fact. Repeated names are all retained and render
    /// as repeated keys.
    pub fn add_value(&mut self, name: &str, unit: &str, value: i64) {
        if let Some(active) = &mut self.inner {
            active
                .values
                .push((name.to_string(), unit.to_string(), value));
        }
    }

    /// Records a string fact. Last write per key wins.
    pub fn set_property(&mut self, key: &str, value: &str) {
        if let Some(active) = &mut self.inner {
            active.properties.insert(key.to_string(), value.to_string());
        }
    }

    /// Records a bool fact. Last write per key wins; the namespace is
    /// separate from string facts.
    pub fn set_flag(&mut self, key: &str, value: bool) {
        if let Some(active) = &mut self.inner {
            active.flags.insert(key.to_string(), value);
        }
    }

    /// Opaque correlation id, `None` when the scope is inert.
    pub fn operation_id(&self) -> Option<&str> {
        self.inner.as_ref().map(|active| active.operation_id.as_str())
    }

    /// Closes the scope and surfaces sink errors to the caller.
    ///
    /// Dropping without calling this still closes the scope; a sink error
    /// on the drop path is logged instead of propagated.
    pub fn close(mut self) -> Result<(), MeasureError> {
        self.finish()
    }

    fn finish(&mut self) -> Result<(), MeasureError> {
        let Some(active) = self.inner.as_mut() else {
            return Ok(());
        };
        if active.closed {
            return Ok(());
        }
        active.closed = true;

        let elapsed_ms = active.start.elapsed().as_millis() as i64;
        active
            .values
            .push(("Elapsed".to_string(), "ms".to_string(), elapsed_ms));

        let record = active.to_record().render()?;
        // Own record goes in last, after every descendant that already
        // rolled up into this buffer.
        let joined = {
            let mut payloads = lock(&active.payloads);
            payloads.push(record);
            payloads.join(",")
        };

        match &active.upstream {
            Upstream::Root { sink, type_name } => {
                let payload = format!("[{}]", joined);
                info!(
                    "Emitting measurement batch '{}' ({} bytes)",
                    active.operation_name,
                    payload.len()
                );
                sink.collect(type_name, &payload).map_err(MeasureError::Sink)?;
            }
            Upstream::Child {
                parent_payloads,
                parent_id,
            } => {
                debug!(
                    "Rolling '{}' up into parent {}",
                    active.operation_name, parent_id
                );
                lock(parent_payloads).push(joined);
            }
        }

        Ok(())
    }
}

impl Active {
    /// Flat object layout: headers, then numeric facts (value, unit),
    /// then string facts, then bool facts.
    fn to_record(&self) -> Record {
        let mut record = Record::with_capacity(
            4 + self.values.len() * 2 + self.properties.len() + self.flags.len(),
        );
        record.push_text("OperationName", &self.operation_name);
        record.push_text("OperationId", &self.operation_id);
        record.push_text("LogType", LOG_TYPE);
        if let Upstream::Child { parent_id, .. } = &self.upstream {
            record.push_text("ParentOperationId", parent_id);
        }
        for (name, unit, value) in &self.values {
            record.push_number(name, *value);
            record.push_text(&format!("{}_unit", name), unit);
        }
        for (key, value) in &self.properties {
            record.push_text(key, value);
        }
        for (key, value) in &self.flags {
            record.push_flag(key, *value);
        }
        record
    }
}

impl Drop for Measurement {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            tracing::warn!("Measurement closure failed during drop: {}", e);
        }
    }
}

fn lock(buffer: &PayloadBuffer) -> MutexGuard<'_, Vec<String>> {
    buffer.lock().unwrap_or_else(PoisonError::into_inner)
}
