//! Hierarchical Performance Measurement
//!
//! # FLUSH INVARIANT
//! Exactly one sink emission happens per root scope, regardless of nesting
//! depth or child count. Children never talk to the sink; they roll their
//! serialized output into the parent's buffer when they close.
//!
//! # FLATTENING INVARIANT
//! The emitted payload is a flat JSON array of objects, one per scope in
//! the tree, in close order. Tree structure is recoverable only through
//! `OperationId`/`ParentOperationId` correlation, never through nesting.
//!
//! # MODE INVARIANT
//! A scope is live or inert, decided once when the tracker creates it.
//! Children inherit the parent's mode structurally; the enablement
//! predicate is never re-consulted mid-tree.

pub mod measure;
pub mod record;
pub mod sink;
pub mod tracker;

pub use measure::{MeasureError, Measurement};
pub use sink::{Collector, MemoryCollector, TracingCollector};
pub use tracker::Tracker;
