//! Stacking Module - Temporal Frame Alignment
//!
//! Turns a backend whose flow set changes identity and cardinality every
//! step into fixed-shape tensors.
//!
//! # Architecture
//! - `aligner.rs`: `Frame`, `StackWindow` (feature stacking per flow)
//! - `aggregator.rs`: `ScoreRecord`, `ScoreWindow` (time-smoothed rewards)
//!
//! Both windows index flows explicitly per frame, so output never depends on
//! hash iteration order.

pub mod aligner;
pub mod aggregator;

pub use aligner::{Frame, StackWindow};
pub use aggregator::{Rewards, ScoreRecord, ScoreWindow};

use std::collections::HashMap;

use crate::logic::telemetry::FlowId;

/// Position of each flow in a frame (first occurrence wins)
pub(crate) fn index_flows(flows: &[FlowId]) -> HashMap<FlowId, usize> {
    let mut index = HashMap::with_capacity(flows.len());
    for (position, flow) in flows.iter().enumerate() {
        index.entry(flow.clone()).or_insert(position);
    }
    index
}
