//! Flow Aligner
//!
//! Stacks each flow's feature row across the last `capacity` frames,
//! zero-filling the slots where the flow was not active.

use std::collections::{HashMap, VecDeque};

use ndarray::{s, Array2, Array3, ArrayView1};

use super::index_flows;
use crate::logic::error::{EnvError, EnvResult};
use crate::logic::telemetry::{FlowId, StateSnapshot};

// ============================================================================
// FRAME
// ============================================================================

/// One captured state: flows paired 1:1 with feature rows
#[derive(Debug, Clone)]
pub struct Frame {
    index: HashMap<FlowId, usize>,
    features: Array2<f32>,
}

impl Frame {
    /// Build a frame, checking every row has `frame_size` columns
    pub fn new(flows: Vec<FlowId>, rows: &[Vec<f32>], frame_size: usize) -> EnvResult<Self> {
        if flows.len() != rows.len() {
            return Err(EnvError::Shape(format!(
                "{} flows but {} feature rows",
                flows.len(),
                rows.len()
            )));
        }

        let mut data = Vec::with_capacity(rows.len() * frame_size);
        for (flow, row) in flows.iter().zip(rows) {
            if row.len() != frame_size {
                return Err(EnvError::Shape(format!(
                    "flow '{}' has {} features, expected {}",
                    flow,
                    row.len(),
                    frame_size
                )));
            }
            data.extend_from_slice(row);
        }

        let features = Array2::from_shape_vec((flows.len(), frame_size), data)
            .map_err(|e| EnvError::Shape(e.to_string()))?;

        Ok(Self {
            index: index_flows(&flows),
            features,
        })
    }

    pub fn from_snapshot(snapshot: &StateSnapshot, frame_size: usize) -> EnvResult<Self> {
        Self::new(snapshot.flows.clone(), &snapshot.flow_features, frame_size)
    }

    /// Raw `[flows, frame_size]` feature matrix
    pub fn features(&self) -> &Array2<f32> {
        &self.features
    }

    /// Feature row of `flow`, if it is active in this frame
    pub fn row(&self, flow: &str) -> Option<ArrayView1<'_, f32>> {
        self.index.get(flow).map(|&k| self.features.row(k))
    }
}

// ============================================================================
// STACK WINDOW
// ============================================================================

/// FIFO of the most recent frames
#[derive(Debug, Clone)]
pub struct StackWindow {
    capacity: usize,
    frame_size: usize,
    frames: VecDeque<Frame>,
}

impl StackWindow {
    pub fn new(capacity: usize, frame_size: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            frame_size,
            frames: VecDeque::with_capacity(capacity),
        }
    }

    /// Number of frames currently held
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Append a frame, evicting the oldest when full
    pub fn push(&mut self, frame: Frame) -> EnvResult<()> {
        if frame.features.ncols() != self.frame_size {
            return Err(EnvError::Shape(format!(
                "frame has {} features, window expects {}",
                frame.features.ncols(),
                self.frame_size
            )));
        }
        while self.frames.len() >= self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Align `query` flows across the window
    ///
    /// Output is `[query.len(), capacity, frame_size]`. Slot `j` holds the
    /// `j`-th held frame, oldest first; slots past the newest held frame and
    /// slots where a flow is absent stay zero.
    pub fn align(&self, query: &[FlowId]) -> Array3<f32> {
        let mut stacked = Array3::<f32>::zeros((query.len(), self.capacity, self.frame_size));

        for (j, frame) in self.frames.iter().enumerate() {
            for (i, flow) in query.iter().enumerate() {
                if let Some(row) = frame.row(flow) {
                    stacked.slice_mut(s![i, j, ..]).assign(&row);
                }
            }
        }

        stacked
    }
}
