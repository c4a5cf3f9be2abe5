//! Explicit model wiring with construction-time cycle validation.
//!
//! Models observing other models form a directed graph. [`ModelGraph`]
//! records every derived-from edge as it is wired and refuses an edge that
//! would close a loop, so a cyclic dependency is caught where it is
//! created instead of at notification time. The runtime re-entrancy guard
//! in [`crate::observe`] remains as the backstop for wiring that bypasses
//! the graph.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::derive::InverseLaw;
use crate::measure::{BoundedMeasure, ModelId, UnboundedMeasure};
use crate::observe::ListenerFault;

/// Wiring rejected at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    /// The requested edge would let a model's notifications loop back to
    /// itself.
    Cycle {
        /// Model being observed.
        source: ModelId,
        /// Model that would recompute from it.
        derived: ModelId,
    },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cycle { source, derived } => write!(
                f,
                "wiring {source:?} -> {derived:?} would create a notification cycle"
            ),
        }
    }
}

impl std::error::Error for WireError {}

/// Directed derived-from edges between measure models.
#[derive(Debug, Default)]
pub struct ModelGraph {
    edges: FxHashMap<ModelId, Vec<ModelId>>,
}

impl ModelGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `derived` recomputes from `source`, refusing the edge if
    /// it would close a loop.
    pub fn add_edge(&mut self, source: ModelId, derived: ModelId) -> Result<(), WireError> {
        if self.would_cycle(source, derived) {
            return Err(WireError::Cycle { source, derived });
        }
        self.edges.entry(source).or_default().push(derived);
        Ok(())
    }

    /// True when an edge `source -> derived` would close a loop, i.e. when
    /// `source` is already reachable from `derived`.
    fn would_cycle(&self, source: ModelId, derived: ModelId) -> bool {
        if source == derived {
            return true;
        }
        let mut stack = vec![derived];
        let mut seen = FxHashSet::default();
        while let Some(node) = stack.pop() {
            if node == source {
                return true;
            }
            if seen.insert(node) {
                if let Some(next) = self.edges.get(&node) {
                    stack.extend(next);
                }
            }
        }
        false
    }

    /// Wire `derived` to recompute through `law` every time `source`
    /// notifies. The recomputation calls the derived model's own setter,
    /// which cascades to the derived model's observers in turn.
    ///
    /// A source that has never been assigned is skipped with a
    /// [`ListenerFault::SourceUnset`] rather than treated as zero.
    pub fn link_inverse(
        &mut self,
        source: &BoundedMeasure,
        derived: &UnboundedMeasure,
        law: InverseLaw,
    ) -> Result<(), WireError> {
        self.add_edge(source.id(), derived.id())?;

        let src = source.clone();
        let dst = derived.clone();
        source.add_observer("inverse-derivation", move || {
            let value = src.measurement().ok_or_else(|| ListenerFault::SourceUnset {
                listener: "inverse-derivation".into(),
            })?;
            dst.set_measurement(law.sample(value, dst.precision()));
            Ok(())
        });
        debug!(source = ?source.id(), derived = ?derived.id(), "inverse derivation wired");
        Ok(())
    }
}
