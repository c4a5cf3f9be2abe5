//! Syringe Simulation Core Library
//!
//! Reactive core of an educational Boyle's-law demonstration: a virtual
//! syringe coupled to a pressure gauge, showing the inverse relationship
//! between two bounded physical quantities.
//!
//! The library is two layers, leaf first:
//!
//! - [`observe`]: an observable decorator turning mutations into ordered,
//!   synchronous notification cascades, with per-listener fault isolation
//!   and cycle refusal.
//! - [`measure`]: bounded, precision-tagged measurement models built on
//!   the decorator, with direct and percentage-of-range setters.
//!
//! On top of those, [`derive`] provides the inverse-law transform with
//! simulated gauge noise, [`wiring`] validates model-to-model links at
//! construction time, and [`apparatus`] is the composition root that
//! builds and wires a complete session. Rendering, DOM plumbing, and
//! charting live in the frontend; they only ever talk to these models
//! through observers and setters.

pub mod apparatus;
pub mod derive;
pub mod measure;
pub mod observe;
pub mod wiring;

// Re-export the main surface
pub use apparatus::{
    ball_speed, needle_rotation, Apparatus, ApparatusConfig, MeasurementLog, MeasurementRow,
    HIGHEST_MARK,
};
pub use derive::{round_to, InverseLaw};
pub use measure::{
    BoundedMeasure, MeasureBound, MeasureModel, ModelId, SetOutcome, UnboundedMeasure,
};
pub use observe::{CascadeReport, ListenerFault, Observable};
pub use wiring::{ModelGraph, WireError};

#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
