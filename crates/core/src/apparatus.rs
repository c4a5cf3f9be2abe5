//! Composition root for the syringe/gauge apparatus.
//!
//! Builds the two coupled models - bounded volume, unbounded pressure -
//! and wires pressure as the inverse-law derivation of volume. All wiring
//! is explicit construction: no globals, the caller owns the handles.
//!
//! The pure helpers at the bottom ([`needle_rotation`], [`ball_speed`])
//! are the consumer-side policies the frontend observers apply to a
//! reading. They matter here because they document how consumers degrade
//! on the unbounded sentinel: the gauge pegs its needle, the particle
//! animation falls back to a sane speed, and the core itself never clamps
//! on anyone's behalf.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::derive::InverseLaw;
use crate::measure::{BoundedMeasure, SetOutcome, UnboundedMeasure};
use crate::observe::CascadeReport;
use crate::wiring::{ModelGraph, WireError};

/// Highest mark on the gauge face (kPa).
pub const HIGHEST_MARK: f64 = 450.0;

/// Plunger position the apparatus starts from, as a fraction of the range.
pub const DEFAULT_PLUNGER_POSITION: f64 = 0.5;

/// Rotation (degrees) past which the needle pegs.
const NEEDLE_PEG: f64 = 145.0;

/// Tunables for one apparatus session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ApparatusConfig {
    /// Syringe capacity in cc.
    pub max_volume: f64,
    /// Display precision of the volume readout.
    pub volume_precision: u32,
    /// Display precision of the pressure readout.
    pub pressure_precision: u32,
    /// Boyle constant `c` in kPa*cc.
    pub constant: f64,
    /// Gauge noise fraction; must be a positive number (zero for exact).
    pub noise: f64,
}

impl Default for ApparatusConfig {
    fn default() -> Self {
        ApparatusConfig {
            max_volume: 20.0,
            volume_precision: 1,
            pressure_precision: 2,
            constant: 850.0,
            noise: 0.03,
        }
    }
}

/// One recorded `(volume, pressure)` sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRow {
    /// Volume reading in cc, stored raw.
    pub volume: f64,
    /// Pressure reading in kPa, stored raw.
    pub pressure: f64,
}

impl MeasurementRow {
    /// Two-decimal cells the way the data table renders them.
    pub fn display_cells(&self) -> (String, String) {
        (format!("{:.2}", self.volume), format!("{:.2}", self.pressure))
    }
}

/// In-memory session log of recorded samples; feeds the data table and the
/// scatter plot. Nothing persists past the session.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MeasurementLog {
    rows: Vec<MeasurementRow>,
}

impl MeasurementLog {
    /// Append one sample.
    pub fn push(&mut self, row: MeasurementRow) {
        self.rows.push(row);
    }

    /// All samples, in recording order.
    pub fn rows(&self) -> &[MeasurementRow] {
        &self.rows
    }

    /// Number of recorded samples.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when nothing was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The wired apparatus: volume drives pressure, both ready for observers.
pub struct Apparatus {
    volume: BoundedMeasure,
    pressure: UnboundedMeasure,
    graph: ModelGraph,
    log: RefCell<MeasurementLog>,
    config: ApparatusConfig,
}

impl Apparatus {
    /// Build and wire the models. The volume model spans
    /// `[0, max_volume]`; pressure is unbounded and recomputes from volume
    /// through the inverse law. Both stay unset until the first assignment
    /// (see [`prime`](Self::prime)).
    pub fn new(config: ApparatusConfig) -> Result<Self, WireError> {
        let volume = BoundedMeasure::named("volume", 0.0, config.max_volume, config.volume_precision);
        let pressure = UnboundedMeasure::named("pressure", config.pressure_precision);

        let mut graph = ModelGraph::new();
        graph.link_inverse(
            &volume,
            &pressure,
            InverseLaw::new(config.constant, config.noise),
        )?;

        info!(
            max_volume = config.max_volume,
            constant = config.constant,
            noise = config.noise,
            "apparatus wired"
        );
        Ok(Apparatus {
            volume,
            pressure,
            graph,
            log: RefCell::new(MeasurementLog::default()),
            config,
        })
    }

    /// Configuration the apparatus was built with.
    pub fn config(&self) -> &ApparatusConfig {
        &self.config
    }

    /// The volume model (plunger position), for observer registration.
    pub fn volume(&self) -> &BoundedMeasure {
        &self.volume
    }

    /// The pressure model (gauge reading), for observer registration.
    pub fn pressure(&self) -> &UnboundedMeasure {
        &self.pressure
    }

    /// The wiring graph, for adding further derived instruments. Edges
    /// added here keep the construction-time cycle check.
    pub fn graph_mut(&mut self) -> &mut ModelGraph {
        &mut self.graph
    }

    /// Move the plunger to its starting position and let the first
    /// readings cascade.
    pub fn prime(&self) -> SetOutcome {
        self.volume.set_by_percentage(DEFAULT_PLUNGER_POSITION)
    }

    /// Set the volume directly (numeric input field path).
    pub fn set_volume(&self, cc: f64) -> CascadeReport {
        self.volume.set_measurement(cc)
    }

    /// Set the volume as a fraction of the range (slider path).
    pub fn set_volume_percentage(&self, fraction: f64) -> SetOutcome {
        self.volume.set_by_percentage(fraction)
    }

    /// Set the volume from slider text such as `"50%"`.
    pub fn set_volume_percentage_str(&self, text: &str) -> SetOutcome {
        self.volume.set_by_percentage_str(text)
    }

    /// Record the current readings as one sample (the table-row /
    /// plot-point append that runs on plunger release). Returns `None`
    /// when either model is still unset.
    pub fn record(&self) -> Option<MeasurementRow> {
        let row = MeasurementRow {
            volume: self.volume.measurement()?,
            pressure: self.pressure.measurement()?,
        };
        self.log.borrow_mut().push(row);
        Some(row)
    }

    /// Snapshot of the session log.
    pub fn log(&self) -> MeasurementLog {
        self.log.borrow().clone()
    }
}

/// Gauge-needle rotation in degrees for a pressure reading.
///
/// Maps `[0, HIGHEST_MARK]` onto the 270-degree face starting at -135.
/// Past the face - including the unbounded sentinel - the needle pegs at
/// its mechanical stop. This is the consumer's own degradation policy; the
/// pressure model itself stores the sentinel verbatim.
pub fn needle_rotation(pressure: f64) -> f64 {
    let rotation = pressure / HIGHEST_MARK * 270.0 - 135.0;
    if rotation > NEEDLE_PEG {
        NEEDLE_PEG
    } else {
        rotation
    }
}

/// Particle speed for the air-ball animation at a pressure reading.
///
/// Runaway speeds (including the unbounded sentinel) fall back to the
/// default so the particles stay inside the chamber.
pub fn ball_speed(pressure: f64) -> f64 {
    let speed = 10.0 + 10.0 * pressure / 42.5;
    if speed < 100.0 {
        speed
    } else {
        25.0
    }
}
