//! Bounded, precision-tagged measurement models.
//!
//! A measure model holds one physical scalar (volume in cc, pressure in
//! kPa). Its bounds are advisory metadata for the widgets that render it:
//! [`set_measurement`](BoundedMeasure::set_measurement) stores any real
//! number or `Infinity` verbatim, with no clamping - range enforcement is
//! the caller's job. `precision` is the decimal-place count for display
//! rounding only and never touches the stored value.
//!
//! Whether a model has an upper bound is visible in the type:
//! [`BoundedMeasure`] carries the percentage-of-range setter,
//! [`UnboundedMeasure`] does not expose one at all. [`MeasureModel`] is the
//! tagged union the factory hands back.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::observe::{CascadeReport, ListenerFault, Observable};

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(0);

/// Stable identity of a measure model, used by the wiring graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelId(u64);

impl ModelId {
    fn next() -> Self {
        ModelId(NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Bound argument for the model factory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeasureBound {
    /// `min = 0`, `max` as given. `Max(0.0)` is still a bounded model.
    Max(f64),
    /// Explicit `(min, max)` pair.
    Range(f64, f64),
    /// No upper bound: the model never exposes a percentage setter.
    Unbounded,
}

/// Outcome of a percentage-of-range assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome {
    /// The fraction was valid; the value was stored and listeners notified.
    Applied(CascadeReport),
    /// Invalid input: no mutation, no notification, no diagnostic.
    Rejected,
}

impl SetOutcome {
    /// True when the assignment actually happened.
    pub fn applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct MeasureState {
    /// Unset until the first assignment; may hold `Infinity` or NaN after.
    value: Option<f64>,
    min: f64,
    max: Option<f64>,
    precision: u32,
}

/// Shared innards of both model variants.
#[derive(Clone)]
struct MeasureCore {
    id: ModelId,
    cell: Rc<Observable<MeasureState>>,
}

impl MeasureCore {
    fn new(name: Option<String>, min: f64, max: Option<f64>, precision: u32) -> Self {
        let id = ModelId::next();
        let name = name.unwrap_or_else(|| format!("measure-{}", id.0));
        MeasureCore {
            id,
            cell: Rc::new(Observable::new(
                name,
                MeasureState {
                    value: None,
                    min,
                    max,
                    precision,
                },
            )),
        }
    }

    fn measurement(&self) -> Option<f64> {
        self.cell.peek(|s| s.value)
    }

    fn precision(&self) -> u32 {
        self.cell.peek(|s| s.precision)
    }

    /// Stores verbatim - bounds are advisory, the model never clamps.
    fn set_measurement(&self, value: f64) -> CascadeReport {
        let ((), report) = self.cell.mutate(|s| s.value = Some(value));
        report
    }
}

/// Measurement with a known `[min, max]` range.
///
/// Cloning yields another handle to the same underlying model.
#[derive(Clone)]
pub struct BoundedMeasure {
    core: MeasureCore,
}

impl BoundedMeasure {
    /// Model spanning `[min, max]` with the given display precision.
    pub fn with_range(min: f64, max: f64, precision: u32) -> Self {
        BoundedMeasure {
            core: MeasureCore::new(None, min, Some(max), precision),
        }
    }

    /// Like [`with_range`](Self::with_range) with a name for logs.
    pub fn named(name: impl Into<String>, min: f64, max: f64, precision: u32) -> Self {
        BoundedMeasure {
            core: MeasureCore::new(Some(name.into()), min, Some(max), precision),
        }
    }

    /// Model identity for wiring-graph bookkeeping.
    pub fn id(&self) -> ModelId {
        self.core.id
    }

    /// Current measurement; `None` until first assignment.
    pub fn measurement(&self) -> Option<f64> {
        self.core.measurement()
    }

    /// `(min, max)` snapshot.
    pub fn bounds(&self) -> (f64, f64) {
        self.core.cell.peek(|s| (s.min, s.max.unwrap_or(f64::NAN)))
    }

    /// `max - min`.
    pub fn range(&self) -> f64 {
        let (min, max) = self.bounds();
        max - min
    }

    /// Decimal places for display rounding. Never affects the stored value.
    pub fn precision(&self) -> u32 {
        self.core.precision()
    }

    /// Store `value` verbatim and notify. Out-of-range values are stored
    /// as-is; range checks are the caller's responsibility.
    pub fn set_measurement(&self, value: f64) -> CascadeReport {
        self.core.set_measurement(value)
    }

    /// Assign by fraction of the range: `value = min + fraction * range`.
    ///
    /// Anything that is not a finite number in `[0, 1]` is silently
    /// ignored: no mutation, no notification.
    pub fn set_by_percentage(&self, fraction: f64) -> SetOutcome {
        if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
            return SetOutcome::Rejected;
        }
        let (min, _) = self.bounds();
        let value = min + fraction * self.range();
        SetOutcome::Applied(self.core.set_measurement(value))
    }

    /// String form of [`set_by_percentage`](Self::set_by_percentage).
    ///
    /// A trailing `%` means the numeric part is out of 100 (`"50%"` is the
    /// fraction 0.5); otherwise the text is parsed as a plain fraction.
    pub fn set_by_percentage_str(&self, text: &str) -> SetOutcome {
        match parse_fraction(text) {
            Some(fraction) => self.set_by_percentage(fraction),
            None => SetOutcome::Rejected,
        }
    }

    /// Register a refresh-yourself listener; it re-reads the model when it
    /// fires.
    pub fn add_observer(
        &self,
        label: impl Into<String>,
        callback: impl Fn() -> Result<(), ListenerFault> + 'static,
    ) {
        self.core.cell.add_observer(label, callback);
    }

    /// Register a listener with a computed-arguments provider.
    pub fn add_observer_with_args<T>(
        &self,
        label: impl Into<String>,
        provider: impl Fn() -> T + 'static,
        receiver: impl Fn(T) -> Result<(), ListenerFault> + 'static,
    ) {
        self.core.cell.add_observer_with_args(label, provider, receiver);
    }

    /// Number of registered listeners.
    pub fn observer_count(&self) -> usize {
        self.core.cell.observer_count()
    }
}

/// Measurement with no upper bound (it changes solely through derivation,
/// like pressure). There is no percentage setter here - with no range, a
/// fraction of it has no meaning.
#[derive(Clone)]
pub struct UnboundedMeasure {
    core: MeasureCore,
}

impl UnboundedMeasure {
    /// Unbounded model with the given display precision. `min` is 0.
    pub fn new(precision: u32) -> Self {
        UnboundedMeasure {
            core: MeasureCore::new(None, 0.0, None, precision),
        }
    }

    /// Like [`new`](Self::new) with a name for logs.
    pub fn named(name: impl Into<String>, precision: u32) -> Self {
        UnboundedMeasure {
            core: MeasureCore::new(Some(name.into()), 0.0, None, precision),
        }
    }

    /// Model identity for wiring-graph bookkeeping.
    pub fn id(&self) -> ModelId {
        self.core.id
    }

    /// Current measurement; `None` until first assignment. May hold the
    /// `Infinity` sentinel once a derivation divides by zero.
    pub fn measurement(&self) -> Option<f64> {
        self.core.measurement()
    }

    /// `(min, None)` - no upper bound exists.
    pub fn bounds(&self) -> (f64, Option<f64>) {
        self.core.cell.peek(|s| (s.min, s.max))
    }

    /// Decimal places for display rounding.
    pub fn precision(&self) -> u32 {
        self.core.precision()
    }

    /// Store `value` verbatim (including `Infinity`) and notify.
    pub fn set_measurement(&self, value: f64) -> CascadeReport {
        self.core.set_measurement(value)
    }

    /// Register a refresh-yourself listener.
    pub fn add_observer(
        &self,
        label: impl Into<String>,
        callback: impl Fn() -> Result<(), ListenerFault> + 'static,
    ) {
        self.core.cell.add_observer(label, callback);
    }

    /// Register a listener with a computed-arguments provider.
    pub fn add_observer_with_args<T>(
        &self,
        label: impl Into<String>,
        provider: impl Fn() -> T + 'static,
        receiver: impl Fn(T) -> Result<(), ListenerFault> + 'static,
    ) {
        self.core.cell.add_observer_with_args(label, provider, receiver);
    }

    /// Number of registered listeners.
    pub fn observer_count(&self) -> usize {
        self.core.cell.observer_count()
    }
}

/// Tagged union returned by the model factory: whether the percentage
/// setter exists is part of the type, not a runtime presence check.
#[derive(Clone)]
pub enum MeasureModel {
    /// Has a known range and the percentage setter.
    Bounded(BoundedMeasure),
    /// No upper bound, no percentage setter.
    Unbounded(UnboundedMeasure),
}

impl MeasureModel {
    /// Factory: `Max(b)` gives `[0, b]`, `Range(lo, hi)` gives `[lo, hi]`,
    /// `Unbounded` gives a model with no upper bound.
    pub fn new(bound: MeasureBound, precision: u32) -> Self {
        match bound {
            MeasureBound::Max(max) => {
                MeasureModel::Bounded(BoundedMeasure::with_range(0.0, max, precision))
            }
            MeasureBound::Range(min, max) => {
                MeasureModel::Bounded(BoundedMeasure::with_range(min, max, precision))
            }
            MeasureBound::Unbounded => MeasureModel::Unbounded(UnboundedMeasure::new(precision)),
        }
    }

    /// The bounded variant, when this model has one.
    pub fn as_bounded(&self) -> Option<&BoundedMeasure> {
        match self {
            MeasureModel::Bounded(m) => Some(m),
            MeasureModel::Unbounded(_) => None,
        }
    }

    /// The unbounded variant, when this model is one.
    pub fn as_unbounded(&self) -> Option<&UnboundedMeasure> {
        match self {
            MeasureModel::Bounded(_) => None,
            MeasureModel::Unbounded(m) => Some(m),
        }
    }

    /// Model identity for wiring-graph bookkeeping.
    pub fn id(&self) -> ModelId {
        match self {
            MeasureModel::Bounded(m) => m.id(),
            MeasureModel::Unbounded(m) => m.id(),
        }
    }

    /// Current measurement; `None` until first assignment.
    pub fn measurement(&self) -> Option<f64> {
        match self {
            MeasureModel::Bounded(m) => m.measurement(),
            MeasureModel::Unbounded(m) => m.measurement(),
        }
    }

    /// `(min, max)` snapshot; `max` is `None` for unbounded models.
    pub fn bounds(&self) -> (f64, Option<f64>) {
        match self {
            MeasureModel::Bounded(m) => {
                let (min, max) = m.bounds();
                (min, Some(max))
            }
            MeasureModel::Unbounded(m) => m.bounds(),
        }
    }

    /// Decimal places for display rounding.
    pub fn precision(&self) -> u32 {
        match self {
            MeasureModel::Bounded(m) => m.precision(),
            MeasureModel::Unbounded(m) => m.precision(),
        }
    }

    /// Store `value` verbatim and notify.
    pub fn set_measurement(&self, value: f64) -> CascadeReport {
        match self {
            MeasureModel::Bounded(m) => m.set_measurement(value),
            MeasureModel::Unbounded(m) => m.set_measurement(value),
        }
    }
}

/// Parse a fraction: a trailing `%` divides the numeric part by 100,
/// anything else is read as a plain number. Range checking happens in the
/// setter, not here.
fn parse_fraction(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Some(percent) = text.strip_suffix('%') {
        percent.trim().parse::<f64>().ok().map(|n| n / 100.0)
    } else {
        text.parse::<f64>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::Cell;

    #[test]
    fn test_factory_bound_forms() {
        let single = MeasureModel::new(MeasureBound::Max(20.0), 1);
        assert_eq!(single.bounds(), (0.0, Some(20.0)));

        let pair = MeasureModel::new(MeasureBound::Range(5.0, 15.0), 0);
        assert_eq!(pair.bounds(), (5.0, Some(15.0)));

        let open = MeasureModel::new(MeasureBound::Unbounded, 2);
        assert_eq!(open.bounds(), (0.0, None));
    }

    #[test]
    fn test_zero_max_is_still_bounded() {
        let zero = MeasureModel::new(MeasureBound::Max(0.0), 1);
        assert!(zero.as_bounded().is_some());
    }

    #[test]
    fn test_unbounded_model_has_no_percentage_setter() {
        // The capability is in the type: only the Bounded variant carries
        // set_by_percentage, so an unbounded model cannot be asked for one.
        let model = MeasureModel::new(MeasureBound::Unbounded, 2);
        assert!(model.as_bounded().is_none());
        assert!(model.as_unbounded().is_some());
    }

    #[test]
    fn test_measurement_starts_unset() {
        let model = BoundedMeasure::with_range(0.0, 20.0, 1);
        assert_eq!(model.measurement(), None);
    }

    #[test]
    fn test_no_self_clamping_above_max() {
        let model = BoundedMeasure::with_range(0.0, 20.0, 1);
        model.set_measurement(25.0);
        // The bound is advisory metadata, not an enforced invariant.
        assert_eq!(model.measurement(), Some(25.0));
    }

    #[test]
    fn test_set_measurement_accepts_infinity() {
        let model = UnboundedMeasure::new(2);
        model.set_measurement(f64::INFINITY);
        assert_eq!(model.measurement(), Some(f64::INFINITY));
    }

    #[test]
    fn test_percentage_round_trip() {
        let model = BoundedMeasure::with_range(0.0, 20.0, 1);

        assert!(model.set_by_percentage(0.5).applied());
        assert_eq!(model.measurement(), Some(10.0));

        assert!(model.set_by_percentage_str("50%").applied());
        assert_eq!(model.measurement(), Some(10.0));
    }

    #[test]
    fn test_percentage_respects_nonzero_min() {
        let model = BoundedMeasure::with_range(10.0, 30.0, 1);
        model.set_by_percentage(0.25);
        assert_relative_eq!(model.measurement().unwrap(), 15.0);
    }

    #[test]
    fn test_rejected_percentage_is_a_true_noop() {
        let model = BoundedMeasure::with_range(0.0, 20.0, 1);
        let fired = Rc::new(Cell::new(0usize));
        {
            let fired = Rc::clone(&fired);
            model.add_observer("count", move || {
                fired.set(fired.get() + 1);
                Ok(())
            });
        }
        model.set_measurement(4.0);
        assert_eq!(fired.get(), 1);

        assert!(!model.set_by_percentage_str("150%").applied());
        assert!(!model.set_by_percentage(-0.1).applied());
        assert!(!model.set_by_percentage(f64::NAN).applied());
        assert!(!model.set_by_percentage_str("plunger").applied());

        // Value unchanged, zero extra notifications.
        assert_eq!(model.measurement(), Some(4.0));
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_percentage_string_forms() {
        let model = BoundedMeasure::with_range(0.0, 20.0, 1);

        assert!(model.set_by_percentage_str(" 25% ").applied());
        assert_eq!(model.measurement(), Some(5.0));

        // No '%' suffix: parsed as a plain fraction.
        assert!(model.set_by_percentage_str("0.75").applied());
        assert_eq!(model.measurement(), Some(15.0));

        // Boundary fractions are valid.
        assert!(model.set_by_percentage_str("100%").applied());
        assert_eq!(model.measurement(), Some(20.0));
        assert!(model.set_by_percentage_str("0%").applied());
        assert_eq!(model.measurement(), Some(0.0));
    }

    #[test]
    fn test_both_setters_notify() {
        let model = BoundedMeasure::with_range(0.0, 20.0, 1);
        let fired = Rc::new(Cell::new(0usize));
        {
            let fired = Rc::clone(&fired);
            model.add_observer("count", move || {
                fired.set(fired.get() + 1);
                Ok(())
            });
        }
        model.set_measurement(3.0);
        model.set_by_percentage(0.5);
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn test_clone_is_a_handle_to_the_same_model() {
        let model = BoundedMeasure::with_range(0.0, 20.0, 1);
        let other = model.clone();
        other.set_measurement(12.0);
        assert_eq!(model.measurement(), Some(12.0));
        assert_eq!(model.id(), other.id());
    }

    #[test]
    fn test_model_ids_are_distinct() {
        let a = BoundedMeasure::with_range(0.0, 1.0, 0);
        let b = UnboundedMeasure::new(0);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_range() {
        let model = BoundedMeasure::with_range(5.0, 25.0, 1);
        assert_relative_eq!(model.range(), 20.0);
    }
}
