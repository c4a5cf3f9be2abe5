//! End-to-end session test: a full apparatus wired the way the frontend
//! wires it, driven through slider and input-field paths.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use syringe_sim_core::{
    ball_speed, needle_rotation, Apparatus, ApparatusConfig, ListenerFault,
};

fn exact_lab() -> Apparatus {
    Apparatus::new(ApparatusConfig {
        noise: 0.0,
        ..ApparatusConfig::default()
    })
    .unwrap()
}

#[test]
fn full_session_keeps_every_widget_in_sync() {
    let lab = exact_lab();

    // Frontend observer roles: numeric readout, gauge needle, particle
    // speed through an args provider.
    let readout = Rc::new(Cell::new(f64::NAN));
    let needle = Rc::new(Cell::new(f64::NAN));
    let speed = Rc::new(Cell::new(f64::NAN));

    {
        let readout = Rc::clone(&readout);
        let pressure = lab.pressure().clone();
        lab.pressure().add_observer("pressure-readout", move || {
            readout.set(pressure.measurement().unwrap_or(f64::NAN));
            Ok(())
        });
    }
    {
        let needle_in = Rc::clone(&needle);
        let pressure = lab.pressure().clone();
        lab.pressure().add_observer("needle", move || {
            needle_in.set(needle_rotation(pressure.measurement().unwrap_or(f64::NAN)));
            Ok(())
        });
    }
    {
        let speed_in = Rc::clone(&speed);
        let pressure = lab.pressure().clone();
        lab.pressure().add_observer_with_args(
            "ball-speed",
            move || ball_speed(pressure.measurement().unwrap_or(f64::NAN)),
            move |s| {
                speed_in.set(s);
                Ok(())
            },
        );
    }

    // Slider drag to the midpoint.
    assert!(lab.set_volume_percentage(0.5).applied());
    assert_eq!(lab.volume().measurement(), Some(10.0));
    assert_eq!(readout.get(), 85.0);
    assert_eq!(needle.get(), needle_rotation(85.0));
    assert_eq!(speed.get(), 10.0 + 10.0 * 85.0 / 42.5);
    lab.record().unwrap();

    // Typed input path.
    lab.set_volume(5.0);
    assert_eq!(readout.get(), 170.0);
    lab.record().unwrap();

    // Plunger pushed fully in: the sentinel reaches every widget, each
    // applying its own degradation policy.
    lab.set_volume(0.0);
    assert_eq!(readout.get(), f64::INFINITY);
    assert_eq!(needle.get(), 145.0);
    assert_eq!(speed.get(), 25.0);

    let log = lab.log();
    assert_eq!(log.len(), 2);
    assert_eq!(log.rows()[0].volume, 10.0);
    assert_eq!(log.rows()[1].pressure, 170.0);
}

#[test]
fn nested_cascades_run_depth_first() {
    let lab = exact_lab();
    let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

    // Volume's first listener is the derivation (wired by the apparatus),
    // whose nested pressure cascade must finish before volume's later
    // listeners run.
    {
        let order = Rc::clone(&order);
        lab.pressure().add_observer("pressure-widget", move || {
            order.borrow_mut().push("pressure-widget");
            Ok(())
        });
    }
    {
        let order = Rc::clone(&order);
        lab.volume().add_observer("volume-widget", move || {
            order.borrow_mut().push("volume-widget");
            Ok(())
        });
    }

    lab.set_volume(10.0);
    assert_eq!(*order.borrow(), vec!["pressure-widget", "volume-widget"]);
}

#[test]
fn stale_widget_does_not_break_the_rest_of_the_ui() {
    let lab = exact_lab();
    let healthy_updates = Rc::new(Cell::new(0usize));

    lab.pressure().add_observer("stale-widget", || {
        Err(ListenerFault::Failed {
            listener: "stale-widget".into(),
            reason: "detached from document".into(),
        })
    });
    {
        let healthy_updates = Rc::clone(&healthy_updates);
        lab.pressure().add_observer("healthy-widget", move || {
            healthy_updates.set(healthy_updates.get() + 1);
            Ok(())
        });
    }

    let report = lab.set_volume(10.0);
    // The outer cascade saw no faults of its own...
    assert!(report.is_clean());
    // ...and the healthy widget behind the stale one still updated.
    assert_eq!(healthy_updates.get(), 1);
    assert_eq!(lab.pressure().measurement(), Some(85.0));
}
