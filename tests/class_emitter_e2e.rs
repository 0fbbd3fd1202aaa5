use parking_lot::Mutex;
use ripple::{Class, Instance, Listener, Properties, RuntimeError, Super, Value, NEW_LISTENER};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn greeter_base() -> Class {
    Class::root().extend(Properties::new().method(
        "greet",
        |_this: &Instance, _sup: &Super, _args: &[Value]| Ok(Value::from("World")),
    ))
}

fn recording_listener(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> Listener {
    let log = Arc::clone(log);
    let tag = tag.to_string();
    Listener::new(move |_event, _args| {
        log.lock().push(tag.clone());
        Ok(())
    })
}

#[test]
fn test_greeting_override_delegates_to_the_base() {
    let class = greeter_base().extend(Properties::new().delegating(
        "greet",
        |this: &Instance, sup: &Super, args: &[Value]| {
            let inner = sup.call(this, args)?;
            Ok(Value::from(format!("Hi {}!", inner.as_str().unwrap_or_default())))
        },
    ));

    let instance = class.construct(&[]).unwrap();
    assert_eq!(instance.call("greet", &[]).unwrap(), Value::from("Hi World!"));
}

#[test]
fn test_base_runs_exactly_once_across_two_override_levels() {
    let base_runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&base_runs);

    let base = Class::root().extend(Properties::new().method(
        "render",
        move |_this: &Instance, _sup: &Super, _args: &[Value]| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::from("core"))
        },
    ));
    let themed = base.extend(Properties::new().delegating(
        "render",
        |this: &Instance, sup: &Super, args: &[Value]| {
            let inner = sup.call(this, args)?;
            Ok(Value::from(format!("theme({})", inner.as_str().unwrap())))
        },
    ));
    let bordered = themed.extend(Properties::new().delegating(
        "render",
        |this: &Instance, sup: &Super, args: &[Value]| {
            let inner = sup.call(this, args)?;
            Ok(Value::from(format!("border({})", inner.as_str().unwrap())))
        },
    ));

    let instance = bordered.construct(&[]).unwrap();
    assert_eq!(
        instance.call("render", &[]).unwrap(),
        Value::from("border(theme(core))")
    );
    assert_eq!(base_runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_initialize_runs_only_on_the_final_construction() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);

    let base = Class::root().extend(Properties::new().method(
        "initialize",
        move |_this: &Instance, _sup: &Super, _args: &[Value]| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Undefined)
        },
    ));
    let sub = base.extend(Properties::new());
    let subsub = sub.extend(Properties::new());
    assert_eq!(runs.load(Ordering::SeqCst), 0);

    let _instance = subsub.construct(&[]).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_initialize_can_wire_listeners() {
    let pings = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&pings);

    let class = Class::root().extend(Properties::new().method(
        "initialize",
        move |this: &Instance, _sup: &Super, _args: &[Value]| {
            let counter = Arc::clone(&counter);
            this.on(
                "ping",
                Listener::new(move |_event, _args| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            )?;
            Ok(Value::Undefined)
        },
    ));

    let instance = class.construct(&[]).unwrap();
    assert!(instance.emit("ping", &[]).unwrap());
    assert!(instance.emit("ping", &[]).unwrap());
    assert_eq!(pings.load(Ordering::SeqCst), 2);
}

#[test]
fn test_every_extended_class_has_the_emitter_surface() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let deep = greeter_base()
        .extend(Properties::new())
        .extend(Properties::new())
        .construct(&[])
        .unwrap();

    deep.on("evt", recording_listener(&log, "first"))
        .unwrap()
        .on("evt", recording_listener(&log, "second"))
        .unwrap();
    deep.emit("evt", &[]).unwrap();
    assert_eq!(*log.lock(), vec!["second".to_string(), "first".to_string()]);
}

#[test]
fn test_listener_state_is_per_instance() {
    let class = greeter_base();
    let a = class.construct(&[]).unwrap();
    let b = class.construct(&[]).unwrap();

    a.on("evt", Listener::new(|_e, _a| Ok(()))).unwrap();
    a.set_max_listeners(3);

    assert_eq!(a.listener_count("evt"), 1);
    assert_eq!(b.listener_count("evt"), 0);
    assert_eq!(a.max_listeners(), 3);
    assert_eq!(b.max_listeners(), ripple::DEFAULT_MAX_LISTENERS);
    assert!(!b.emit("evt", &[]).unwrap());
}

#[test]
fn test_new_listener_fires_before_the_threshold_check() {
    // The newListener pass runs while the registration that triggered it is
    // already in the sequence; the threshold check reads the live length
    // afterwards. Observed here through ordering: the observer always runs,
    // warning or not, and registration never fails.
    let target = Class::root().construct(&[]).unwrap();
    target.set_max_listeners(1);

    let notified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notified);
    target
        .on(
            NEW_LISTENER,
            Listener::new(move |_event, args| {
                assert!(args[0].is_callable());
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        )
        .unwrap();

    for _ in 0..3 {
        target.on("busy", Listener::new(|_e, _a| Ok(()))).unwrap();
    }
    assert_eq!(notified.load(Ordering::SeqCst), 4);
    assert_eq!(target.listener_count("busy"), 3);
}

#[test]
fn test_method_errors_propagate_through_dispatch_and_delegation() {
    let class = Class::root()
        .extend(Properties::new().method(
            "explode",
            |_this: &Instance, _sup: &Super, _args: &[Value]| {
                Err(RuntimeError::exception("kaboom"))
            },
        ))
        .extend(Properties::new().delegating(
            "explode",
            |this: &Instance, sup: &Super, args: &[Value]| sup.call(this, args),
        ));

    let instance = class.construct(&[]).unwrap();
    assert!(matches!(
        instance.call("explode", &[]).unwrap_err(),
        RuntimeError::Exception(_)
    ));

    let survivors = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&survivors);
    let probe = instance.clone();
    instance
        .on(
            "sos",
            Listener::new(move |_event, _args| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        )
        .unwrap()
        .on(
            "sos",
            Listener::new(move |_event, args| probe.call("explode", args).map(|_| ())),
        )
        .unwrap();

    // Reverse order: the failing listener runs first and aborts the pass.
    assert!(matches!(
        instance.emit("sos", &[]).unwrap_err(),
        RuntimeError::Exception(_)
    ));
    assert_eq!(survivors.load(Ordering::SeqCst), 0);
}

#[test]
fn test_once_with_reentrant_emission_still_fires_once() {
    let target = Class::root().construct(&[]).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    target
        .once(
            "echo",
            Listener::new(move |_event, _args| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        )
        .unwrap();

    // A later-registered listener re-enters the dispatcher for the same
    // event; the wrapper removes itself inside the nested pass, so the
    // outer pass finds its slot vacated.
    let reentries = Arc::new(AtomicUsize::new(0));
    let guard = Arc::clone(&reentries);
    target
        .on(
            "echo",
            Listener::new(move |event, _args| {
                if guard.fetch_add(1, Ordering::SeqCst) == 0 {
                    event.target().emit("echo", &[])?;
                }
                Ok(())
            }),
        )
        .unwrap();

    target.emit("echo", &[]).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_values_flow_through_initialize_methods_and_events() {
    let class = Class::root()
        .extend(
            Properties::new()
                .value("species", "lynx")
                .method(
                    "initialize",
                    |this: &Instance, _sup: &Super, args: &[Value]| {
                        if let Some(name) = args.first() {
                            this.set("name", name.clone());
                        }
                        Ok(Value::Undefined)
                    },
                )
                .method("describe", |this: &Instance, _sup: &Super, _args: &[Value]| {
                    let name = this.get("name").unwrap_or(Value::Undefined);
                    let species = this.get("species").unwrap_or(Value::Undefined);
                    Ok(Value::from(format!(
                        "{} the {}",
                        name.as_str().unwrap_or("?"),
                        species.as_str().unwrap_or("?")
                    )))
                }),
        );

    let instance = class.construct(&[Value::from("Pip")]).unwrap();
    assert_eq!(
        instance.call("describe", &[]).unwrap(),
        Value::from("Pip the lynx")
    );

    let heard = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&heard);
    instance
        .on(
            "described",
            Listener::new(move |event, args| {
                let description = event.target().call("describe", &[])?;
                sink.lock().push((description, args.to_vec()));
                Ok(())
            }),
        )
        .unwrap();

    instance.emit("described", &[Value::from(1)]).unwrap();
    let heard = heard.lock();
    assert_eq!(heard[0].0, Value::from("Pip the lynx"));
    assert_eq!(heard[0].1, vec![Value::from(1)]);
}
