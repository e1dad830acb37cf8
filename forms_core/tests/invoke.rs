mod common;

use common::{child_of, form, headless_app};
use forms_core::platform::headless::HeadlessPlatform;
use forms_core::{
    sync_context, App, Control, Error, InvokeContext, InvokeHandle, MessageId, NativeError,
    Platform, RawMessage, Rect, UnhandledPanic,
};
use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

#[test]
fn worker_thread_round_trip() {
    let (app, _platform) = headless_app();
    let f = form(&app, "remote", Rect::new(0, 0, 100, 100)).unwrap();
    f.create_control().unwrap();

    let invoker = f.invoker();
    let worker = thread::spawn(move || {
        assert!(invoker.invoke_required());
        let handle = invoker.begin_invoke(|control, _| {
            assert!(!control.invoker().invoke_required());
            control.text()
        })?;
        let text = invoker.end_invoke(handle)?;
        let id = invoker.invoke(|control, _| control.id())?;
        Ok::<_, Error>((text, id))
    });

    app.run_until(|| worker.is_finished());
    let (text, id) = worker.join().unwrap().unwrap();
    assert_eq!(text, "remote");
    assert_eq!(id, f.id());
    assert!(f.get_state2(forms_core::State2::HAVE_INVOKED));
}

#[test]
fn worker_sets_text_through_the_affinity_thread() {
    let (app, platform) = headless_app();
    let f = form(&app, "A", Rect::new(0, 0, 100, 100)).unwrap();
    f.create_control().unwrap();
    let affinity = thread::current().id();

    let invoker = f.invoker();
    let worker = thread::spawn(move || {
        let handle = invoker.begin_invoke(|control, _| {
            control.set_text("B")?;
            Ok::<_, Error>(thread::current().id())
        })?;
        invoker.end_invoke(handle)?
    });

    app.run_until(|| worker.is_finished());
    let ran_on = worker.join().unwrap().unwrap();
    assert_eq!(ran_on, affinity);
    assert_eq!(f.text(), "B");
    assert_eq!(platform.window_text(f.handle().unwrap()), "B");
}

#[test]
fn synchronous_invoke_on_the_affinity_thread_runs_at_once() {
    let (app, platform) = headless_app();
    let f = form(&app, "local", Rect::default()).unwrap();
    f.create_handle().unwrap();

    let before = platform.posted_count();
    let text = f.invoke(|control, _| control.text()).unwrap();
    assert_eq!(text, "local");
    assert_eq!(platform.posted_count(), before);
    assert!(!f.invoker().invoke_required());
}

#[test]
fn asynchronous_invoke_on_the_affinity_thread_waits_for_the_loop() {
    let (app, _platform) = headless_app();
    let f = form(&app, "local", Rect::default()).unwrap();
    f.create_handle().unwrap();

    let handle = f.begin_invoke(|_, _| 5).unwrap();
    assert!(!handle.is_completed());
    app.do_events();
    assert!(handle.is_completed());
    assert_eq!(f.end_invoke(handle).unwrap(), 5);
}

#[test]
fn end_invoke_on_the_affinity_thread_drains_the_queue() {
    let (app, _platform) = headless_app();
    let f = form(&app, "local", Rect::default()).unwrap();
    f.create_handle().unwrap();

    let first = f.begin_invoke(|_, _| 1).unwrap();
    let second = f.begin_invoke(|_, _| 2).unwrap();
    assert_eq!(f.end_invoke(second).unwrap(), 2);
    assert!(first.is_completed());
    assert_eq!(f.end_invoke(first).unwrap(), 1);
}

#[test]
fn invoke_without_any_handle_fails() {
    let (app, _platform) = headless_app();
    let f = form(&app, "nothing yet", Rect::default()).unwrap();
    assert!(matches!(
        f.begin_invoke(|_, _| ()),
        Err(Error::InvalidOperation(_))
    ));
    assert!(matches!(f.invoke(|_, _| ()), Err(Error::InvalidOperation(_))));
}

#[test]
fn child_without_handle_marshals_through_its_parent() {
    let (app, _platform) = headless_app();
    let f = form(&app, "parent", Rect::default()).unwrap();
    f.create_control().unwrap();
    let child = Control::builder(&app)
        .parent(&f)
        .visible(false)
        .build()
        .unwrap();
    assert!(child.handle().is_none());

    let handle = child
        .begin_invoke(|control, _| {
            let context = sync_context::current().map(|invoker| invoker.control_id());
            (control.id(), context)
        })
        .unwrap();
    app.do_events();
    let (target, context) = child.end_invoke(handle).unwrap();
    assert_eq!(target, child.id());
    assert_eq!(context, Some(f.id()));
    assert!(sync_context::current().is_none());
}

#[test]
fn synchronous_panic_reaches_the_caller() {
    let (app, _platform) = headless_app();
    let f = form(&app, "local", Rect::default()).unwrap();
    f.create_handle().unwrap();

    let result = catch_unwind(AssertUnwindSafe(|| {
        f.invoke(|_, _| -> i32 { panic!("boom") })
    }));
    let payload = result.unwrap_err();
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"boom"));

    // The control is still usable.
    assert_eq!(f.invoke(|_, _| 3).unwrap(), 3);
}

#[test]
fn asynchronous_panic_goes_to_the_hook_and_to_end_invoke() {
    common::init_tracing();
    let reported: Arc<Mutex<Vec<UnhandledPanic>>> = Arc::default();
    let platform = Rc::new(HeadlessPlatform::new());
    let app = {
        let reported = reported.clone();
        App::builder()
            .platform(platform.clone())
            .on_unhandled_panic(move |p| reported.lock().unwrap().push(p.clone()))
            .build()
            .unwrap()
    };
    let f = form(&app, "local", Rect::default()).unwrap();
    f.create_handle().unwrap();

    let context = InvokeContext::new().with_correlation_id(7);
    let handle = f
        .invoker()
        .begin_invoke_with(context, |_, _| -> () { panic!("async boom") })
        .unwrap();
    app.do_events();

    {
        let reported = reported.lock().unwrap();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].control, f.id());
        assert_eq!(reported[0].message, "async boom");
        assert_eq!(reported[0].correlation_id, Some(7));
    }

    let result = catch_unwind(AssertUnwindSafe(|| f.end_invoke(handle)));
    assert!(result.is_err());
}

#[test]
fn dispose_fails_pending_calls() {
    let (app, _platform) = headless_app();
    let f = form(&app, "doomed", Rect::default()).unwrap();
    f.create_control().unwrap();

    let handles: Vec<_> = (0..3).map(|i| f.begin_invoke(move |_, _| i).unwrap()).collect();
    f.dispose();
    for handle in handles {
        assert!(handle.is_completed());
        assert!(matches!(handle.wait(), Err(Error::Disposed(_))));
    }

    assert!(f.invoker().is_disposed());
    assert!(matches!(f.begin_invoke(|_, _| 1), Err(Error::Disposed(_))));
    app.do_events();
}

#[test]
fn destroying_the_handle_fails_pending_calls() {
    let (app, _platform) = headless_app();
    let f = form(&app, "closing", Rect::default()).unwrap();
    f.create_handle().unwrap();

    let handle = f.begin_invoke(|_, _| 1).unwrap();
    f.destroy_handle().unwrap();
    assert!(matches!(f.end_invoke(handle), Err(Error::Disposed(_))));
}

#[test]
fn calls_queued_while_the_handle_is_dying_fail_and_never_run() {
    let (app, _platform) = headless_app();
    let f = form(&app, "closing", Rect::default()).unwrap();
    let child = child_of(&app, &f, "child").unwrap();
    f.create_control().unwrap();

    // The form has seen DESTROY by the time its child does, but its handle
    // stays live until NC_DESTROY.
    let ran = Arc::new(AtomicBool::new(false));
    let late: Rc<RefCell<Option<Result<InvokeHandle<i32>, Error>>>> = Rc::default();
    {
        let invoker = f.invoker();
        let ran = ran.clone();
        let late = late.clone();
        child.set_message_hook(move |_c: &Control, m: &RawMessage| {
            if m.id == MessageId::DESTROY {
                let invoker = invoker.clone();
                let ran = ran.clone();
                let result = thread::spawn(move || {
                    invoker.begin_invoke(move |_, _| {
                        ran.store(true, Ordering::SeqCst);
                        7
                    })
                })
                .join()
                .unwrap();
                *late.borrow_mut() = Some(result);
            }
            None
        });
    }

    f.destroy_handle().unwrap();
    app.do_events();
    let handle = late.borrow_mut().take().unwrap().unwrap();
    assert!(handle.is_completed());
    assert!(matches!(handle.wait(), Err(Error::Disposed(_))));

    child.clear_message_hook();
    f.create_control().unwrap();
    app.do_events();
    assert!(!ran.load(Ordering::SeqCst));
    assert!(!f.invoker().is_disposed());
    assert_eq!(f.invoke(|_, _| 8).unwrap(), 8);
}

#[test]
fn pending_calls_survive_recreation() {
    let (app, _platform) = headless_app();
    let f = form(&app, "phoenix", Rect::default()).unwrap();
    f.create_control().unwrap();
    let old = f.handle();

    let handle = f.begin_invoke(|control, _| control.handle()).unwrap();
    f.recreate_handle().unwrap();
    assert_ne!(f.handle(), old);
    assert!(!handle.is_completed());

    app.do_events();
    assert!(handle.is_completed());
    assert_eq!(f.end_invoke(handle).unwrap(), f.handle());
}

#[test]
fn failed_recreation_fails_pending_calls() {
    let (app, platform) = headless_app();
    let f = form(&app, "fragile", Rect::default()).unwrap();
    f.create_control().unwrap();

    let handle = f.begin_invoke(|_, _| 1).unwrap();
    platform.fail_next_create(NativeError::new(NativeError::NOT_ENOUGH_MEMORY, "no more"));
    assert!(f.recreate_handle().is_err());
    assert!(matches!(
        f.end_invoke(handle),
        Err(Error::InvalidOperation(_))
    ));
}

#[test]
fn waiter_learns_when_the_affinity_thread_goes_away() {
    let (app, _platform) = headless_app();
    let f = form(&app, "orphan", Rect::default()).unwrap();
    f.create_handle().unwrap();
    let invoker = f.invoker();
    // Keep the handle alive past the app so only the thread exit can end
    // the wait.
    std::mem::forget(f);

    let worker = thread::spawn(move || invoker.invoke(|_, _| 1));
    drop(app);
    let result = worker.join().unwrap();
    assert!(matches!(result, Err(Error::AffinityThreadExited)));
}

#[test]
fn calls_from_one_thread_run_in_order() {
    const WORKERS: u32 = 3;
    const CALLS: u32 = 40;

    let (app, _platform) = headless_app();
    let f = form(&app, "ordered", Rect::default()).unwrap();
    f.create_control().unwrap();

    let log: Arc<Mutex<Vec<(u32, u32)>>> = Arc::default();
    let workers: Vec<_> = (0..WORKERS)
        .map(|w| {
            let invoker = f.invoker();
            let log = log.clone();
            thread::spawn(move || {
                let handles: Vec<_> = (0..CALLS)
                    .map(|i| {
                        let log = log.clone();
                        invoker
                            .begin_invoke(move |_, _| log.lock().unwrap().push((w, i)))
                            .unwrap()
                    })
                    .collect();
                for handle in handles {
                    invoker.end_invoke(handle).unwrap();
                }
            })
        })
        .collect();

    app.run_until(|| workers.iter().all(|w| w.is_finished()));
    for worker in workers {
        worker.join().unwrap();
    }

    let log = log.lock().unwrap();
    assert_eq!(log.len(), (WORKERS * CALLS) as usize);
    for w in 0..WORKERS {
        let seen: Vec<u32> = log.iter().filter(|(t, _)| *t == w).map(|(_, i)| *i).collect();
        assert_eq!(seen, (0..CALLS).collect::<Vec<_>>());
    }
}

#[test]
fn a_burst_of_calls_posts_one_message() {
    let (app, platform) = headless_app();
    let f = form(&app, "burst", Rect::default()).unwrap();
    f.create_handle().unwrap();

    let before = platform.posted_count();
    let handles: Vec<_> = (0..10).map(|i| f.begin_invoke(move |_, _| i).unwrap()).collect();
    assert_eq!(platform.posted_count() - before, 1);

    app.do_events();
    let results: Vec<i32> = handles
        .into_iter()
        .map(|h| f.end_invoke(h).unwrap())
        .collect();
    assert_eq!(results, (0..10).collect::<Vec<_>>());
}

#[test]
fn context_travels_with_the_call() {
    let (app, _platform) = headless_app();
    let f = form(&app, "context", Rect::default()).unwrap();
    f.create_handle().unwrap();

    let token = forms_core::CancellationToken::new();
    let context = InvokeContext::new()
        .with_locale("fr-FR")
        .with_cancellation(token.clone());
    let handle = f
        .invoker()
        .begin_invoke_with(context, |_, ctx| {
            (ctx.locale.clone(), ctx.cancellation.is_cancelled())
        })
        .unwrap();
    token.cancel();
    app.do_events();
    assert_eq!(
        f.end_invoke(handle).unwrap(),
        (Some("fr-FR".to_string()), true)
    );
}

#[test]
fn post_runs_without_a_waiter() {
    let (app, _platform) = headless_app();
    let f = form(&app, "post", Rect::default()).unwrap();
    f.create_handle().unwrap();

    let invoker = f.invoker();
    thread::spawn(move || {
        invoker
            .post(|control| control.set_text("posted").unwrap())
            .unwrap()
    })
    .join()
    .unwrap();

    app.do_events();
    assert_eq!(f.text(), "posted");
}
