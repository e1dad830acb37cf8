mod common;

use common::{child_of, form, headless_app};
use forms_core::{
    AccessibilityAdapter, AmbientProperty, App, ColorRef, Control, ControlId, Cursor, Error,
    ExStyle, Font, LayoutEngine, MessageId, NativeError, Platform, RawMessage, Rect, Region,
    RightToLeft, Site, State, State2, WindowStyle,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn counter() -> Rc<Cell<u32>> {
    Rc::new(Cell::new(0))
}

#[test]
fn create_handle_is_idempotent_and_marks_created_only_through_create_control() {
    let (app, platform) = headless_app();
    let f = form(&app, "first", Rect::new(10, 20, 100, 30)).unwrap();

    let created = counter();
    {
        let created = created.clone();
        f.events()
            .handle_created
            .subscribe(move |_, _| created.set(created.get() + 1));
    }

    assert!(f.handle().is_none());
    f.create_handle().unwrap();
    let h = f.handle().unwrap();
    assert!(platform.is_window(h));
    assert_eq!(platform.window_text(h), "first");
    assert_eq!(platform.window_rect(h), Some(Rect::new(10, 20, 100, 30)));
    assert_eq!(platform.parent(h), None);
    assert_eq!(created.get(), 1);
    assert!(!f.created());

    f.create_handle().unwrap();
    assert_eq!(f.handle(), Some(h));
    assert_eq!(created.get(), 1);

    f.create_control().unwrap();
    assert!(f.created());
    assert_eq!(app.control_from_handle(h), Some(f.clone()));
    assert!(f.state().is_consistent());
}

#[test]
fn recreate_keeps_identity_properties_and_children() {
    let (app, platform) = headless_app();
    let f = form(&app, "form", Rect::new(0, 0, 200, 100)).unwrap();
    let child = child_of(&app, &f, "child").unwrap();
    f.set_back_color(Some(ColorRef::RED)).unwrap();
    f.set_tag(42u32).unwrap();
    f.create_control().unwrap();

    let old = f.handle().unwrap();
    let child_handle = child.handle().unwrap();
    assert_eq!(platform.parent(child_handle), Some(old));
    let id = f.id();

    let destroyed = counter();
    {
        let destroyed = destroyed.clone();
        f.events()
            .handle_destroyed
            .subscribe(move |_, _| destroyed.set(destroyed.get() + 1));
    }
    let child_destroyed = counter();
    {
        let child_destroyed = child_destroyed.clone();
        child
            .events()
            .handle_destroyed
            .subscribe(move |_, _| child_destroyed.set(child_destroyed.get() + 1));
    }

    f.recreate_handle().unwrap();

    let new = f.handle().unwrap();
    assert_ne!(old, new);
    assert!(!platform.is_window(old));
    assert_eq!(f.id(), id);
    assert_eq!(app.control_from_handle(new), Some(f.clone()));
    assert!(app.control_from_handle(old).is_none());

    assert_eq!(child.handle(), Some(child_handle));
    assert_eq!(platform.parent(child_handle), Some(new));
    assert!(!child.get_state2(State2::PARKED));
    assert_eq!(child_destroyed.get(), 0);

    assert_eq!(f.back_color(), ColorRef::RED);
    assert_eq!(*f.tag::<u32>().unwrap(), 42);
    assert_eq!(f.text(), "form");
    assert!(f.created());
    assert!(!f.get_state(State::RECREATE));
    assert_eq!(destroyed.get(), 1);
}

#[test]
fn recreate_restores_focus() {
    let (app, platform) = headless_app();
    let f = form(&app, "form", Rect::new(0, 0, 200, 100)).unwrap();
    let child = child_of(&app, &f, "child").unwrap();
    f.create_control().unwrap();

    assert!(child.focus());
    assert!(child.focused());
    assert!(child.get_state(State::FOCUSED));
    assert!(f.contains_focus());

    f.recreate_handle().unwrap();
    assert!(f.contains_focus());
    assert_eq!(platform.focused(), f.handle());
    assert!(!child.get_state(State::FOCUSED));
}

#[test]
fn recreate_without_handle_does_nothing() {
    let (app, platform) = headless_app();
    let f = form(&app, "form", Rect::default()).unwrap();
    f.recreate_handle().unwrap();
    assert!(f.handle().is_none());
    assert_eq!(platform.windows_created(), 0);
}

#[test]
fn failed_creation_leaves_no_handle_and_can_be_retried() {
    let (app, platform) = headless_app();
    let f = form(&app, "form", Rect::default()).unwrap();

    platform.fail_next_create(NativeError::new(NativeError::NOT_ENOUGH_MEMORY, "out of handles"));
    match f.create_handle() {
        Err(Error::HandleCreation(e)) => assert_eq!(e.code, NativeError::NOT_ENOUGH_MEMORY),
        other => panic!("unexpected {:?}", other),
    }
    assert!(f.handle().is_none());
    assert!(!f.get_state(State::CREATING_HANDLE));

    f.create_handle().unwrap();
    assert!(f.handle().is_some());
}

#[test]
fn failed_recreation_leaves_control_uncreated_until_created_again() {
    let (app, platform) = headless_app();
    let f = form(&app, "form", Rect::default()).unwrap();
    f.create_control().unwrap();

    platform.fail_next_create(NativeError::new(NativeError::NOT_ENOUGH_MEMORY, "out of handles"));
    assert!(matches!(f.recreate_handle(), Err(Error::HandleCreation(_))));
    assert!(f.handle().is_none());
    assert!(!f.created());
    assert!(!f.get_state(State::RECREATE));

    f.create_control().unwrap();
    assert!(f.handle().is_some());
    assert!(f.created());
}

#[test]
fn recreation_failing_on_a_child_takes_down_the_new_handle() {
    let (app, platform) = headless_app();
    let f = form(&app, "form", Rect::default()).unwrap();
    let kept = child_of(&app, &f, "kept").unwrap();
    let fragile = child_of(&app, &f, "fragile").unwrap();
    f.create_control().unwrap();
    let kept_handle = kept.handle().unwrap();
    fragile.destroy_handle().unwrap();
    assert!(fragile.created());

    let pending = f.begin_invoke(|_, _| 1).unwrap();
    let before = platform.windows_created();
    // Parking window and the form's new handle go through; the child fails.
    platform.fail_create_after(2, NativeError::new(NativeError::NOT_ENOUGH_MEMORY, "no more"));
    assert!(matches!(f.recreate_handle(), Err(Error::HandleCreation(_))));
    assert_eq!(platform.windows_created() - before, 2);

    assert!(f.handle().is_none());
    assert!(!f.created());
    assert!(!f.get_state(State::RECREATE));
    assert!(matches!(pending.wait(), Err(Error::InvalidOperation(_))));

    assert_eq!(kept.handle(), Some(kept_handle));
    assert!(platform.is_window(kept_handle));
    assert_eq!(platform.parent(kept_handle), app.parking_window());
    assert!(kept.get_state2(State2::PARKED));
    assert!(!kept.is_disposed());
    assert!(!fragile.is_disposed());

    f.create_control().unwrap();
    let h = f.handle().unwrap();
    assert_eq!(platform.parent(kept_handle), Some(h));
    assert!(!kept.get_state2(State2::PARKED));
    assert_eq!(platform.parent(fragile.handle().unwrap()), Some(h));
}

#[test]
fn destroyed_handle_comes_back_on_create() {
    let (app, platform) = headless_app();
    let f = form(&app, "form", Rect::new(3, 4, 50, 60)).unwrap();
    f.create_control().unwrap();
    let old = f.handle().unwrap();

    f.destroy_handle().unwrap();
    assert!(f.handle().is_none());
    assert!(!platform.is_window(old));
    assert!(f.created());
    f.destroy_handle().unwrap();

    f.create_handle().unwrap();
    let new = f.handle().unwrap();
    assert_ne!(new, old);
    assert_eq!(platform.window_rect(new), Some(Rect::new(3, 4, 50, 60)));
    assert_eq!(platform.window_text(new), "form");
    assert_eq!(f.bounds(), Rect::new(3, 4, 50, 60));
}

#[test]
fn frame_styles_apply_live_and_others_recreate() {
    let (app, platform) = headless_app();
    let f = form(&app, "form", Rect::default()).unwrap();
    f.create_control().unwrap();
    let h = f.handle().unwrap();

    f.set_style(WindowStyle::BORDER | WindowStyle::VISIBLE).unwrap();
    assert_eq!(f.style(), WindowStyle::BORDER);
    assert_eq!(f.handle(), Some(h));
    assert!(platform.style(h).contains(WindowStyle::BORDER));

    f.set_style(WindowStyle::BORDER | WindowStyle::POPUP).unwrap();
    let recreated = f.handle().unwrap();
    assert_ne!(recreated, h);
    assert!(platform
        .style(recreated)
        .contains(WindowStyle::BORDER | WindowStyle::POPUP));
    assert!(f.created());
}

#[test]
fn dispose_tears_down_tree_once() {
    let (app, platform) = headless_app();
    let f = form(&app, "form", Rect::default()).unwrap();
    let child = child_of(&app, &f, "child").unwrap();
    f.create_control().unwrap();
    let child_handle = child.handle().unwrap();

    let disposed = counter();
    {
        let disposed = disposed.clone();
        child
            .events()
            .disposed
            .subscribe(move |_, _| disposed.set(disposed.get() + 1));
    }

    f.dispose();
    assert!(f.is_disposed());
    assert!(child.is_disposed());
    assert!(f.handle().is_none());
    assert!(child.handle().is_none());
    assert!(!platform.is_window(child_handle));
    assert!(f.properties().is_empty());
    assert!(f.children().is_empty());
    assert!(child.parent().is_none());
    assert_eq!(disposed.get(), 1);
    assert!(app.control(f.id()).is_none());
    assert!(f.state().is_consistent());

    assert!(matches!(f.set_text("again"), Err(Error::Disposed(_))));
    assert!(matches!(f.create_handle(), Err(Error::Disposed(_))));
    assert!(matches!(f.recreate_handle(), Err(Error::Disposed(_))));

    f.dispose();
    child.dispose();
    assert_eq!(disposed.get(), 1);
}

#[test]
fn setters_refuse_a_disposed_control() {
    let (app, _platform) = headless_app();
    let f = form(&app, "form", Rect::default()).unwrap();
    f.create_control().unwrap();
    f.dispose();

    let disposed = |r: Result<(), Error>| matches!(r, Err(Error::Disposed(_)));
    assert!(disposed(f.set_enabled(false)));
    assert!(disposed(f.set_tab_stop(false)));
    assert!(disposed(f.set_region(Some(Region::from_rect(Rect::new(0, 0, 5, 5))))));
    assert!(disposed(f.set_tag(7u32)));
    assert!(disposed(f.set_name("ghost")));
    assert!(disposed(f.set_font(Some(Font::new("Consolas", 12)))));
    assert!(disposed(f.set_back_color(Some(ColorRef::RED))));
    assert!(disposed(f.set_fore_color(Some(ColorRef::GREEN))));
    assert!(disposed(f.set_cursor(Some(Cursor::Hand))));

    assert!(f.properties().is_empty());
    assert!(f.tag::<u32>().is_none());
    assert!(f.region().is_none());
}

#[test]
fn child_without_parent_handle_is_parked_then_adopted() {
    let (app, platform) = headless_app();
    let f = form(&app, "form", Rect::default()).unwrap();
    let child = child_of(&app, &f, "child").unwrap();

    child.create_handle().unwrap();
    let ch = child.handle().unwrap();
    assert!(app.parking_window().is_some());
    assert_eq!(platform.parent(ch), app.parking_window());
    assert!(child.get_state2(State2::PARKED));

    f.create_control().unwrap();
    assert_eq!(child.handle(), Some(ch));
    assert_eq!(platform.parent(ch), f.handle());
    assert!(!child.get_state2(State2::PARKED));
    assert!(child.created());

    f.remove_child(&child).unwrap();
    assert!(child.parent().is_none());
    assert_eq!(platform.parent(ch), app.parking_window());
    assert!(child.get_state2(State2::PARKED));
    assert!(matches!(f.remove_child(&child), Err(Error::InvalidOperation(_))));
}

#[test]
fn adding_a_child_to_a_created_parent_creates_it() {
    let (app, platform) = headless_app();
    let f = form(&app, "form", Rect::default()).unwrap();
    f.create_control().unwrap();

    let child = child_of(&app, &f, "late").unwrap();
    let ch = child.handle().unwrap();
    assert!(child.created());
    assert_eq!(platform.parent(ch), f.handle());

    let hidden = Control::builder(&app).parent(&f).visible(false).build().unwrap();
    assert!(hidden.handle().is_none());
}

#[test]
fn long_captions_are_applied_after_creation() {
    let (app, platform) = headless_app();
    platform.set_max_creation_caption(4);
    let f = form(&app, "Hello, world", Rect::default()).unwrap();
    f.create_handle().unwrap();
    assert_eq!(platform.window_text(f.handle().unwrap()), "Hello, world");
}

#[test]
fn text_region_and_font_reach_the_window() {
    let (app, platform) = headless_app();
    let f = form(&app, "before", Rect::default()).unwrap();
    let region = Region::from_rect(Rect::new(0, 0, 10, 10)).union(Rect::new(20, 0, 10, 10));
    f.set_region(Some(region.clone())).unwrap();
    f.create_handle().unwrap();
    let h = f.handle().unwrap();
    assert_eq!(platform.region(h), Some(region));
    assert_eq!(platform.font(h).unwrap().face_name(), "Segoe UI");

    let changed = counter();
    {
        let changed = changed.clone();
        f.events()
            .text_changed
            .subscribe(move |_, _| changed.set(changed.get() + 1));
    }
    f.set_text("after").unwrap();
    f.set_text("after").unwrap();
    assert_eq!(platform.window_text(h), "after");
    assert_eq!(changed.get(), 1);

    f.set_font(Some(forms_core::Font::new("Consolas", 12))).unwrap();
    assert_eq!(platform.font(h).unwrap().face_name(), "Consolas");
    f.set_region(None).unwrap();
    assert_eq!(platform.region(h), None);
}

#[test]
fn top_level_rules() {
    let (app, platform) = headless_app();
    let f = form(&app, "form", Rect::default()).unwrap();
    let other = form(&app, "other", Rect::default()).unwrap();
    assert!(matches!(f.add_child(&other), Err(Error::InvalidOperation(_))));

    let child = child_of(&app, &f, "child").unwrap();
    assert!(matches!(child.set_top_level(true), Err(Error::InvalidOperation(_))));

    let loose = Control::new(&app).unwrap();
    loose.create_handle().unwrap();
    let before = loose.handle().unwrap();
    assert!(platform.style(before).contains(WindowStyle::CHILD));

    loose.set_top_level(true).unwrap();
    let after = loose.handle().unwrap();
    assert_ne!(before, after);
    assert!(!platform.style(after).contains(WindowStyle::CHILD));
    assert_eq!(platform.parent(after), None);
}

#[test]
fn cycles_are_rejected() {
    let (app, _platform) = headless_app();
    let a = Control::new(&app).unwrap();
    let b = child_of(&app, &a, "b").unwrap();
    let c = child_of(&app, &b, "c").unwrap();

    assert!(matches!(c.add_child(&a), Err(Error::InvalidOperation(_))));
    assert!(matches!(b.add_child(&b), Err(Error::InvalidOperation(_))));
    assert!(a.contains(&c));
    assert_eq!(c.top_level_control(), a);
}

#[test]
fn right_to_left_recreates_and_propagates() {
    let (app, platform) = headless_app();
    let f = form(&app, "form", Rect::default()).unwrap();
    let child = child_of(&app, &f, "child").unwrap();
    let pinned = child_of(&app, &f, "pinned").unwrap();
    pinned.set_right_to_left(RightToLeft::No).unwrap();
    f.create_control().unwrap();
    let (fh, ch, ph) = (
        f.handle().unwrap(),
        child.handle().unwrap(),
        pinned.handle().unwrap(),
    );

    f.set_right_to_left(RightToLeft::Yes).unwrap();

    let new_form = f.handle().unwrap();
    assert_ne!(new_form, fh);
    assert!(f.is_mirrored());
    assert!(platform.extended_style(new_form).contains(ExStyle::LAYOUT_RTL));

    assert_eq!(child.right_to_left(), RightToLeft::Yes);
    assert!(child.is_mirrored());
    assert_ne!(child.handle(), Some(ch));
    assert_eq!(platform.parent(child.handle().unwrap()), Some(new_form));

    assert_eq!(pinned.right_to_left(), RightToLeft::No);
    assert_eq!(pinned.handle(), Some(ph));
    assert!(!pinned.is_mirrored());

    assert!(matches!(
        f.set_right_to_left_raw(7),
        Err(Error::InvalidEnumArgument { value: 7, .. })
    ));
}

#[test]
fn close_destroys_the_window_but_not_the_control() {
    let (app, platform) = headless_app();
    let f = form(&app, "form", Rect::default()).unwrap();
    f.create_control().unwrap();
    let h = f.handle().unwrap();

    f.send_message(RawMessage::simple(MessageId::CLOSE));
    assert!(f.handle().is_none());
    assert!(!platform.is_window(h));
    assert!(f.created());
    assert!(!f.is_disposed());

    f.create_handle().unwrap();
    assert!(f.handle().is_some());
}

#[test]
fn message_hook_sees_messages_first() {
    let (app, _platform) = headless_app();
    let f = form(&app, "form", Rect::default()).unwrap();
    f.create_handle().unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    {
        let seen = seen.clone();
        f.set_message_hook(move |_c: &Control, m: &RawMessage| {
            seen.borrow_mut().push(m.id);
            if m.id == MessageId::CLOSE {
                Some(0)
            } else {
                None
            }
        });
    }

    assert_eq!(f.send_message(RawMessage::simple(MessageId::CLOSE)), Some(0));
    assert!(f.handle().is_some());
    assert_eq!(seen.borrow().as_slice(), &[MessageId::CLOSE]);

    f.clear_message_hook();
    f.send_message(RawMessage::simple(MessageId::CLOSE));
    assert!(f.handle().is_none());
}

#[derive(Default)]
struct RecordingLayout {
    calls: RefCell<Vec<(ControlId, bool)>>,
}

impl LayoutEngine for RecordingLayout {
    fn init_layout(&self, control: &Control, bounds_changed: bool) {
        self.calls.borrow_mut().push((control.id(), bounds_changed));
    }
}

#[test]
fn bounds_changes_reach_window_events_and_layout() {
    common::init_tracing();
    let platform = Rc::new(forms_core::platform::headless::HeadlessPlatform::new());
    let layout = Rc::new(RecordingLayout::default());
    let app = App::builder()
        .platform(platform.clone())
        .layout_engine(layout.clone())
        .build()
        .unwrap();

    let f = form(&app, "form", Rect::new(0, 0, 10, 10)).unwrap();
    let changes = Rc::new(RefCell::new(Vec::new()));
    {
        let changes = changes.clone();
        f.events()
            .bounds_changed
            .subscribe(move |_, r| changes.borrow_mut().push(*r));
    }

    f.set_size(20, 20).unwrap();
    assert_eq!(f.bounds(), Rect::new(0, 0, 20, 20));

    f.create_handle().unwrap();
    let h = f.handle().unwrap();
    assert!(layout.calls.borrow().contains(&(f.id(), false)));
    layout.calls.borrow_mut().clear();

    f.set_bounds(Rect::new(1, 2, 300, 200)).unwrap();
    assert_eq!(platform.window_rect(h), Some(Rect::new(1, 2, 300, 200)));
    assert_eq!(f.bounds(), Rect::new(1, 2, 300, 200));
    assert_eq!(f.client_size(), forms_core::Size::new(300, 200));
    assert_eq!(
        changes.borrow().as_slice(),
        &[Rect::new(0, 0, 20, 20), Rect::new(1, 2, 300, 200)]
    );
    assert_eq!(layout.calls.borrow().as_slice(), &[(f.id(), true)]);

    f.set_bounds(Rect::new(1, 2, 300, 200)).unwrap();
    assert_eq!(changes.borrow().len(), 2);
}

#[derive(Default)]
struct CountingAdapter {
    created: Cell<u32>,
    destroyed: Cell<u32>,
}

impl AccessibilityAdapter for CountingAdapter {
    fn handle_created(&self, _control: &Control) {
        self.created.set(self.created.get() + 1);
    }

    fn handle_destroyed(&self, _control: &Control) {
        self.destroyed.set(self.destroyed.get() + 1);
    }
}

struct PanickingAdapter;

impl AccessibilityAdapter for PanickingAdapter {
    fn handle_created(&self, _control: &Control) {
        panic!("adapter failure");
    }

    fn handle_destroyed(&self, _control: &Control) {}
}

#[test]
fn accessibility_adapter_follows_the_handle() {
    let (app, _platform) = headless_app();
    let adapter = Rc::new(CountingAdapter::default());
    let f = Control::builder(&app)
        .top_level(true)
        .accessibility(adapter.clone())
        .build()
        .unwrap();

    f.create_handle().unwrap();
    f.recreate_handle().unwrap();
    f.destroy_handle().unwrap();
    assert_eq!(adapter.created.get(), 2);
    assert_eq!(adapter.destroyed.get(), 2);

    let fragile = Control::builder(&app)
        .top_level(true)
        .accessibility(Rc::new(PanickingAdapter))
        .build()
        .unwrap();
    fragile.create_handle().unwrap();
    assert!(fragile.handle().is_some());
}

#[test]
fn event_handler_panics_are_contained() {
    let (app, _platform) = headless_app();
    let f = form(&app, "form", Rect::default()).unwrap();
    let after = counter();
    f.events().handle_created.subscribe(|_, _| panic!("handler failure"));
    {
        let after = after.clone();
        f.events()
            .handle_created
            .subscribe(move |_, _| after.set(after.get() + 1));
    }
    f.create_handle().unwrap();
    assert!(f.handle().is_some());
    assert_eq!(after.get(), 1);
}

#[test]
fn visibility_follows_the_window() {
    let (app, platform) = headless_app();
    let f = form(&app, "form", Rect::default()).unwrap();
    f.create_control().unwrap();
    let h = f.handle().unwrap();
    assert!(platform.is_visible(h));

    let seen = Rc::new(RefCell::new(Vec::new()));
    {
        let seen = seen.clone();
        f.events()
            .visible_changed
            .subscribe(move |_, v| seen.borrow_mut().push(*v));
    }
    f.set_visible(false).unwrap();
    assert!(!f.visible());
    assert!(!platform.is_visible(h));
    assert_eq!(seen.borrow().as_slice(), &[false]);

    f.set_enabled(false).unwrap();
    assert!(platform.style(h).contains(WindowStyle::DISABLED));
    f.set_tab_stop(false).unwrap();
    assert!(!platform.style(h).contains(WindowStyle::TAB_STOP));
}

#[test]
fn only_one_app_per_thread() {
    let (_app, _platform) = headless_app();
    assert!(matches!(App::new(), Err(Error::InvalidOperation(_))));
}

struct BlueSite;

impl Site for BlueSite {
    fn name(&self) -> Option<String> {
        Some("designer1".to_string())
    }

    fn ambient_back_color(&self) -> Option<ColorRef> {
        Some(ColorRef::BLUE)
    }
}

#[test]
fn ambient_properties_resolve_through_parent_then_site() {
    let (app, platform) = headless_app();
    let f = Control::builder(&app)
        .top_level(true)
        .site(Rc::new(BlueSite))
        .build()
        .unwrap();
    let child = child_of(&app, &f, "child").unwrap();

    assert_eq!(f.back_color(), ColorRef::BLUE);
    assert_eq!(child.back_color(), ColorRef::BLUE);
    assert_eq!(child.fore_color(), ColorRef::CONTROL_TEXT);
    assert_eq!(child.cursor(), Cursor::Default);
    assert_eq!(f.name(), "designer1");
    f.set_name("main").unwrap();
    assert_eq!(f.name(), "main");

    let seen = Rc::new(RefCell::new(Vec::new()));
    {
        let seen = seen.clone();
        child
            .events()
            .ambient_changed
            .subscribe(move |_, p| seen.borrow_mut().push(*p));
    }

    f.create_control().unwrap();
    f.set_font(Some(Font::new("Consolas", 12))).unwrap();
    assert_eq!(child.font().face_name(), "Consolas");
    assert_eq!(platform.font(child.handle().unwrap()).unwrap().face_name(), "Consolas");

    child.set_fore_color(Some(ColorRef::GREEN)).unwrap();
    f.set_fore_color(Some(ColorRef::RED)).unwrap();
    assert_eq!(child.fore_color(), ColorRef::GREEN);

    f.set_cursor(Some(Cursor::Hand)).unwrap();
    assert_eq!(child.cursor(), Cursor::Hand);

    assert_eq!(
        seen.borrow().as_slice(),
        &[
            AmbientProperty::Font,
            AmbientProperty::ForeColor,
            AmbientProperty::Cursor
        ]
    );

    child.set_fore_color(None).unwrap();
    assert_eq!(child.fore_color(), ColorRef::RED);
}
