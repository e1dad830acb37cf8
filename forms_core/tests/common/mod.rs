#![allow(dead_code)]

use forms_core::platform::headless::HeadlessPlatform;
use forms_core::{App, Control, Rect, Result};
use std::rc::Rc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An app on the calling thread, backed by a fresh headless platform.
pub fn headless_app() -> (App, Rc<HeadlessPlatform>) {
    init_tracing();
    let platform = Rc::new(HeadlessPlatform::new());
    let app = App::builder()
        .platform(platform.clone())
        .invoke_poll_interval(Duration::from_millis(50))
        .build()
        .unwrap();
    (app, platform)
}

/// A top-level control, so creating it never needs the parking window.
pub fn form(app: &App, text: &str, bounds: Rect) -> Result<Control> {
    Control::builder(app)
        .top_level(true)
        .text(text)
        .bounds(bounds)
        .build()
}

pub fn child_of(app: &App, parent: &Control, text: &str) -> Result<Control> {
    Control::builder(app)
        .parent(parent)
        .text(text)
        .bounds(Rect::new(5, 5, 50, 20))
        .build()
}
