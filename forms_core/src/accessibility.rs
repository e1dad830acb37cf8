use crate::Control;

/// Bridges a control to an accessibility object tree. The adapter only
/// learns when the control's native handle comes and goes; it never sees the
/// control's internal state.
///
/// Panics raised by an adapter are contained and logged.
pub trait AccessibilityAdapter {
    fn handle_created(&self, control: &Control);

    fn handle_destroyed(&self, control: &Control);
}
