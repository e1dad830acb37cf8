use crate::Control;

/// Computes the placement of controls. The control machinery only tells the
/// engine when something that affects layout has happened; how children are
/// anchored, docked or stacked is entirely up to the engine.
pub trait LayoutEngine {
    /// Called after `control` was reparented, got a new handle, or had its
    /// bounds changed (`bounds_changed`).
    fn init_layout(&self, control: &Control, bounds_changed: bool);
}

/// Does nothing. Controls keep exactly the bounds they are given.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLayout;

impl LayoutEngine for NullLayout {
    fn init_layout(&self, _control: &Control, _bounds_changed: bool) {}
}
