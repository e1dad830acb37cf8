//! Sparse per-control attribute storage.
//!
//! A control type declares many optional attributes, but a typical instance
//! only sets a handful of them. Instead of a field per attribute, each
//! logical attribute gets a [`PropertySlot`] allocated once from a
//! [`SlotRegistry`], and each control carries a [`PropertyStore`] that only
//! holds the slots it has actually been given a value for.
//!
//! Absence of a slot means "use the default". That is different from a slot
//! that was explicitly set to a value that happens to equal the default.

use crate::ColorRef;
use core::any::Any;
use core::sync::atomic::{AtomicU32, Ordering};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, OnceLock};

/// Key for one logical optional attribute.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct PropertySlot(u32);

impl PropertySlot {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Allocates property slots. Every slot handed out by one registry is
/// distinct from every other slot handed out by it, on any thread.
#[derive(Debug, Default)]
pub struct SlotRegistry {
    next: AtomicU32,
}

impl SlotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry used when an app is not given one explicitly.
    pub fn global() -> Arc<SlotRegistry> {
        static GLOBAL: OnceLock<Arc<SlotRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(SlotRegistry::new())))
    }

    pub fn allocate(&self) -> PropertySlot {
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        assert!(index != u32::MAX, "property slot space exhausted");
        PropertySlot(index)
    }

    /// Number of slots allocated so far.
    pub fn allocated(&self) -> u32 {
        self.next.load(Ordering::Relaxed)
    }
}

/// Holds the values of the slots that have been set on one control.
///
/// Objects, integers and colors live in separate tables, so a slot that was
/// written as an integer is "not found" when read as an object.
#[derive(Default)]
pub struct PropertyStore {
    objects: HashMap<PropertySlot, Rc<dyn Any>>,
    integers: HashMap<PropertySlot, i32>,
    colors: HashMap<PropertySlot, ColorRef>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_object(&self, slot: PropertySlot) -> bool {
        self.objects.contains_key(&slot)
    }

    /// Returns the object stored in `slot`, if there is one and it has type `T`.
    pub fn get_object<T: Any>(&self, slot: PropertySlot) -> Option<Rc<T>> {
        let value = self.objects.get(&slot)?;
        Rc::clone(value).downcast::<T>().ok()
    }

    pub fn set_object<T: Any>(&mut self, slot: PropertySlot, value: T) {
        self.objects.insert(slot, Rc::new(value));
    }

    pub fn set_object_rc(&mut self, slot: PropertySlot, value: Rc<dyn Any>) {
        self.objects.insert(slot, value);
    }

    pub fn remove_object(&mut self, slot: PropertySlot) -> bool {
        self.objects.remove(&slot).is_some()
    }

    pub fn contains_integer(&self, slot: PropertySlot) -> bool {
        self.integers.contains_key(&slot)
    }

    pub fn get_integer(&self, slot: PropertySlot) -> Option<i32> {
        self.integers.get(&slot).copied()
    }

    pub fn get_integer_or(&self, slot: PropertySlot, default: i32) -> i32 {
        self.get_integer(slot).unwrap_or(default)
    }

    pub fn set_integer(&mut self, slot: PropertySlot, value: i32) {
        self.integers.insert(slot, value);
    }

    pub fn remove_integer(&mut self, slot: PropertySlot) -> bool {
        self.integers.remove(&slot).is_some()
    }

    pub fn contains_color(&self, slot: PropertySlot) -> bool {
        self.colors.contains_key(&slot)
    }

    pub fn get_color(&self, slot: PropertySlot) -> Option<ColorRef> {
        self.colors.get(&slot).copied()
    }

    pub fn get_color_or(&self, slot: PropertySlot, default: ColorRef) -> ColorRef {
        self.get_color(slot).unwrap_or(default)
    }

    pub fn set_color(&mut self, slot: PropertySlot, value: ColorRef) {
        self.colors.insert(slot, value);
    }

    pub fn remove_color(&mut self, slot: PropertySlot) -> bool {
        self.colors.remove(&slot).is_some()
    }

    /// Number of entries that have been set, across all tables.
    pub fn len(&self) -> usize {
        self.objects.len() + self.integers.len() + self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.integers.clear();
        self.colors.clear();
    }
}

impl core::fmt::Debug for PropertyStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PropertyStore")
            .field("objects", &self.objects.len())
            .field("integers", &self.integers)
            .field("colors", &self.colors)
            .finish()
    }
}

/// The slots used by the base control. Allocated once per app.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ControlSlots {
    pub(crate) text: PropertySlot,
    pub(crate) font: PropertySlot,
    pub(crate) back_color: PropertySlot,
    pub(crate) fore_color: PropertySlot,
    pub(crate) cursor: PropertySlot,
    pub(crate) region: PropertySlot,
    pub(crate) right_to_left: PropertySlot,
    pub(crate) tag: PropertySlot,
    pub(crate) name: PropertySlot,
}

impl ControlSlots {
    pub(crate) fn allocate(registry: &SlotRegistry) -> Self {
        Self {
            text: registry.allocate(),
            font: registry.allocate(),
            back_color: registry.allocate(),
            fore_color: registry.allocate(),
            cursor: registry.allocate(),
            region: registry.allocate(),
            right_to_left: registry.allocate(),
            tag: registry.allocate(),
            name: registry.allocate(),
        }
    }
}
