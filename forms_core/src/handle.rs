use crate::{Error, NativeHandle, Result};
use core::sync::atomic::{AtomicUsize, Ordering};

/// Holds the native handle a control currently owns, if any.
///
/// Only the affinity thread assigns or releases the handle. Any thread may
/// read it, which is how a cross-thread caller finds a control to marshal
/// through. Assignment and release are single atomic swaps, so a reader sees
/// either the old handle or the new one, never a mix.
#[derive(Debug, Default)]
pub struct NativeHandleOwner {
    current: AtomicUsize,
}

impl NativeHandleOwner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> Option<NativeHandle> {
        NativeHandle::from_raw(self.current.load(Ordering::Acquire))
    }

    pub fn is_live(&self) -> bool {
        self.current.load(Ordering::Acquire) != 0
    }

    /// Takes ownership of `handle`. Fails if a handle is already owned;
    /// the old one has to be released first.
    pub(crate) fn assign(&self, handle: NativeHandle) -> Result<()> {
        self.current
            .compare_exchange(0, handle.as_raw(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| Error::InvalidOperation("control already owns a window handle"))
    }

    /// Gives up the handle without destroying it. Returns what was owned.
    pub(crate) fn release(&self) -> Option<NativeHandle> {
        NativeHandle::from_raw(self.current.swap(0, Ordering::AcqRel))
    }
}
