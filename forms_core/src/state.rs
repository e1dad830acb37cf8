//! Packed boolean state of a control.

use bitflags::bitflags;
use core::cell::Cell;

bitflags! {
    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
    pub struct State: u32 {
        /// `create_control` has run. Survives handle destruction so that the
        /// control comes back when its parent is created again.
        const CREATED = 1 << 0;
        const VISIBLE = 1 << 1;
        const ENABLED = 1 << 2;
        const TAB_STOP = 1 << 3;
        /// A destroy-then-create sequence is in progress.
        const RECREATE = 1 << 4;
        const CREATING_HANDLE = 1 << 5;
        const DISPOSING = 1 << 6;
        const DISPOSED = 1 << 7;
        const TOP_LEVEL = 1 << 8;
        const MIRRORED = 1 << 9;
        const FOCUSED = 1 << 10;
        const DESTROYING = 1 << 11;
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
    pub struct State2: u32 {
        /// A cross-thread call has been marshaled through this control.
        const HAVE_INVOKED = 1 << 0;
        /// The handle currently lives under the parking window.
        const PARKED = 1 << 1;
        /// "handle created" has been raised for the current handle.
        const HANDLE_NOTIFIED = 1 << 2;
    }
}

/// Two words of flags. Reads and writes are plain bit operations; callers
/// are responsible for not producing contradictory combinations.
#[derive(Debug)]
pub struct ControlState {
    state: Cell<State>,
    state2: Cell<State2>,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            state: Cell::new(State::VISIBLE | State::ENABLED | State::TAB_STOP),
            state2: Cell::new(State2::empty()),
        }
    }
}

impl ControlState {
    pub fn get_state(&self, flag: State) -> bool {
        self.state.get().contains(flag)
    }

    pub fn set_state(&self, flag: State, value: bool) {
        let mut bits = self.state.get();
        bits.set(flag, value);
        self.state.set(bits);
    }

    pub fn get_state2(&self, flag: State2) -> bool {
        self.state2.get().contains(flag)
    }

    pub fn set_state2(&self, flag: State2, value: bool) {
        let mut bits = self.state2.get();
        bits.set(flag, value);
        self.state2.set(bits);
    }

    pub fn bits(&self) -> (State, State2) {
        (self.state.get(), self.state2.get())
    }

    /// False for combinations no lifecycle path should ever produce.
    pub fn is_consistent(&self) -> bool {
        let s = self.state.get();
        let disposed = s.contains(State::DISPOSED);
        if disposed
            && s.intersects(State::CREATING_HANDLE | State::RECREATE | State::DISPOSING | State::CREATED)
        {
            return false;
        }
        if s.contains(State::CREATING_HANDLE) && s.contains(State::DESTROYING) {
            return false;
        }
        if s.contains(State::FOCUSED) && !s.contains(State::VISIBLE) {
            return false;
        }
        true
    }
}
