use std::fmt::Debug;
use std::hash::Hash;

use num_enum::TryFromPrimitive;
use slotmap::{SlotMap, new_key_type};
use tracing::{debug, trace};

use crate::common::collections::HashMap;

new_key_type! {
    pub struct WindowKey;
}

/// An externally owned window object. The registry calls [`release`] exactly
/// once, before the entry is dropped.
///
/// [`release`]: WindowHandle::release
pub trait WindowHandle: Debug {
    type Id: Clone + Eq + Hash + Debug;

    fn id(&self) -> Self::Id;
    fn release(&self);
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ToplevelState: u8 {
        const MAXIMIZED = 1 << 0;
        const MINIMIZED = 1 << 1;
        const ACTIVATED = 1 << 2;
        const FULLSCREEN = 1 << 3;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
enum RawState {
    Maximized = 0,
    Minimized = 1,
    Activated = 2,
    Fullscreen = 3,
}

impl ToplevelState {
    /// Builds the flag set from the protocol's array of state values. Values
    /// this version does not know are ignored.
    pub fn from_raw(values: impl IntoIterator<Item = u32>) -> Self {
        values
            .into_iter()
            .filter_map(|value| match RawState::try_from(value) {
                Ok(state) => Some(state),
                Err(_) => {
                    trace!(value, "ignoring unknown toplevel state");
                    None
                }
            })
            .map(|state| match state {
                RawState::Maximized => ToplevelState::MAXIMIZED,
                RawState::Minimized => ToplevelState::MINIMIZED,
                RawState::Activated => ToplevelState::ACTIVATED,
                RawState::Fullscreen => ToplevelState::FULLSCREEN,
            })
            .collect()
    }
}

#[derive(Debug)]
pub struct TrackedWindow<H> {
    pub handle: H,
    pub title: Option<String>,
    pub app_id: Option<String>,
    pub active: bool,
}

impl<H> TrackedWindow<H> {
    pub fn new(handle: H) -> Self {
        TrackedWindow { handle, title: None, app_id: None, active: false }
    }

    /// The title, else the app id, else `"?"`.
    pub fn label(&self) -> &str {
        self.title.as_deref().or(self.app_id.as_deref()).unwrap_or("?")
    }
}

/// Live set of tracked windows in the order they were first reported.
pub struct Registry<H: WindowHandle> {
    windows: SlotMap<WindowKey, TrackedWindow<H>>,
    order: Vec<WindowKey>,
    by_id: HashMap<H::Id, WindowKey>,
}

impl<H: WindowHandle> Default for Registry<H> {
    fn default() -> Self {
        Registry {
            windows: SlotMap::with_key(),
            order: Vec::new(),
            by_id: HashMap::default(),
        }
    }
}

impl<H: WindowHandle> Registry<H> {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.order.len() }

    pub fn is_empty(&self) -> bool { self.order.is_empty() }

    /// Appends a window for a newly reported handle. A handle that is already
    /// tracked keeps its entry and the duplicate is released.
    pub fn upsert_on_report(&mut self, handle: H) -> WindowKey {
        let id = handle.id();
        if let Some(&key) = self.by_id.get(&id) {
            debug!(?id, "window reported twice");
            handle.release();
            return key;
        }
        let key = self.windows.insert(TrackedWindow::new(handle));
        self.order.push(key);
        self.by_id.insert(id, key);
        key
    }

    pub fn key_of(&self, id: &H::Id) -> Option<WindowKey> { self.by_id.get(id).copied() }

    pub fn get(&self, key: WindowKey) -> Option<&TrackedWindow<H>> { self.windows.get(key) }

    /// Returns false if the handle is not tracked.
    pub fn update_title(&mut self, id: &H::Id, title: String) -> bool {
        self.with_window(id, |window| window.title = Some(title))
    }

    pub fn update_app_id(&mut self, id: &H::Id, app_id: String) -> bool {
        self.with_window(id, |window| window.app_id = Some(app_id))
    }

    /// Recomputes the active flag from scratch.
    pub fn update_active_state(&mut self, id: &H::Id, state: ToplevelState) -> bool {
        self.with_window(id, |window| {
            window.active = state.contains(ToplevelState::ACTIVATED);
        })
    }

    /// Destroys the entry and releases its handle.
    pub fn remove(&mut self, id: &H::Id) -> bool {
        let Some(key) = self.by_id.remove(id) else {
            return false;
        };
        self.order.retain(|k| *k != key);
        if let Some(window) = self.windows.remove(key) {
            window.handle.release();
        }
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (WindowKey, &TrackedWindow<H>)> {
        self.order.iter().filter_map(|&key| self.windows.get(key).map(|w| (key, w)))
    }

    /// Releases every handle and empties the registry.
    pub fn clear(&mut self) {
        self.by_id.clear();
        for key in self.order.drain(..) {
            if let Some(window) = self.windows.remove(key) {
                window.handle.release();
            }
        }
    }

    fn with_window(&mut self, id: &H::Id, f: impl FnOnce(&mut TrackedWindow<H>)) -> bool {
        match self.by_id.get(id).and_then(|&key| self.windows.get_mut(key)) {
            Some(window) => {
                f(window);
                true
            }
            None => false,
        }
    }
}

impl<H: WindowHandle> Drop for Registry<H> {
    fn drop(&mut self) { self.clear(); }
}
