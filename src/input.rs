use std::sync::Arc;

use glam::Vec2;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::events::{Event, EventEmitter, Listener, ListenerId};

#[cfg(target_arch = "wasm32")]
pub mod dom;

/// Browser pointer identifier.
pub type PointerId = i32;

/// Identifier for a mouse button (left button is zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MouseButton(u8);

impl MouseButton {
    pub const LEFT: Self = Self(0);
    pub const MIDDLE: Self = Self(1);
    pub const RIGHT: Self = Self(2);

    pub fn new(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn is_primary(self) -> bool {
        self == Self::LEFT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    #[default]
    Mouse,
    Touch,
    Pen,
}

impl PointerKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "touch" => PointerKind::Touch,
            "pen" => PointerKind::Pen,
            _ => PointerKind::Mouse,
        }
    }
}

/// Input delivered by an [`InputSurface`], in element-relative pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown {
        pointer: PointerId,
        kind: PointerKind,
        button: MouseButton,
        position: Vec2,
    },
    PointerMove {
        pointer: PointerId,
        position: Vec2,
    },
    PointerUp {
        pointer: PointerId,
        position: Vec2,
    },
    PointerCancel {
        pointer: PointerId,
    },
    PointerEnter,
    PointerLeave,
    /// Vertical wheel delta in pixels; positive scrolls away from the model.
    Wheel {
        delta: f32,
    },
    ContextMenu,
}

impl InputEvent {
    pub fn mouse_down(button: MouseButton, position: Vec2) -> Self {
        InputEvent::PointerDown {
            pointer: 1,
            kind: PointerKind::Mouse,
            button,
            position,
        }
    }

    pub fn touch_down(pointer: PointerId, position: Vec2) -> Self {
        InputEvent::PointerDown {
            pointer,
            kind: PointerKind::Touch,
            button: MouseButton::LEFT,
            position,
        }
    }

    pub fn pointer_move(pointer: PointerId, position: Vec2) -> Self {
        InputEvent::PointerMove { pointer, position }
    }

    pub fn pointer_up(pointer: PointerId, position: Vec2) -> Self {
        InputEvent::PointerUp { pointer, position }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    PointerDown,
    PointerMove,
    PointerUp,
    PointerCancel,
    PointerEnter,
    PointerLeave,
    Wheel,
    ContextMenu,
}

impl InputKind {
    /// DOM event name the kind is bound to.
    pub fn dom_name(self) -> &'static str {
        match self {
            InputKind::PointerDown => "pointerdown",
            InputKind::PointerMove => "pointermove",
            InputKind::PointerUp => "pointerup",
            InputKind::PointerCancel => "pointercancel",
            InputKind::PointerEnter => "pointerenter",
            InputKind::PointerLeave => "pointerleave",
            InputKind::Wheel => "wheel",
            InputKind::ContextMenu => "contextmenu",
        }
    }
}

impl Event for InputEvent {
    type Kind = InputKind;

    fn kind(&self) -> InputKind {
        match self {
            InputEvent::PointerDown { .. } => InputKind::PointerDown,
            InputEvent::PointerMove { .. } => InputKind::PointerMove,
            InputEvent::PointerUp { .. } => InputKind::PointerUp,
            InputEvent::PointerCancel { .. } => InputKind::PointerCancel,
            InputEvent::PointerEnter => InputKind::PointerEnter,
            InputEvent::PointerLeave => InputKind::PointerLeave,
            InputEvent::Wheel { .. } => InputKind::Wheel,
            InputEvent::ContextMenu => InputKind::ContextMenu,
        }
    }
}

/// The element a control attaches its listeners to.
pub trait InputSurface {
    fn add_listener(&self, kind: InputKind, listener: Listener<InputEvent>) -> ListenerId;

    fn remove_listener(&self, kind: InputKind, id: ListenerId) -> bool;
}

pub type SharedSurface = Arc<dyn InputSurface>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceChange {
    Attached(InputKind),
    Detached(InputKind),
}

/// Headless input surface: records listener changes and dispatches injected
/// events synchronously.
#[derive(Debug, Default)]
pub struct VirtualSurface {
    emitter: Mutex<EventEmitter<InputEvent>>,
    history: Mutex<Vec<SurfaceChange>>,
}

impl VirtualSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Delivers `event` to every listener of its kind, in attach order.
    pub fn dispatch(&self, event: InputEvent) {
        // Listeners may detach themselves, so run them on a snapshot.
        let listeners = self.emitter.lock().listeners(event.kind());
        for listener in listeners {
            listener(&event);
        }
    }

    pub fn dispatch_all(&self, events: impl IntoIterator<Item = InputEvent>) {
        for event in events {
            self.dispatch(event);
        }
    }

    pub fn listener_count(&self, kind: InputKind) -> usize {
        self.emitter.lock().listener_count(kind)
    }

    pub fn total_listeners(&self) -> usize {
        self.emitter.lock().total_listeners()
    }

    pub fn history(&self) -> Vec<SurfaceChange> {
        self.history.lock().clone()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }
}

impl InputSurface for VirtualSurface {
    fn add_listener(&self, kind: InputKind, listener: Listener<InputEvent>) -> ListenerId {
        self.history.lock().push(SurfaceChange::Attached(kind));
        self.emitter.lock().on(kind, listener)
    }

    fn remove_listener(&self, kind: InputKind, id: ListenerId) -> bool {
        let removed = self.emitter.lock().off(kind, id);
        if removed {
            self.history.lock().push(SurfaceChange::Detached(kind));
        }
        removed
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInfo {
    pub kind: PointerKind,
    pub button: MouseButton,
    pub position: Vec2,
}

/// Pointers currently pressed on a surface, in press order.
#[derive(Debug, Clone, Default)]
pub struct PointerTracker {
    pointers: IndexMap<PointerId, PointerInfo>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, pointer: PointerId, info: PointerInfo) {
        self.pointers.insert(pointer, info);
    }

    /// Moves a tracked pointer and returns its previous position.
    pub fn move_to(&mut self, pointer: PointerId, position: Vec2) -> Option<Vec2> {
        let info = self.pointers.get_mut(&pointer)?;
        let previous = info.position;
        info.position = position;
        Some(previous)
    }

    pub fn release(&mut self, pointer: PointerId) -> Option<PointerInfo> {
        self.pointers.shift_remove(&pointer)
    }

    pub fn clear(&mut self) {
        self.pointers.clear();
    }

    pub fn count(&self) -> usize {
        self.pointers.len()
    }

    pub fn get(&self, pointer: PointerId) -> Option<&PointerInfo> {
        self.pointers.get(&pointer)
    }

    pub fn ids(&self) -> Vec<PointerId> {
        self.pointers.keys().copied().collect()
    }

    pub fn first(&self) -> Option<&PointerInfo> {
        self.pointers.values().next()
    }

    /// Midpoint of the first two pointers.
    pub fn centroid(&self) -> Option<Vec2> {
        let (a, b) = self.pair()?;
        Some((a + b) * 0.5)
    }

    /// Distance between the first two pointers.
    pub fn span(&self) -> Option<f32> {
        let (a, b) = self.pair()?;
        Some(a.distance(b))
    }

    /// Angle in degrees of the line from the first to the second pointer.
    pub fn angle(&self) -> Option<f32> {
        let (a, b) = self.pair()?;
        let d = b - a;
        Some(d.y.atan2(d.x).to_degrees())
    }

    fn pair(&self) -> Option<(Vec2, Vec2)> {
        let mut positions = self.pointers.values().map(|info| info.position);
        Some((positions.next()?, positions.next()?))
    }
}

/// Provides the canvas size used to normalise pointer deltas.
pub trait ViewportProvider: Send + Sync {
    fn viewport_size(&self) -> (u32, u32);

    fn viewport_vec(&self) -> Vec2 {
        let (width, height) = self.viewport_size();
        Vec2::new(width.max(1) as f32, height.max(1) as f32)
    }
}

/// Viewport that always reports the same resolution.
#[derive(Debug, Clone, Copy)]
pub struct StaticViewport {
    pub width: u32,
    pub height: u32,
}

impl StaticViewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl ViewportProvider for StaticViewport {
    fn viewport_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Resizable viewport shared between the host and the viewer.
#[derive(Debug)]
pub struct SharedViewport {
    size: RwLock<(u32, u32)>,
}

impl SharedViewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: RwLock::new((width.max(1), height.max(1))),
        }
    }

    pub fn update(&self, width: u32, height: u32) {
        *self.size.write() = (width.max(1), height.max(1));
    }
}

impl ViewportProvider for SharedViewport {
    fn viewport_size(&self) -> (u32, u32) {
        *self.size.read()
    }
}

impl<T> ViewportProvider for Arc<T>
where
    T: ViewportProvider + ?Sized,
{
    fn viewport_size(&self) -> (u32, u32) {
        (**self).viewport_size()
    }
}
