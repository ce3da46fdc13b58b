//! Typed publish/subscribe used by every component that reports state
//! changes to the embedding viewer.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use indexmap::IndexMap;
use log::warn;

use crate::pose::Pose;

/// An event payload that knows which named channel it belongs to.
pub trait Event {
    type Kind: Copy + Eq + Hash + Debug;

    fn kind(&self) -> Self::Kind;
}

pub type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Handle returned by [`EventEmitter::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Ordered listener sets keyed by event kind.
///
/// Listeners run in subscription order. Subscribing the same `Arc` twice to
/// the same kind returns the original handle instead of registering a
/// duplicate.
pub struct EventEmitter<E: Event> {
    channels: IndexMap<E::Kind, IndexMap<ListenerId, Listener<E>>>,
    next_id: u64,
}

impl<E: Event> EventEmitter<E> {
    pub fn new() -> Self {
        Self {
            channels: IndexMap::new(),
            next_id: 0,
        }
    }

    pub fn on(&mut self, kind: E::Kind, listener: Listener<E>) -> ListenerId {
        let channel = self.channels.entry(kind).or_default();
        if let Some((id, _)) = channel
            .iter()
            .find(|(_, existing)| same_listener(existing, &listener))
        {
            warn!("listener already subscribed to {kind:?}; ignoring duplicate");
            return *id;
        }
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        channel.insert(id, listener);
        id
    }

    /// Removes a listener. Returns `false` when it was not subscribed.
    pub fn off(&mut self, kind: E::Kind, id: ListenerId) -> bool {
        self.channels
            .get_mut(&kind)
            .map(|channel| channel.shift_remove(&id).is_some())
            .unwrap_or(false)
    }

    pub fn off_all(&mut self, kind: E::Kind) {
        self.channels.shift_remove(&kind);
    }

    pub fn clear(&mut self) {
        self.channels.clear();
    }

    pub fn has_listener(&self, kind: E::Kind) -> bool {
        self.listener_count(kind) > 0
    }

    pub fn listener_count(&self, kind: E::Kind) -> usize {
        self.channels.get(&kind).map_or(0, IndexMap::len)
    }

    pub fn total_listeners(&self) -> usize {
        self.channels.values().map(IndexMap::len).sum()
    }

    /// Snapshot of the listeners for `kind`, in subscription order.
    pub fn listeners(&self, kind: E::Kind) -> Vec<Listener<E>> {
        self.channels
            .get(&kind)
            .map(|channel| channel.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn emit(&self, event: &E) {
        if let Some(channel) = self.channels.get(&event.kind()) {
            for listener in channel.values() {
                listener(event);
            }
        }
    }
}

impl<E: Event> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> Debug for EventEmitter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.total_listeners())
            .finish()
    }
}

fn same_listener<E>(a: &Listener<E>, b: &Listener<E>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Events surfaced by the viewer to its embedder.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    PoseChange(Pose),
    ArStart,
    ArEnd,
    /// A hover-mode AR session found a surface the model can be placed on.
    CanPlace,
    ModelPlaced,
    AnimationLoop { clip: usize, count: u32 },
    AnimationFinish { clip: usize },
    ModelLoaded { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewerEventKind {
    PoseChange,
    ArStart,
    ArEnd,
    CanPlace,
    ModelPlaced,
    AnimationLoop,
    AnimationFinish,
    ModelLoaded,
}

impl Event for ViewerEvent {
    type Kind = ViewerEventKind;

    fn kind(&self) -> ViewerEventKind {
        match self {
            ViewerEvent::PoseChange(_) => ViewerEventKind::PoseChange,
            ViewerEvent::ArStart => ViewerEventKind::ArStart,
            ViewerEvent::ArEnd => ViewerEventKind::ArEnd,
            ViewerEvent::CanPlace => ViewerEventKind::CanPlace,
            ViewerEvent::ModelPlaced => ViewerEventKind::ModelPlaced,
            ViewerEvent::AnimationLoop { .. } => ViewerEventKind::AnimationLoop,
            ViewerEvent::AnimationFinish { .. } => ViewerEventKind::AnimationFinish,
            ViewerEvent::ModelLoaded { .. } => ViewerEventKind::ModelLoaded,
        }
    }
}
