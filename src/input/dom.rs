use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use gloo_events::{EventListener, EventListenerOptions};
use indexmap::IndexMap;
use log::debug;
use wasm_bindgen::JsCast;
use web_sys::{HtmlElement, PointerEvent, WheelEvent};

use super::{InputEvent, InputKind, InputSurface, MouseButton, PointerKind};
use crate::events::{EventEmitter, Listener, ListenerId};

/// [`InputSurface`] backed by a DOM element.
///
/// One DOM listener is installed per event kind while at least one control
/// listens to that kind; it converts the browser event and fans it out to
/// the controls in attach order.
pub struct DomSurface {
    element: HtmlElement,
    emitter: Rc<RefCell<EventEmitter<InputEvent>>>,
    dom: RefCell<IndexMap<InputKind, EventListener>>,
}

impl DomSurface {
    pub fn new(element: HtmlElement) -> Self {
        Self {
            element,
            emitter: Rc::new(RefCell::new(EventEmitter::new())),
            dom: RefCell::new(IndexMap::new()),
        }
    }

    pub fn element(&self) -> &HtmlElement {
        &self.element
    }

    fn install(&self, kind: InputKind) {
        let emitter = Rc::clone(&self.emitter);
        let element = self.element.clone();
        let options = match kind {
            InputKind::Wheel | InputKind::ContextMenu => EventListenerOptions::enable_prevent_default(),
            _ => EventListenerOptions::default(),
        };
        let listener = EventListener::new_with_options(
            &self.element,
            kind.dom_name(),
            options,
            move |event| {
                let Some(input) = convert(kind, event) else {
                    return;
                };
                match input {
                    InputEvent::Wheel { .. } | InputEvent::ContextMenu => event.prevent_default(),
                    InputEvent::PointerDown { pointer, .. } => {
                        let _ = element.set_pointer_capture(pointer);
                    }
                    _ => {}
                }
                let listeners = emitter.borrow().listeners(kind);
                for listener in listeners {
                    listener(&input);
                }
            },
        );
        debug!("listening for {} events", kind.dom_name());
        self.dom.borrow_mut().insert(kind, listener);
    }
}

impl InputSurface for DomSurface {
    fn add_listener(&self, kind: InputKind, listener: Listener<InputEvent>) -> ListenerId {
        let id = self.emitter.borrow_mut().on(kind, listener);
        if !self.dom.borrow().contains_key(&kind) {
            self.install(kind);
        }
        id
    }

    fn remove_listener(&self, kind: InputKind, id: ListenerId) -> bool {
        let removed = self.emitter.borrow_mut().off(kind, id);
        if removed && !self.emitter.borrow().has_listener(kind) {
            self.dom.borrow_mut().shift_remove(&kind);
        }
        removed
    }
}

fn convert(kind: InputKind, event: &web_sys::Event) -> Option<InputEvent> {
    match kind {
        InputKind::Wheel => {
            let wheel = event.dyn_ref::<WheelEvent>()?;
            Some(InputEvent::Wheel {
                delta: wheel.delta_y() as f32,
            })
        }
        InputKind::ContextMenu => Some(InputEvent::ContextMenu),
        InputKind::PointerEnter => Some(InputEvent::PointerEnter),
        InputKind::PointerLeave => Some(InputEvent::PointerLeave),
        InputKind::PointerDown
        | InputKind::PointerMove
        | InputKind::PointerUp
        | InputKind::PointerCancel => {
            let pointer = event.dyn_ref::<PointerEvent>()?;
            let id = pointer.pointer_id();
            let position = Vec2::new(pointer.offset_x() as f32, pointer.offset_y() as f32);
            Some(match kind {
                InputKind::PointerDown => InputEvent::PointerDown {
                    pointer: id,
                    kind: PointerKind::from_name(&pointer.pointer_type()),
                    button: MouseButton::new(pointer.button().max(0) as u8),
                    position,
                },
                InputKind::PointerMove => InputEvent::PointerMove {
                    pointer: id,
                    position,
                },
                InputKind::PointerUp => InputEvent::PointerUp {
                    pointer: id,
                    position,
                },
                _ => InputEvent::PointerCancel { pointer: id },
            })
        }
    }
}
