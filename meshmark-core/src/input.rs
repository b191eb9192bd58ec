//! Window-scoped pointer button tracking.
//!
//! The host forwards every press/release it sees anywhere on its input
//! surface to a [`PointerHub`]. Interested parties hold a
//! [`PointerSubscription`], which unregisters itself when dropped, so a
//! listener can never be registered twice or outlive its owner.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Press,
    Release,
}

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Rc<Cell<bool>>)>,
}

#[derive(Debug, Default)]
pub struct PointerHub {
    registry: Rc<RefCell<Registry>>,
}

impl PointerHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new listener. The button starts out released for it.
    pub fn subscribe(&self) -> PointerSubscription {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        let held = Rc::new(Cell::new(false));
        registry.listeners.push((id, Rc::clone(&held)));
        trace!(id, "pointer listener registered");
        PointerSubscription {
            id,
            held,
            registry: Rc::downgrade(&self.registry),
        }
    }

    pub fn dispatch(&self, event: PointerEvent) {
        let held = event == PointerEvent::Press;
        for (_, state) in &self.registry.borrow().listeners {
            state.set(held);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry.borrow().listeners.len()
    }
}

#[derive(Debug)]
pub struct PointerSubscription {
    id: u64,
    held: Rc<Cell<bool>>,
    registry: Weak<RefCell<Registry>>,
}

impl PointerSubscription {
    /// Whether the button has been pressed and not yet released since subscribing
    pub fn is_held(&self) -> bool {
        self.held.get()
    }
}

impl Drop for PointerSubscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .borrow_mut()
                .listeners
                .retain(|(id, _)| *id != self.id);
            trace!(id = self.id, "pointer listener removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_and_release_reach_subscriber() {
        let hub = PointerHub::new();
        let sub = hub.subscribe();
        assert!(!sub.is_held());
        hub.dispatch(PointerEvent::Press);
        assert!(sub.is_held());
        hub.dispatch(PointerEvent::Release);
        assert!(!sub.is_held());
    }

    #[test]
    fn test_drop_unregisters() {
        let hub = PointerHub::new();
        let sub = hub.subscribe();
        assert_eq!(hub.listener_count(), 1);
        drop(sub);
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn test_press_before_subscribing_is_not_seen() {
        let hub = PointerHub::new();
        hub.dispatch(PointerEvent::Press);
        let sub = hub.subscribe();
        assert!(!sub.is_held());
    }

    #[test]
    fn test_subscription_outliving_hub() {
        let hub = PointerHub::new();
        let sub = hub.subscribe();
        drop(hub);
        assert!(!sub.is_held());
        drop(sub);
    }
}
