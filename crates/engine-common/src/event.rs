//! Typed publish/subscribe bus. Grounded in the reference counting pattern of
//! `examples/original_source/source/module/core/public/event.hpp`'s
//! `event<As...>` / `handler<O, As...>`, but reshaped around Rust ownership
//! instead of the original's manually-managed handler pointer set:
//!
//! - A [`Handler`] strongly owns its callback slot. The receiver holds the
//!   `Handler` (typically as a struct field); when the receiver drops it the
//!   slot deallocates.
//! - An [`Event`] only holds `Weak` references into handler slots. A dead
//!   weak reference silently fails to upgrade during `publish`, which *is*
//!   detachment -- no explicit handler-side unsubscribe call is needed.
//! - Dropping the `Event` itself just drops its `Weak` list. Any `Handler`s
//!   the receiver still owns stay allocated (inert -- nothing will ever call
//!   them again) until the receiver drops them, matching the original's
//!   "handler becomes invalid, memory reclaimed by the receiver" contract.
//!
//! Single-threaded by design, matching the engine's no-concurrency model:
//! `Event`/`Handler` are neither `Send` nor `Sync`.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Slot<Args> = RefCell<dyn FnMut(&Args)>;

/// An active subscription. Keep this alive for as long as the callback
/// should keep firing; drop it to detach.
pub struct Handler<Args> {
    slot: Rc<Slot<Args>>,
}

impl<Args> Handler<Args> {
    /// Whether some `Event` still holds a weak reference to this handler's
    /// slot. Goes `false` once the owning `Event` is dropped (or has pruned
    /// this entry), even though the slot itself stays allocated here.
    pub fn is_attached(&self) -> bool {
        Rc::weak_count(&self.slot) > 0
    }
}

/// A named pub/sub channel for one argument type.
pub struct Event<Args> {
    name: &'static str,
    handlers: RefCell<Vec<Weak<Slot<Args>>>>,
}

impl<Args> Event<Args> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handlers: RefCell::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Register `callback`, returning the [`Handler`] that keeps it alive.
    pub fn subscribe(&self, callback: impl FnMut(&Args) + 'static) -> Handler<Args> {
        let slot: Rc<Slot<Args>> = Rc::new(RefCell::new(callback));
        self.handlers.borrow_mut().push(Rc::downgrade(&slot));
        Handler { slot }
    }

    /// Invoke every live handler, in registration order, with `args`.
    /// Handlers whose `Handler` has already been dropped are pruned first.
    pub fn publish(&self, args: &Args) {
        let live: Vec<Rc<Slot<Args>>> = {
            let mut handlers = self.handlers.borrow_mut();
            handlers.retain(|weak| weak.strong_count() > 0);
            handlers.iter().filter_map(Weak::upgrade).collect()
        };
        for slot in live {
            (slot.borrow_mut())(args);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.borrow().iter().filter(|w| w.strong_count() > 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn publish_invokes_all_live_handlers_in_order() {
        let event: Event<u32> = Event::new("test");
        let order = Rc::new(RefCell::new(Vec::new()));

        let o1 = Rc::clone(&order);
        let h1 = event.subscribe(move |v| o1.borrow_mut().push(("a", *v)));
        let o2 = Rc::clone(&order);
        let h2 = event.subscribe(move |v| o2.borrow_mut().push(("b", *v)));

        event.publish(&7);
        assert_eq!(*order.borrow(), vec![("a", 7), ("b", 7)]);
        drop(h1);
        drop(h2);
    }

    #[test]
    fn dropping_handler_detaches_it() {
        let event: Event<u32> = Event::new("test");
        let calls = Rc::new(Cell::new(0));

        let c = Rc::clone(&calls);
        let handler = event.subscribe(move |_| c.set(c.get() + 1));
        event.publish(&1);
        assert_eq!(calls.get(), 1);

        drop(handler);
        event.publish(&1);
        assert_eq!(calls.get(), 1, "handler must not fire after being dropped");
    }

    #[test]
    fn dropping_event_leaves_handler_inert_but_allocated() {
        let calls = Rc::new(Cell::new(0));
        let handler = {
            let event: Event<u32> = Event::new("test");
            let c = Rc::clone(&calls);
            let handler = event.subscribe(move |_| c.set(c.get() + 1));
            event.publish(&1);
            handler
        };
        assert_eq!(calls.get(), 1);
        assert!(!handler.is_attached());
    }
}
