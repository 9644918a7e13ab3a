//! Observer registry
//!
//! A plain callback list with unsubscribe handles, used to fan scheduler,
//! camera and overlay notifications out to renderers. Everything runs on
//! one logical thread, so the registry is `Rc<RefCell<..>>` based.
//!
//! Callbacks may subscribe or unsubscribe while a notification is being
//! delivered: a callback added mid-delivery first hears the next
//! notification, and one removed mid-delivery is dropped once it returns.
//!
//! # Example
//!
//! ```
//! use itinera_core::subscription::Subscribers;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let subscribers = Subscribers::<u32>::new();
//! let total = Rc::new(Cell::new(0));
//! let sink = total.clone();
//! let handle = subscribers.subscribe(move |v| sink.set(sink.get() + *v));
//!
//! subscribers.notify(&5);
//! handle.unsubscribe();
//! subscribers.notify(&5);
//! assert_eq!(total.get(), 5);
//! ```

use slotmap::{new_key_type, SlotMap};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

new_key_type! {
    /// Handle to a registered callback
    pub struct SubscriberId;
}

type Callback<T> = Box<dyn FnMut(&T)>;

struct Registry<T> {
    /// `None` while the callback is checked out for delivery
    callbacks: SlotMap<SubscriberId, Option<Callback<T>>>,
}

/// Type-erased removal so handles don't carry the payload type
trait Unsubscribe {
    fn remove(&self, id: SubscriberId) -> bool;
}

impl<T> Unsubscribe for RefCell<Registry<T>> {
    fn remove(&self, id: SubscriberId) -> bool {
        self.borrow_mut().callbacks.remove(id).is_some()
    }
}

/// A list of callbacks interested in values of type `T`
pub struct Subscribers<T: 'static> {
    inner: Rc<RefCell<Registry<T>>>,
}

impl<T: 'static> Subscribers<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Registry {
                callbacks: SlotMap::with_key(),
            })),
        }
    }

    /// Register a callback; keep the handle to unsubscribe later
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: FnMut(&T) + 'static,
    {
        let id = self
            .inner
            .borrow_mut()
            .callbacks
            .insert(Some(Box::new(callback)));
        let registry: Rc<dyn Unsubscribe> = self.inner.clone();
        SubscriptionHandle {
            id,
            registry: Rc::downgrade(&registry),
        }
    }

    /// Deliver `value` to every callback registered before this call
    pub fn notify(&self, value: &T) {
        let ids: Vec<SubscriberId> = self.inner.borrow().callbacks.keys().collect();
        for id in ids {
            let callback = self
                .inner
                .borrow_mut()
                .callbacks
                .get_mut(id)
                .and_then(Option::take);

            if let Some(mut callback) = callback {
                callback(value);
                if let Some(slot) = self.inner.borrow_mut().callbacks.get_mut(id) {
                    *slot = Some(callback);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every callback
    pub fn clear(&self) {
        self.inner.borrow_mut().callbacks.clear();
    }
}

impl<T: 'static> Default for Subscribers<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for unsubscribing a callback
///
/// Dropping the handle leaves the callback registered.
#[derive(Debug)]
pub struct SubscriptionHandle {
    id: SubscriberId,
    registry: Weak<dyn Unsubscribe>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Remove the callback. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.remove(self.id))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_notify_reaches_all_subscribers() {
        let subs = Subscribers::<i32>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for tag in 0..3 {
            let seen = seen.clone();
            let _ = subs.subscribe(move |v| seen.borrow_mut().push((tag, *v)));
        }
        subs.notify(&7);

        assert_eq!(*seen.borrow(), vec![(0, 7), (1, 7), (2, 7)]);
    }

    #[test]
    fn test_unsubscribe_twice_is_harmless() {
        let subs = Subscribers::<()>::new();
        let handle = subs.subscribe(|_| {});
        assert_eq!(subs.len(), 1);
        assert!(handle.unsubscribe());
        assert!(subs.is_empty());
    }

    #[test]
    fn test_handle_outlives_registry() {
        let handle = {
            let subs = Subscribers::<()>::new();
            subs.subscribe(|_| {})
        };
        assert!(!handle.unsubscribe());
    }

    #[test]
    fn test_unsubscribe_from_inside_callback() {
        let subs = Rc::new(Subscribers::<()>::new());
        let calls = Rc::new(Cell::new(0));
        let slot: Rc<RefCell<Option<SubscriptionHandle>>> = Rc::new(RefCell::new(None));

        let handle = {
            let calls = calls.clone();
            let slot = slot.clone();
            subs.subscribe(move |_| {
                calls.set(calls.get() + 1);
                if let Some(h) = slot.borrow_mut().take() {
                    h.unsubscribe();
                }
            })
        };
        *slot.borrow_mut() = Some(handle);

        subs.notify(&());
        subs.notify(&());
        assert_eq!(calls.get(), 1);
        assert!(subs.is_empty());
    }

    #[test]
    fn test_subscribe_from_inside_callback_waits_for_next_notify() {
        let subs = Rc::new(Subscribers::<()>::new());
        let late_calls = Rc::new(Cell::new(0));

        {
            let subs_inner = Rc::downgrade(&subs);
            let late_calls = late_calls.clone();
            let added = Cell::new(false);
            let _ = subs.subscribe(move |_| {
                if !added.replace(true) {
                    if let Some(subs) = subs_inner.upgrade() {
                        let late_calls = late_calls.clone();
                        let _ = subs.subscribe(move |_| late_calls.set(late_calls.get() + 1));
                    }
                }
            });
        }

        subs.notify(&());
        assert_eq!(late_calls.get(), 0);
        subs.notify(&());
        assert_eq!(late_calls.get(), 1);
    }
}
