//! Subscription and data-cell primitives shared by the stores
//!
//! A store keeps its published state in a [`DataManager`]: a
//! mutable-by-replacement cell paired with a listener registry. Every
//! mutation computes one full next-state plus the ordered batch of events
//! describing the change, then commits both with a single [`DataManager::set`]
//! call, so listeners never observe a state/event mismatch.

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

/// Handle identifying one subscription, consumed by `unsubscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

type Listener<S, E> = Rc<dyn Fn(&S, &[E])>;

/// Ordered listener registry
///
/// Listeners run synchronously, in subscription order, against a snapshot of
/// the registry taken when `notify` starts: unsubscribing inside a listener
/// does not affect the current pass. Listener panics propagate to the caller
/// of `notify`; there is no isolation or retry.
pub struct Subscribers<S, E> {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(u64, Listener<S, E>)>>,
}

impl<S, E> Subscribers<S, E> {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
        }
    }

    /// Register a listener, returning the handle that removes it
    pub fn subscribe(&self, listener: impl Fn(&S, &[E]) + 'static) -> ListenerId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        ListenerId(id)
    }

    /// Remove a previously registered listener; unknown handles are ignored
    pub fn unsubscribe(&self, id: ListenerId) {
        self.listeners
            .borrow_mut()
            .retain(|(listener_id, _)| *listener_id != id.0);
    }

    /// Invoke every listener with the new state and the event batch
    pub fn notify(&self, state: &S, events: &[E]) {
        let snapshot: Vec<Listener<S, E>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(state, events);
        }
    }
}

impl<S, E> Default for Subscribers<S, E> {
    fn default() -> Self {
        Self::new()
    }
}

/// State cell with wholesale replacement and change notification
///
/// Not reentrant: a listener that synchronously triggers another mutation on
/// the owning store will hit the cell's borrow guard.
pub struct DataManager<S, E> {
    cell: RefCell<S>,
    subscribers: Subscribers<S, E>,
}

impl<S: Clone, E> DataManager<S, E> {
    pub fn new(initial: S) -> Self {
        Self {
            cell: RefCell::new(initial),
            subscribers: Subscribers::new(),
        }
    }

    /// Borrow the current state
    pub fn get(&self) -> Ref<'_, S> {
        self.cell.borrow()
    }

    /// Deep-copy the current state
    pub fn clone_data(&self) -> S {
        self.cell.borrow().clone()
    }

    /// Replace the state wholesale and notify subscribers
    pub fn set(&self, next: S, events: Vec<E>) {
        *self.cell.borrow_mut() = next;
        let state = self.cell.borrow();
        self.subscribers.notify(&state, &events);
    }

    /// Register a listener on the underlying registry
    pub fn subscribe(&self, listener: impl Fn(&S, &[E]) + 'static) -> ListenerId {
        self.subscribers.subscribe(listener)
    }

    /// Remove a listener from the underlying registry
    pub fn unsubscribe(&self, id: ListenerId) {
        self.subscribers.unsubscribe(id)
    }
}
