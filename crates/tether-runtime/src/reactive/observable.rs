#![forbid(unsafe_code)]

//! Version-tracked observable fields with subscriber callbacks.
//!
//! An [`Observable<T>`] is the bindable-field primitive: a shared cell with
//! `get`, `set` and `subscribe`. Every other piece of the binding layer
//! (two-way edges, value elements, validation) is built from subscriptions
//! on observables.
//!
//! # Invariants
//!
//! 1. `set` with a value equal to the current one is a no-op: no version
//!    bump, no notifications. Binding propagation relies on this to
//!    converge.
//! 2. `force_set` always stores, bumps the version and notifies.
//! 3. Subscribers run in registration order, with no `RefCell` borrow held,
//!    so a callback may read or write the observable it is subscribed to.
//! 4. Dropping a [`Subscription`] detaches its callback; dead entries are
//!    pruned during the next notification.
//! 5. A subscriber never sees a value older than one it has already been
//!    given: when a callback writes the observable, the nested notification
//!    delivers the new value and the outer round stops.
//!
//! # Failure Modes
//!
//! - Subscriber panic: propagates to the caller of `set`/`force_set`. The
//!   stored value and version are already updated at that point.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_OBSERVABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an observable.
///
/// Clones of an [`Observable`] share the same id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObservableId(u64);

impl ObservableId {
    fn next() -> Self {
        Self(NEXT_OBSERVABLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObservableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obs#{}", self.0)
    }
}

type Callback<T> = dyn Fn(&T);

struct State<T> {
    value: T,
    version: u64,
    subscribers: Vec<Weak<Callback<T>>>,
}

struct Inner<T> {
    id: ObservableId,
    label: Option<Rc<str>>,
    state: RefCell<State<T>>,
}

/// A shared, version-tracked value with change notification.
///
/// Cloning an `Observable` produces another handle to the same value.
pub struct Observable<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create a new observable holding `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::build(None, value)
    }

    /// Create a new observable with a human-readable label.
    ///
    /// The label shows up in binding edges and log output, e.g.
    /// `"settings.volume"`.
    #[must_use]
    pub fn labeled(label: impl Into<Rc<str>>, value: T) -> Self {
        Self::build(Some(label.into()), value)
    }

    fn build(label: Option<Rc<str>>, value: T) -> Self {
        Self {
            inner: Rc::new(Inner {
                id: ObservableId::next(),
                label,
                state: RefCell::new(State {
                    value,
                    version: 0,
                    subscribers: Vec::new(),
                }),
            }),
        }
    }

    /// Clone out the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.state.borrow().value.clone()
    }

    /// Borrow the current value for the duration of `f`.
    ///
    /// `f` must not write to this observable.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.state.borrow().value)
    }

    /// Store `value` and notify subscribers if it differs from the current
    /// value. Returns whether anything changed.
    pub fn set(&self, value: T) -> bool {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.value == value {
                return false;
            }
            state.value = value;
            state.version += 1;
        }
        self.notify();
        true
    }

    /// Store `value` and notify subscribers unconditionally.
    pub fn force_set(&self, value: T) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.value = value;
            state.version += 1;
        }
        self.notify();
    }

    /// Modify the value in place; notifies only if the result differs.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut next = self.get();
        f(&mut next);
        self.set(next)
    }

    /// Number of mutations applied so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.state.borrow().version
    }

    /// Identity shared by all clones of this observable.
    #[must_use]
    pub fn id(&self) -> ObservableId {
        self.inner.id
    }

    /// Label given at construction, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    /// Whether two handles point at the same value.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Register `callback` to run after every change.
    ///
    /// The callback stays registered as long as the returned
    /// [`Subscription`] is alive.
    #[must_use = "dropping the subscription detaches the callback"]
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let callback: Rc<Callback<T>> = Rc::new(callback);
        self.inner
            .state
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&callback));
        Subscription {
            _callback: Box::new(callback),
        }
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .state
            .borrow()
            .subscribers
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    fn notify(&self) {
        let (value, version, callbacks) = {
            let mut state = self.inner.state.borrow_mut();
            state.subscribers.retain(|weak| weak.strong_count() > 0);
            let callbacks: Vec<Rc<Callback<T>>> =
                state.subscribers.iter().filter_map(Weak::upgrade).collect();
            (state.value.clone(), state.version, callbacks)
        };
        for callback in callbacks {
            // A nested write already notified everyone with the newer value.
            if self.inner.state.borrow().version != version {
                break;
            }
            callback(&value);
        }
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Observable")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("value", &state.value)
            .field("version", &state.version)
            .finish()
    }
}

/// RAII guard for an observable callback.
///
/// The callback is detached when the guard is dropped.
#[must_use = "dropping the subscription detaches the callback"]
pub struct Subscription {
    _callback: Box<dyn Any>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
