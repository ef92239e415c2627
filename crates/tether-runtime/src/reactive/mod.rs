#![forbid(unsafe_code)]

//! Reactive data bindings for Tether.
//!
//! This module provides the change-tracking primitives value elements are
//! built from:
//!
//! - [`Observable`]: shared field with a version counter and change
//!   callbacks; the unit a binding edge connects.
//! - [`Subscription`]: keeps one callback attached while alive.
//! - [`BindingCoordinator`]: Creates one-way and two-way bindings between
//!   observables and keeps the registry of live edges.
//! - [`BindingScope`]: Holds the subscriptions and bindings of one owner.
//!
//! # Architecture
//!
//! Fields are single-threaded (`Rc<RefCell<..>>`). An observable only keeps
//! `Weak` references to its callbacks, pruned when it next notifies; the
//! [`Subscription`] owns the callback.
//!
//! Bindings are subscriptions owned by the coordinator's registry. The
//! registry entry, and with it the propagation callbacks, lives until its
//! [`BindingHandle`] is dropped or the edge is unbound by id.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per stored mutation.
//! 2. Subscribers are notified in registration order.
//! 3. `set` with a value equal to the current value is a no-op (no version
//!    bump, no notifications); `force_set` always notifies.
//! 4. A callback whose [`Subscription`] was dropped is not invoked again.
//! 5. Two-way bindings converge: a propagated write never travels back along
//!    the edge it arrived on.

pub mod binding;
pub mod observable;

pub use binding::{
    BindingCoordinator, BindingEdge, BindingHandle, BindingId, BindingScope, Direction, FieldKey,
    identity,
};
pub use observable::{Observable, ObservableId, Subscription};
