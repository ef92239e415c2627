#![forbid(unsafe_code)]

//! Reactive runtime for Tether.
//!
//! Observable fields and the binding graph that value elements, bound
//! application state and validation all hang off.

pub mod reactive;

pub use reactive::{
    BindingCoordinator, BindingEdge, BindingHandle, BindingId, BindingScope, Direction, FieldKey,
    Observable, ObservableId, Subscription, identity,
};
