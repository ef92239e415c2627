#![forbid(unsafe_code)]

//! Binding edges between [`Observable`] fields.
//!
//! A binding is a declared propagation edge between two fields. The
//! [`BindingCoordinator`] creates the propagation callbacks and keeps an
//! explicit registry of every live edge, so the binding graph can be
//! inspected and torn down by id.
//!
//! # Usage
//!
//! ```ignore
//! use tether_runtime::reactive::{BindingCoordinator, Observable};
//!
//! let bindings = BindingCoordinator::new();
//! let meters = Observable::labeled("meters", 0);
//! let centimeters = Observable::labeled("centimeters", 250);
//!
//! let _edge = bindings.bind(&meters, &centimeters, |m| m * 100, |cm| cm / 100);
//! // `bind` pulls from the other side first, then pushes back.
//! assert_eq!(meters.get(), 2);
//! assert_eq!(centimeters.get(), 200);
//!
//! meters.set(3);
//! assert_eq!(centimeters.get(), 300);
//! ```
//!
//! # Initial Sync
//!
//! - `bind_to` pushes `forward(owner)` into the other field immediately.
//! - `bind_from` pulls `backward(other)` into the owner immediately.
//! - `bind` does `bind_from` followed by `bind_to`.
//!
//! # Invariants
//!
//! 1. Every propagated write goes through [`Observable::set`], so writing a
//!    value the field already holds stops the propagation.
//! 2. A two-way edge never runs its reciprocal callback: a re-entrancy
//!    guard shared by both directions blocks it. Instead, each direction
//!    ends with one equality-gated settle write of `forward(owner)` into
//!    the other field, so after propagation `other == forward(owner)` even
//!    for clamping or lossy transforms.
//! 3. An edge is registered for exactly as long as its propagation
//!    callbacks are alive.
//! 4. Dropping a [`BindingHandle`] (unless persisted) or calling
//!    [`BindingCoordinator::unbind`] disconnects both directions.
//!
//! # Failure Modes
//!
//! - Transform panic: propagates to the caller of the write that triggered
//!   it. The re-entrancy guard is released during unwinding.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use super::observable::{Observable, ObservableId, Subscription};

thread_local! {
    static GLOBAL_COORDINATOR: BindingCoordinator = BindingCoordinator::new();
}

/// Identity transform, the default `forward`/`backward` for bindings.
pub fn identity<T: Clone>(value: &T) -> T {
    value.clone()
}

/// Identifier of a registered binding edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BindingId(u64);

impl BindingId {
    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "binding#{}", self.0)
    }
}

/// Names one end of a binding edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldKey {
    /// Identity of the bound observable.
    pub observable: ObservableId,
    /// Optional label of the bound observable.
    pub label: Option<Rc<str>>,
}

impl FieldKey {
    /// Key for the given observable.
    #[must_use]
    pub fn of<T: Clone + PartialEq + 'static>(observable: &Observable<T>) -> Self {
        Self {
            observable: observable.id(),
            label: observable.label().map(Rc::from),
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{label}"),
            None => write!(f, "{}", self.observable),
        }
    }
}

/// Which way values flow along an edge, seen from the owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Owner to other.
    Forward,
    /// Other to owner.
    Backward,
    /// Both ways.
    TwoWay,
}

/// A registered propagation edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindingEdge {
    /// Registry id.
    pub id: BindingId,
    /// The field the binding was declared on.
    pub owner: FieldKey,
    /// The field on the other side.
    pub other: FieldKey,
    /// Propagation direction.
    pub direction: Direction,
}

impl BindingEdge {
    /// Whether either end of this edge is the given observable.
    #[must_use]
    pub fn touches(&self, observable: ObservableId) -> bool {
        self.owner.observable == observable || self.other.observable == observable
    }
}

struct Entry {
    edge: BindingEdge,
    _subscriptions: Vec<Subscription>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: BTreeMap<BindingId, Entry>,
}

/// Creates bindings and keeps the registry of live edges.
///
/// Cloning yields another handle to the same registry. Each thread has a
/// [`global`](Self::global) coordinator; independent coordinators can be
/// created with [`new`](Self::new).
#[derive(Clone, Default)]
pub struct BindingCoordinator {
    registry: Rc<RefCell<Registry>>,
}

impl BindingCoordinator {
    /// Create an empty coordinator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Access the thread-local coordinator.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL_COORDINATOR.with(Clone::clone)
    }

    /// One-way binding from `owner` to `other`, applying `forward`.
    pub fn bind_to<S, T>(
        &self,
        owner: &Observable<S>,
        other: &Observable<T>,
        forward: impl Fn(&S) -> T + 'static,
    ) -> BindingHandle
    where
        S: Clone + PartialEq + 'static,
        T: Clone + PartialEq + 'static,
    {
        let current = owner.get();
        other.set(forward(&current));

        let target = other.clone();
        let sub = owner.subscribe(move |value| {
            target.set(forward(value));
        });
        self.register(
            FieldKey::of(owner),
            FieldKey::of(other),
            Direction::Forward,
            vec![sub],
        )
    }

    /// One-way binding from `other` into `owner`, applying `backward`.
    pub fn bind_from<S, T>(
        &self,
        owner: &Observable<S>,
        other: &Observable<T>,
        backward: impl Fn(&T) -> S + 'static,
    ) -> BindingHandle
    where
        S: Clone + PartialEq + 'static,
        T: Clone + PartialEq + 'static,
    {
        let current = other.get();
        owner.set(backward(&current));

        let target = owner.clone();
        let sub = other.subscribe(move |value| {
            target.set(backward(value));
        });
        self.register(
            FieldKey::of(owner),
            FieldKey::of(other),
            Direction::Backward,
            vec![sub],
        )
    }

    /// Two-way binding between `owner` and `other`.
    ///
    /// The owner first takes `backward(other)`, then `other` takes
    /// `forward(owner)`.
    pub fn bind<S, T>(
        &self,
        owner: &Observable<S>,
        other: &Observable<T>,
        forward: impl Fn(&S) -> T + 'static,
        backward: impl Fn(&T) -> S + 'static,
    ) -> BindingHandle
    where
        S: Clone + PartialEq + 'static,
        T: Clone + PartialEq + 'static,
    {
        let pulled = other.get();
        owner.set(backward(&pulled));
        let pushed = owner.get();
        other.set(forward(&pushed));

        let forward = Rc::new(forward);
        let syncing = Rc::new(Cell::new(false));

        // owner → other
        let (source, target) = (owner.clone(), other.clone());
        let push = Rc::clone(&forward);
        let guard = Rc::clone(&syncing);
        let sub_forward = owner.subscribe(move |value| {
            if let Some(_reentry) = Reentry::enter(&guard) {
                target.set(push(value));
                // A subscriber of `other` may have rewritten the owner.
                target.set(push(&source.get()));
            }
        });

        // other → owner
        let (target, settle) = (owner.clone(), other.clone());
        let push = forward;
        let guard = Rc::clone(&syncing);
        let sub_backward = other.subscribe(move |value| {
            if let Some(_reentry) = Reentry::enter(&guard) {
                target.set(backward(value));
                // `backward` may clamp or lose information.
                settle.set(push(&target.get()));
            }
        });

        self.register(
            FieldKey::of(owner),
            FieldKey::of(other),
            Direction::TwoWay,
            vec![sub_forward, sub_backward],
        )
    }

    /// Remove an edge by id. Returns whether it was registered.
    pub fn unbind(&self, id: BindingId) -> bool {
        let removed = self.registry.borrow_mut().entries.remove(&id);
        if removed.is_some() {
            tracing::trace!(binding = %id, "binding removed");
        }
        removed.is_some()
    }

    /// Snapshot of all live edges, ordered by id.
    #[must_use]
    pub fn edges(&self) -> Vec<BindingEdge> {
        self.registry
            .borrow()
            .entries
            .values()
            .map(|entry| entry.edge.clone())
            .collect()
    }

    /// Live edges with either end on `observable`.
    #[must_use]
    pub fn edges_touching(&self, observable: ObservableId) -> Vec<BindingEdge> {
        self.registry
            .borrow()
            .entries
            .values()
            .filter(|entry| entry.edge.touches(observable))
            .map(|entry| entry.edge.clone())
            .collect()
    }

    /// Number of live edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.registry.borrow().entries.len()
    }

    fn register(
        &self,
        owner: FieldKey,
        other: FieldKey,
        direction: Direction,
        subscriptions: Vec<Subscription>,
    ) -> BindingHandle {
        let mut registry = self.registry.borrow_mut();
        registry.next_id += 1;
        let id = BindingId(registry.next_id);
        tracing::trace!(binding = %id, %owner, %other, ?direction, "binding registered");
        registry.entries.insert(
            id,
            Entry {
                edge: BindingEdge {
                    id,
                    owner,
                    other,
                    direction,
                },
                _subscriptions: subscriptions,
            },
        );
        BindingHandle {
            id,
            coordinator: self.clone(),
            persistent: false,
        }
    }
}

impl fmt::Debug for BindingCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingCoordinator")
            .field("edge_count", &self.edge_count())
            .finish()
    }
}

/// Guard flag shared by both directions of a two-way edge.
struct Reentry<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> Reentry<'a> {
    fn enter(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self { flag })
        }
    }
}

impl Drop for Reentry<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// RAII handle for a registered edge.
///
/// Dropping the handle removes the edge, unless [`persist`](Self::persist)
/// was called.
#[must_use = "dropping the handle removes the binding"]
pub struct BindingHandle {
    id: BindingId,
    coordinator: BindingCoordinator,
    persistent: bool,
}

impl BindingHandle {
    /// Registry id of the edge.
    #[must_use]
    pub fn id(&self) -> BindingId {
        self.id
    }

    /// Keep the edge registered after this handle is dropped.
    ///
    /// The edge then lives until [`BindingCoordinator::unbind`] is called.
    pub fn persist(mut self) -> BindingId {
        self.persistent = true;
        self.id
    }
}

impl Drop for BindingHandle {
    fn drop(&mut self) {
        if !self.persistent {
            self.coordinator.unbind(self.id);
        }
    }
}

impl fmt::Debug for BindingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingHandle")
            .field("id", &self.id)
            .field("persistent", &self.persistent)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// BindingScope: lifecycle management
// ---------------------------------------------------------------------------

/// Collects subscriptions and bindings owned by one element.
///
/// When the scope is dropped, everything it holds is released, cleanly
/// disconnecting the element from the binding graph.
///
/// # Invariants
///
/// 1. Bindings are released before plain subscriptions, each in reverse
///    registration order.
/// 2. After drop or `clear()`, no callbacks from this scope will fire.
/// 3. `binding_count()` counts subscriptions and bindings together.
#[derive(Default)]
pub struct BindingScope {
    subscriptions: Vec<Subscription>,
    bindings: Vec<BindingHandle>,
}

impl BindingScope {
    /// Create an empty binding scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `sub` alive for the lifetime of the scope.
    pub fn hold(&mut self, sub: Subscription) {
        self.subscriptions.push(sub);
    }

    /// Keep a binding alive for the lifetime of the scope.
    pub fn hold_binding(&mut self, handle: BindingHandle) {
        self.bindings.push(handle);
    }

    /// Subscribe to an observable within this scope.
    pub fn subscribe<T: Clone + PartialEq + 'static>(
        &mut self,
        source: &Observable<T>,
        callback: impl Fn(&T) + 'static,
    ) -> &mut Self {
        let sub = source.subscribe(callback);
        self.subscriptions.push(sub);
        self
    }

    /// Ids of the bindings held by this scope.
    #[must_use]
    pub fn binding_ids(&self) -> Vec<BindingId> {
        self.bindings.iter().map(BindingHandle::id).collect()
    }

    /// Number of held subscriptions and bindings.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.subscriptions.len() + self.bindings.len()
    }

    /// Whether the scope holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty() && self.bindings.is_empty()
    }

    /// Release everything immediately (scope stays reusable).
    pub fn clear(&mut self) {
        while let Some(binding) = self.bindings.pop() {
            drop(binding);
        }
        while let Some(sub) = self.subscriptions.pop() {
            drop(sub);
        }
    }
}

impl Drop for BindingScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingScope")
            .field("binding_count", &self.binding_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
