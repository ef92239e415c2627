#![forbid(unsafe_code)]

//! Value elements: a UI element whose state is one bindable `value`.
//!
//! A [`ValueElement`] bridges three representations of its value:
//!
//! | Representation | Where it goes | Hook |
//! |----------------|---------------|------|
//! | internal `K::Value` | application code, bindings | - |
//! | model (`serde_json::Value`) | `props[VALUE_PROP]`, sent to the client | [`ValueKind::to_model_value`] |
//! | event `K::EventValue` | change handlers | [`ValueKind::to_event_value`] |
//!
//! Inbound client arguments come back through [`ValueKind::from_event_args`].
//! Concrete components only implement [`ValueKind`]; the propagation and
//! echo-suppression engine is shared.
//!
//! # Change Pipeline
//!
//! Every write to the value (API call, binding, client event) runs, in order:
//!
//! 1. `props[VALUE_PROP] = to_model_value(value)`
//! 2. `element.update()` if updates are not suppressed
//! 3. the change handler with `to_event_value(value)`
//! 4. post-change hooks (validation registers one)
//!
//! [`ValueElement::set_value`] runs the pipeline once per call even when the
//! value is unchanged. Writes arriving through bindings are equality gated
//! by the binding layer.
//!
//! # Echo Suppression
//!
//! While an inbound `update:<VALUE_PROP>` event is processed, outbound
//! updates are suppressed unless the kind sets `LOOPBACK`. The flag is held
//! by a drop guard, so it is restored on every exit path including panics.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tether_core::client::{Client, ClientId};
use tether_core::element::{Element, ElementId, ListenerId};
use tether_core::event::{GenericEvent, ListenerOptions, ValueChangeEvent};
use tether_runtime::reactive::{
    BindingCoordinator, BindingId, BindingScope, Observable, Subscription,
};

/// Default outbound property carrying the model value.
pub const DEFAULT_VALUE_PROP: &str = "model-value";

/// Error produced when client arguments cannot be turned into a value.
#[derive(Debug)]
pub enum DecodeError {
    /// The arguments did not deserialize into the value type.
    Json(serde_json::Error),
    /// The arguments were well-formed but not acceptable.
    Invalid(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(err) => write!(f, "undecodable event arguments: {err}"),
            Self::Invalid(msg) => write!(f, "invalid event arguments: {msg}"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

/// Component-level value conventions: constants and conversion hooks.
pub trait ValueKind: 'static {
    /// Internal value type.
    type Value: Clone + PartialEq + 'static;
    /// Value type handed to change handlers.
    type EventValue: Clone + 'static;

    /// Outbound property that carries the model value.
    const VALUE_PROP: &'static str = DEFAULT_VALUE_PROP;
    /// Whether client-originated changes are echoed back to the client.
    const LOOPBACK: bool = true;

    /// Wire form sent to the client.
    fn to_model_value(&self, value: &Self::Value) -> Value;

    /// Form handed to change handlers.
    fn to_event_value(&self, value: &Self::Value) -> Self::EventValue;

    /// Decode inbound client arguments.
    fn from_event_args(&self, args: &Value) -> Result<Self::Value, DecodeError>;
}

/// Serialize `value` into its wire form.
///
/// Values that cannot be represented (e.g. maps with non-string keys) are
/// sent as `null` and logged.
pub fn model_value_of<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "value has no wire representation");
        Value::Null
    })
}

/// The default kind: the value travels unchanged in all three forms.
pub struct Identity<T>(PhantomData<fn() -> T>);

impl<T> Identity<T> {
    /// Create the identity kind.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Identity<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Identity<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Identity")
    }
}

impl<T> ValueKind for Identity<T>
where
    T: Clone + PartialEq + Serialize + DeserializeOwned + 'static,
{
    type Value = T;
    type EventValue = T;

    fn to_model_value(&self, value: &T) -> Value {
        model_value_of(value)
    }

    fn to_event_value(&self, value: &T) -> T {
        value.clone()
    }

    fn from_event_args(&self, args: &Value) -> Result<T, DecodeError> {
        Ok(serde_json::from_value(args.clone())?)
    }
}

/// Construction options for a value element.
#[derive(Clone, Debug)]
pub struct ValueOptions {
    /// Minimum interval between processed inbound change events.
    pub throttle: Duration,
    /// Coordinator that registers this element's bindings.
    pub bindings: BindingCoordinator,
}

impl Default for ValueOptions {
    fn default() -> Self {
        Self {
            throttle: Duration::ZERO,
            bindings: BindingCoordinator::global(),
        }
    }
}

impl ValueOptions {
    /// Default options with the given throttle.
    #[must_use]
    pub fn throttled(throttle: Duration) -> Self {
        Self {
            throttle,
            ..Self::default()
        }
    }
}

/// Capability: holds a single application value.
pub trait ValueHolder {
    /// Internal value type.
    type Value;

    /// Current value.
    fn value(&self) -> Self::Value;

    /// Replace the value and run the change pipeline.
    fn set_value(&self, value: Self::Value);

    /// The underlying element.
    fn element(&self) -> &Rc<Element>;

    /// Outbound property carrying the model value.
    fn value_prop(&self) -> &'static str;
}

type ChangeHandler<E> = Rc<dyn Fn(&ValueChangeEvent<E>)>;
type ChangeHook<T> = Rc<dyn Fn(&T)>;

/// The value engine shared by every value-bearing component.
pub(crate) struct ValueCore<K: ValueKind> {
    element: Rc<Element>,
    kind: K,
    value: Observable<K::Value>,
    send_update_on_change: Cell<bool>,
    change_handler: RefCell<Option<ChangeHandler<K::EventValue>>>,
    hooks: RefCell<Vec<ChangeHook<K::Value>>>,
}

impl<K: ValueKind> ValueCore<K> {
    fn handle_value_change(&self, value: &K::Value) {
        let element = &self.element;
        element.set_prop(K::VALUE_PROP, self.kind.to_model_value(value));
        let send = self.send_update_on_change.get();
        if send {
            element.update();
        }
        tracing::trace!(element = %element.id(), prop = K::VALUE_PROP, send, "value changed");

        let version = self.value.version();
        let handler = self.change_handler.borrow().clone();
        if let Some(handler) = handler {
            handler(&ValueChangeEvent {
                sender: element.id(),
                client: element.client_id(),
                value: self.kind.to_event_value(value),
            });
        }
        // The handler rewrote the value; its own pipeline run already fed the hooks.
        if self.value.version() != version {
            return;
        }

        let hooks = self.hooks.borrow().clone();
        for hook in hooks {
            hook(value);
        }
    }

    fn handle_client_update(&self, event: &GenericEvent) {
        let _span = tracing::debug_span!(
            "client_value_update",
            element = %self.element.id(),
            prop = K::VALUE_PROP,
            loopback = K::LOOPBACK
        )
        .entered();

        let _suppress = SuppressUpdates::enter(&self.send_update_on_change, K::LOOPBACK);
        match self.kind.from_event_args(&event.args) {
            Ok(value) => self.value.force_set(value),
            Err(err) => {
                tracing::warn!(
                    element = %self.element.id(),
                    error = %err,
                    "dropping client value update"
                );
            }
        }
    }

    pub(crate) fn on_value_changed(&self, hook: impl Fn(&K::Value) + 'static) {
        self.hooks.borrow_mut().push(Rc::new(hook));
    }

    pub(crate) fn observable(&self) -> &Observable<K::Value> {
        &self.value
    }

    pub(crate) fn element(&self) -> &Rc<Element> {
        &self.element
    }
}

/// Scope guard for the outbound-update flag.
///
/// Sets the flag to the loopback policy on entry and back to `true` on drop.
struct SuppressUpdates<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> SuppressUpdates<'a> {
    fn enter(flag: &'a Cell<bool>, loopback: bool) -> Self {
        flag.set(loopback);
        Self { flag }
    }
}

impl Drop for SuppressUpdates<'_> {
    fn drop(&mut self) {
        self.flag.set(true);
    }
}

/// A UI element whose state is one bindable value.
pub struct ValueElement<K: ValueKind> {
    core: Rc<ValueCore<K>>,
    listener: ListenerId,
    bindings: RefCell<BindingScope>,
    coordinator: BindingCoordinator,
    _pipeline: Subscription,
}

impl<K: ValueKind> ValueElement<K> {
    /// Create a value element rendered as `tag`.
    ///
    /// The initial value is written to the props directly; the change
    /// pipeline does not run for it.
    pub fn new(
        client: &Rc<Client>,
        tag: impl Into<String>,
        kind: K,
        value: K::Value,
        options: ValueOptions,
    ) -> Self {
        let element = Element::new(client, tag);
        element.set_prop(K::VALUE_PROP, kind.to_model_value(&value));
        element.set_prop("loopback", K::LOOPBACK);

        let core = Rc::new(ValueCore {
            element: Rc::clone(&element),
            kind,
            value: Observable::new(value),
            send_update_on_change: Cell::new(true),
            change_handler: RefCell::new(None),
            hooks: RefCell::new(Vec::new()),
        });

        let weak: Weak<ValueCore<K>> = Rc::downgrade(&core);
        let pipeline = core.value.subscribe(move |value| {
            if let Some(core) = weak.upgrade() {
                core.handle_value_change(value);
            }
        });

        let weak: Weak<ValueCore<K>> = Rc::downgrade(&core);
        let listener = element.on(
            format!("update:{}", K::VALUE_PROP),
            move |event| {
                if let Some(core) = weak.upgrade() {
                    core.handle_client_update(event);
                }
            },
            ListenerOptions::throttled(options.throttle),
        );

        Self {
            core,
            listener,
            bindings: RefCell::new(BindingScope::new()),
            coordinator: options.bindings,
            _pipeline: pipeline,
        }
    }

    /// Current value.
    #[must_use]
    pub fn value(&self) -> K::Value {
        self.core.value.get()
    }

    /// Replace the value and run the change pipeline.
    ///
    /// This is the single mutation entry point; it never fails.
    pub fn set_value(&self, value: K::Value) {
        self.core.value.force_set(value);
    }

    /// Set or replace the change handler.
    pub fn on_value_change(
        &self,
        handler: impl Fn(&ValueChangeEvent<K::EventValue>) + 'static,
    ) -> &Self {
        *self.core.change_handler.borrow_mut() = Some(Rc::new(handler));
        self
    }

    /// Remove the change handler.
    pub fn clear_value_change(&self) -> &Self {
        *self.core.change_handler.borrow_mut() = None;
        self
    }

    /// Change the inbound event throttle.
    pub fn set_throttle(&self, throttle: Duration) -> &Self {
        self.core.element.set_listener_throttle(self.listener, throttle);
        self
    }

    /// Whether value changes currently push an update to the client.
    ///
    /// Only `false` while a non-loopback client event is processed.
    #[must_use]
    pub fn send_update_on_change(&self) -> bool {
        self.core.send_update_on_change.get()
    }

    /// The bindable value field.
    #[must_use]
    pub fn observable(&self) -> &Observable<K::Value> {
        &self.core.value
    }

    /// Conversion hooks of this element.
    #[must_use]
    pub fn kind(&self) -> &K {
        &self.core.kind
    }

    /// The underlying element.
    #[must_use]
    pub fn element(&self) -> &Rc<Element> {
        &self.core.element
    }

    /// Element id.
    #[must_use]
    pub fn id(&self) -> ElementId {
        self.core.element.id()
    }

    /// Owning client id.
    #[must_use]
    pub fn client_id(&self) -> ClientId {
        self.core.element.client_id()
    }

    /// One-way binding from this element's value to `target`.
    pub fn bind_value_to<T>(
        &self,
        target: &Observable<T>,
        forward: impl Fn(&K::Value) -> T + 'static,
    ) -> &Self
    where
        T: Clone + PartialEq + 'static,
    {
        let handle = self.coordinator.bind_to(&self.core.value, target, forward);
        self.bindings.borrow_mut().hold_binding(handle);
        self
    }

    /// One-way binding from `source` into this element's value.
    pub fn bind_value_from<T>(
        &self,
        source: &Observable<T>,
        backward: impl Fn(&T) -> K::Value + 'static,
    ) -> &Self
    where
        T: Clone + PartialEq + 'static,
    {
        let handle = self.coordinator.bind_from(&self.core.value, source, backward);
        self.bindings.borrow_mut().hold_binding(handle);
        self
    }

    /// Two-way binding between this element's value and `other`.
    pub fn bind_value<T>(
        &self,
        other: &Observable<T>,
        forward: impl Fn(&K::Value) -> T + 'static,
        backward: impl Fn(&T) -> K::Value + 'static,
    ) -> &Self
    where
        T: Clone + PartialEq + 'static,
    {
        let handle = self
            .coordinator
            .bind(&self.core.value, other, forward, backward);
        self.bindings.borrow_mut().hold_binding(handle);
        self
    }

    /// Ids of the bindings this element holds.
    #[must_use]
    pub fn binding_ids(&self) -> Vec<BindingId> {
        self.bindings.borrow().binding_ids()
    }

    /// Drop every binding this element holds.
    pub fn unbind_all(&self) {
        self.bindings.borrow_mut().clear();
    }

    pub(crate) fn core(&self) -> &Rc<ValueCore<K>> {
        &self.core
    }
}

impl<K: ValueKind> ValueHolder for ValueElement<K> {
    type Value = K::Value;

    fn value(&self) -> K::Value {
        ValueElement::value(self)
    }

    fn set_value(&self, value: K::Value) {
        ValueElement::set_value(self, value);
    }

    fn element(&self) -> &Rc<Element> {
        ValueElement::element(self)
    }

    fn value_prop(&self) -> &'static str {
        K::VALUE_PROP
    }
}

impl<K: ValueKind> fmt::Debug for ValueElement<K>
where
    K::Value: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueElement")
            .field("id", &self.id())
            .field("value", &self.value())
            .field("bindings", &self.bindings.borrow().binding_count())
            .finish_non_exhaustive()
    }
}
