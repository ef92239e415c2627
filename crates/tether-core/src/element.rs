#![forbid(unsafe_code)]

//! Addressable UI elements.
//!
//! An [`Element`] is the base every component builds on: it owns the
//! outbound [`Props`] sent to the client, a registry of inbound event
//! listeners, and a handle to its [`Client`]. Elements never talk to the
//! transport directly; [`Element::update`] enqueues a request in the
//! client's [`Outbox`](crate::client::Outbox).
//!
//! # Invariants
//!
//! 1. Element ids are non-zero and unique within their client.
//! 2. Listeners for one event type run in registration order.
//! 3. Each listener has its own throttle; throttling one listener never
//!    delays another.
//! 4. No `RefCell` borrow of the element is held while a handler runs, so
//!    handlers may mutate props, register listeners or request updates.
//!
//! # Trailing Events
//!
//! A throttled listener holds the newest excess event of its window. Nothing
//! releases it on a timer: the owner of the event loop must call
//! [`Element::flush_throttled`] on each tick (or when the window closes).
//! Without that, a held event such as the final position of a slider drag
//! is never delivered: the next event after the window supersedes it.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use web_time::Instant;

use crate::client::{Client, ClientId, ElementUpdate};
use crate::event::{GenericEvent, ListenerOptions};
use crate::props::Props;
use crate::throttle::{Admission, Throttle};

/// Identifier of an element within its client.
///
/// `0` is reserved so ids are always non-zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub(crate) u64);

impl ElementId {
    /// Create an element id, rejecting 0.
    #[must_use]
    pub const fn new(raw: u64) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Identifier of a registered listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Handler = dyn Fn(&GenericEvent);

struct Listener {
    id: ListenerId,
    options: ListenerOptions,
    handler: Rc<Handler>,
    throttle: RefCell<Throttle<GenericEvent>>,
}

/// A node addressable by the rendering client.
pub struct Element {
    id: ElementId,
    tag: String,
    client: Rc<Client>,
    props: RefCell<Props>,
    listeners: RefCell<AHashMap<String, Vec<Rc<Listener>>>>,
    next_listener: Cell<u64>,
}

impl Element {
    /// Create an element owned by `client`.
    #[must_use]
    pub fn new(client: &Rc<Client>, tag: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            id: client.next_element_id(),
            tag: tag.into(),
            client: Rc::clone(client),
            props: RefCell::new(Props::new()),
            listeners: RefCell::new(AHashMap::new()),
            next_listener: Cell::new(0),
        })
    }

    /// Element id.
    #[must_use]
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Tag the client renders this element with, e.g. `"q-input"`.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Owning client.
    #[must_use]
    pub fn client(&self) -> &Rc<Client> {
        &self.client
    }

    /// Id of the owning client.
    #[must_use]
    pub fn client_id(&self) -> ClientId {
        self.client.id()
    }

    /// Borrow the outbound properties.
    ///
    /// The borrow must be released before calling any mutating method.
    #[must_use]
    pub fn props(&self) -> Ref<'_, Props> {
        self.props.borrow()
    }

    /// Current value of one property.
    #[must_use]
    pub fn prop(&self, name: &str) -> Option<Value> {
        self.props.borrow().get(name).cloned()
    }

    /// Set a property without requesting an update. Returns whether it
    /// changed.
    pub fn set_prop(&self, name: impl Into<String>, value: impl Into<Value>) -> bool {
        self.props.borrow_mut().set(name, value)
    }

    /// Remove a property without requesting an update. Returns whether it
    /// was present.
    pub fn remove_prop(&self, name: &str) -> bool {
        self.props.borrow_mut().remove(name)
    }

    /// Request that the current props be pushed to the client.
    pub fn update(&self) {
        let props = self.props.borrow().to_json();
        tracing::trace!(element = %self.id, tag = %self.tag, "update requested");
        self.client.outbox().enqueue(ElementUpdate {
            element: self.id,
            props,
        });
    }

    /// Register `handler` for events of `event_type`.
    pub fn on(
        &self,
        event_type: impl Into<String>,
        handler: impl Fn(&GenericEvent) + 'static,
        options: ListenerOptions,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener.get() + 1);
        self.next_listener.set(id.0);
        let listener = Rc::new(Listener {
            id,
            throttle: RefCell::new(Throttle::new(options.throttle)),
            options,
            handler: Rc::new(handler),
        });
        self.listeners
            .borrow_mut()
            .entry(event_type.into())
            .or_default()
            .push(listener);
        id
    }

    /// Change the throttle interval of a registered listener.
    ///
    /// Returns `false` if no such listener exists.
    pub fn set_listener_throttle(&self, listener: ListenerId, throttle: Duration) -> bool {
        let listeners = self.listeners.borrow();
        let Some(found) = listeners.values().flatten().find(|l| l.id == listener) else {
            return false;
        };
        found.throttle.borrow_mut().set_interval(throttle);
        true
    }

    /// Number of listeners registered for `event_type`.
    #[must_use]
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners.borrow().get(event_type).map_or(0, Vec::len)
    }

    /// Deliver an inbound event now.
    ///
    /// Returns the number of listeners that handled it immediately.
    pub fn dispatch(&self, event: &GenericEvent) -> usize {
        self.dispatch_at(event, Instant::now())
    }

    /// Deliver an inbound event as if received at `now`.
    pub fn dispatch_at(&self, event: &GenericEvent, now: Instant) -> usize {
        let listeners = self.listeners_for(&event.event_type);
        if listeners.is_empty() {
            tracing::debug!(
                element = %self.id,
                event_type = %event.event_type,
                "no listener for event"
            );
            return 0;
        }

        let mut delivered = 0;
        for listener in listeners {
            let filtered = GenericEvent {
                args: listener.options.args.apply(&event.args),
                ..event.clone()
            };
            let admission = listener.throttle.borrow_mut().offer(filtered, now);
            match admission {
                Admission::Deliver(event) => {
                    tracing::debug!(
                        element = %self.id,
                        event_type = %event.event_type,
                        "event delivered"
                    );
                    (listener.handler)(&event);
                    delivered += 1;
                }
                Admission::Deferred => {
                    tracing::debug!(
                        element = %self.id,
                        event_type = %event.event_type,
                        "event throttled"
                    );
                }
            }
        }
        delivered
    }

    /// Deliver every throttled event whose window has elapsed at `now`.
    ///
    /// Call this from the transport's tick; held events are not released
    /// otherwise. Returns the number of events delivered.
    pub fn flush_throttled(&self, now: Instant) -> usize {
        let listeners: Vec<Rc<Listener>> = self
            .listeners
            .borrow()
            .values()
            .flatten()
            .map(Rc::clone)
            .collect();

        let mut delivered = 0;
        for listener in listeners {
            let due = listener.throttle.borrow_mut().take_due(now);
            if let Some(event) = due {
                tracing::debug!(
                    element = %self.id,
                    event_type = %event.event_type,
                    "trailing event delivered"
                );
                (listener.handler)(&event);
                delivered += 1;
            }
        }
        delivered
    }

    fn listeners_for(&self, event_type: &str) -> Vec<Rc<Listener>> {
        self.listeners
            .borrow()
            .get(event_type)
            .cloned()
            .unwrap_or_default()
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("id", &self.id)
            .field("tag", &self.tag)
            .field("client", &self.client.id())
            .field("props", &*self.props.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ArgsFilter;
    use serde_json::json;

    fn recorder(
        element: &Element,
        event_type: &str,
        options: ListenerOptions,
    ) -> Rc<RefCell<Vec<Value>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        element.on(event_type, move |e| s.borrow_mut().push(e.args.clone()), options);
        seen
    }

    fn event(element: &Element, event_type: &str, args: Value) -> GenericEvent {
        GenericEvent::new(element.id(), element.client_id(), event_type, args)
    }

    #[test]
    fn ids_are_unique_per_client() {
        let client = Client::new();
        let a = Element::new(&client, "div");
        let b = Element::new(&client, "div");
        assert_ne!(a.id(), b.id());
        assert!(ElementId::new(0).is_none());
    }

    #[test]
    fn update_enqueues_props_snapshot() {
        let client = Client::new();
        let element = Element::new(&client, "q-input");
        element.set_prop("model-value", "abc");
        element.update();
        element.set_prop("model-value", "changed later");

        let updates = client.outbox().drain();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].element, element.id());
        assert_eq!(updates[0].props.get("model-value"), Some(&json!("abc")));
    }

    #[test]
    fn dispatch_routes_by_event_type() {
        let client = Client::new();
        let element = Element::new(&client, "q-btn");
        let clicks = recorder(&element, "click", ListenerOptions::default());
        let other = recorder(&element, "focus", ListenerOptions::default());

        assert_eq!(element.dispatch(&event(&element, "click", json!(1))), 1);
        assert_eq!(element.dispatch(&event(&element, "blur", json!(2))), 0);
        assert_eq!(*clicks.borrow(), vec![json!(1)]);
        assert!(other.borrow().is_empty());
    }

    #[test]
    fn args_filter_is_applied_per_listener() {
        let client = Client::new();
        let element = Element::new(&client, "q-select");
        let full = recorder(&element, "change", ListenerOptions::default());
        let projected = recorder(
            &element,
            "change",
            ListenerOptions {
                args: ArgsFilter::Keys(vec!["value".into()]),
                ..ListenerOptions::default()
            },
        );

        element.dispatch(&event(&element, "change", json!({"value": 2, "label": "two"})));
        assert_eq!(full.borrow()[0], json!({"value": 2, "label": "two"}));
        assert_eq!(projected.borrow()[0], json!({"value": 2}));
    }

    #[test]
    fn throttled_listener_delivers_leading_and_trailing() {
        let client = Client::new();
        let element = Element::new(&client, "q-slider");
        let seen = recorder(
            &element,
            "update:model-value",
            ListenerOptions::throttled(Duration::from_millis(100)),
        );
        let t0 = Instant::now();
        for (i, offset) in [0u64, 10, 20, 30].into_iter().enumerate() {
            element.dispatch_at(
                &event(&element, "update:model-value", json!(i)),
                t0 + Duration::from_millis(offset),
            );
        }
        assert_eq!(*seen.borrow(), vec![json!(0)]);

        assert_eq!(element.flush_throttled(t0 + Duration::from_millis(50)), 0);
        assert_eq!(element.flush_throttled(t0 + Duration::from_millis(100)), 1);
        assert_eq!(*seen.borrow(), vec![json!(0), json!(3)]);
    }

    #[test]
    fn held_trailing_event_waits_for_flush() {
        let client = Client::new();
        let element = Element::new(&client, "q-slider");
        let seen = recorder(
            &element,
            "update:model-value",
            ListenerOptions::throttled(Duration::from_millis(100)),
        );
        let t0 = Instant::now();
        element.dispatch_at(&event(&element, "update:model-value", json!("start")), t0);
        element.dispatch_at(
            &event(&element, "update:model-value", json!("end")),
            t0 + Duration::from_millis(10),
        );

        // Long after the window closed, the final value is still held.
        assert_eq!(*seen.borrow(), vec![json!("start")]);
        assert_eq!(element.flush_throttled(t0 + Duration::from_secs(5)), 1);
        assert_eq!(*seen.borrow(), vec![json!("start"), json!("end")]);
        assert_eq!(element.flush_throttled(t0 + Duration::from_secs(6)), 0);
    }

    #[test]
    fn throttle_can_be_changed_after_registration() {
        let client = Client::new();
        let element = Element::new(&client, "q-slider");
        let seen = Rc::new(Cell::new(0));
        let s = Rc::clone(&seen);
        let id = element.on(
            "update:model-value",
            move |_| s.set(s.get() + 1),
            ListenerOptions::default(),
        );
        assert!(element.set_listener_throttle(id, Duration::from_secs(60)));

        let t0 = Instant::now();
        element.dispatch_at(&event(&element, "update:model-value", json!(1)), t0);
        element.dispatch_at(&event(&element, "update:model-value", json!(2)), t0);
        assert_eq!(seen.get(), 1);
        assert_eq!(element.listener_count("update:model-value"), 1);
    }

    #[test]
    fn handler_may_mutate_element() {
        let client = Client::new();
        let element = Element::new(&client, "div");
        let weak = Rc::downgrade(&element);
        element.on(
            "click",
            move |_| {
                if let Some(element) = weak.upgrade() {
                    element.set_prop("clicked", true);
                    element.update();
                }
            },
            ListenerOptions::default(),
        );
        element.dispatch(&event(&element, "click", Value::Null));
        assert_eq!(element.prop("clicked"), Some(json!(true)));
        assert_eq!(client.outbox().len(), 1);
    }
}
