#![forbid(unsafe_code)]

//! Test harness for Tether elements.
//!
//! Provides what integration tests need to drive elements without a
//! transport:
//!
//! - [`simulate_value_update`]: deliver an `update:<prop>` event the way the
//!   browser would.
//! - [`ChangeRecorder`]: capture change-handler invocations.
//! - [`pending_updates`]: count outbound update requests for one element.
//! - [`strategies`]: `proptest` strategies for values and event arguments.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;
use tether_core::element::Element;
use tether_core::event::{GenericEvent, ValueChangeEvent};
use tether_widgets::value::{ValueElement, ValueHolder, ValueKind};
use web_time::Instant;

/// Build the inbound event a client sends when the user edits `holder`.
pub fn value_update_event<H: ValueHolder + ?Sized>(holder: &H, args: Value) -> GenericEvent {
    let element = holder.element();
    GenericEvent::new(
        element.id(),
        element.client_id(),
        format!("update:{}", holder.value_prop()),
        args,
    )
}

/// Deliver a client value update now.
///
/// Returns the number of listeners that handled it immediately.
pub fn simulate_value_update<H: ValueHolder + ?Sized>(holder: &H, args: Value) -> usize {
    simulate_value_update_at(holder, args, Instant::now())
}

/// Deliver a client value update as if received at `now`.
pub fn simulate_value_update_at<H: ValueHolder + ?Sized>(
    holder: &H,
    args: Value,
    now: Instant,
) -> usize {
    let event = value_update_event(holder, args);
    tracing::debug!(
        element = %event.sender,
        event_type = %event.event_type,
        "simulated client event"
    );
    holder.element().dispatch_at(&event, now)
}

/// Outbound update requests currently queued for `element`.
#[must_use]
pub fn pending_updates(element: &Element) -> usize {
    element.client().outbox().pending_for(element.id())
}

/// Records every change event delivered to an element's handler.
///
/// Attaching replaces any handler already set on the element.
pub struct ChangeRecorder<V> {
    events: Rc<RefCell<Vec<ValueChangeEvent<V>>>>,
}

impl<V: Clone + 'static> ChangeRecorder<V> {
    /// Install a recording change handler on `element`.
    pub fn attach<K>(element: &ValueElement<K>) -> Self
    where
        K: ValueKind<EventValue = V>,
    {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        element.on_value_change(move |event| sink.borrow_mut().push(event.clone()));
        Self { events }
    }

    /// Recorded events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<ValueChangeEvent<V>> {
        self.events.borrow().clone()
    }

    /// Recorded event values, oldest first.
    #[must_use]
    pub fn values(&self) -> Vec<V> {
        self.events.borrow().iter().map(|e| e.value.clone()).collect()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Forget recorded events.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

pub mod strategies {
    //! `proptest` strategies.

    use proptest::prelude::*;
    use serde_json::{Map, Value};

    /// JSON scalars without floats.
    pub fn json_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[a-z0-9 ]{0,12}".prop_map(Value::String),
        ]
    }

    /// Nested JSON up to three levels deep.
    pub fn json_value() -> impl Strategy<Value = Value> {
        json_scalar().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                proptest::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>())),
            ]
        })
    }

    /// Short printable text.
    pub fn text() -> impl Strategy<Value = String> {
        "[ -~]{0,16}"
    }
}
