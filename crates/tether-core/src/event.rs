#![forbid(unsafe_code)]

//! Event types exchanged between elements, clients and handlers.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::ClientId;
use crate::element::ElementId;

/// A raw event delivered by the client for one element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenericEvent {
    /// Element the event is addressed to.
    pub sender: ElementId,
    /// Client that produced the event.
    pub client: ClientId,
    /// Event type, e.g. `"update:model-value"`.
    pub event_type: String,
    /// Raw client arguments.
    pub args: Value,
}

impl GenericEvent {
    /// Build an event.
    #[must_use]
    pub fn new(
        sender: ElementId,
        client: ClientId,
        event_type: impl Into<String>,
        args: impl Into<Value>,
    ) -> Self {
        Self {
            sender,
            client,
            event_type: event_type.into(),
            args: args.into(),
        }
    }
}

/// Delivered to change handlers after a value element changed.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueChangeEvent<V> {
    /// Element whose value changed.
    pub sender: ElementId,
    /// Client owning the element.
    pub client: ClientId,
    /// The new value in event representation.
    pub value: V,
}

/// Which part of the client arguments a listener receives.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ArgsFilter {
    /// The arguments as sent.
    #[default]
    All,
    /// Only the listed keys of an object argument.
    Keys(Vec<String>),
}

impl ArgsFilter {
    /// Project `args` through this filter.
    ///
    /// Non-object arguments pass through `Keys` unchanged; missing keys are
    /// left out of the result.
    #[must_use]
    pub fn apply(&self, args: &Value) -> Value {
        match (self, args) {
            (Self::Keys(keys), Value::Object(object)) => {
                let projected: Map<String, Value> = keys
                    .iter()
                    .filter_map(|key| object.get(key).map(|v| (key.clone(), v.clone())))
                    .collect();
                Value::Object(projected)
            }
            _ => args.clone(),
        }
    }
}

/// Registration options for an event listener.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    /// Argument projection.
    pub args: ArgsFilter,
    /// Minimum interval between delivered events. Zero disables throttling.
    pub throttle: Duration,
}

impl ListenerOptions {
    /// Options with the given throttle and all arguments.
    #[must_use]
    pub fn throttled(throttle: Duration) -> Self {
        Self {
            throttle,
            ..Self::default()
        }
    }
}
