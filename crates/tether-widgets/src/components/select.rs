#![forbid(unsafe_code)]

//! Single-choice select.
//!
//! The client only ever sees option indices; application code and change
//! handlers see option values.

use std::ops::Deref;
use std::rc::Rc;

use serde::Serialize;
use serde_json::{Value, json};
use tether_core::client::Client;

use crate::value::{DecodeError, ValueElement, ValueKind, ValueOptions};

/// One selectable entry.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectOption<T> {
    /// Text shown to the user.
    pub label: String,
    /// Value handed to application code.
    pub value: T,
}

impl<T> SelectOption<T> {
    /// Build an option.
    pub fn new(label: impl Into<String>, value: T) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// Index-based value conventions.
#[derive(Clone, Debug)]
pub struct Choice<T> {
    options: Vec<SelectOption<T>>,
}

impl<T: Clone + PartialEq> Choice<T> {
    /// Conventions over the given options.
    #[must_use]
    pub fn new(options: Vec<SelectOption<T>>) -> Self {
        Self { options }
    }

    /// Index of `value` among the options.
    #[must_use]
    pub fn index_of(&self, value: &T) -> Option<usize> {
        self.options.iter().position(|option| option.value == *value)
    }

    /// The options in display order.
    #[must_use]
    pub fn options(&self) -> &[SelectOption<T>] {
        &self.options
    }

    fn wire_options(&self) -> Value {
        Value::Array(
            self.options
                .iter()
                .enumerate()
                .map(|(index, option)| json!({ "label": option.label, "value": index }))
                .collect(),
        )
    }
}

impl<T> ValueKind for Choice<T>
where
    T: Clone + PartialEq + Serialize + 'static,
{
    type Value = Option<T>;
    type EventValue = Option<T>;

    fn to_model_value(&self, value: &Option<T>) -> Value {
        value
            .as_ref()
            .and_then(|value| self.index_of(value))
            .map_or(Value::Null, Value::from)
    }

    fn to_event_value(&self, value: &Option<T>) -> Option<T> {
        value.clone()
    }

    fn from_event_args(&self, args: &Value) -> Result<Option<T>, DecodeError> {
        // Quasar sends the whole option object when `emit-value` is off.
        let index = match args {
            Value::Null => return Ok(None),
            Value::Object(object) => object.get("value").unwrap_or(&Value::Null),
            other => other,
        };
        let Some(index) = index.as_u64() else {
            return Err(DecodeError::Invalid(format!("expected option index, got {args}")));
        };
        let found = usize::try_from(index)
            .ok()
            .and_then(|index| self.options.get(index))
            .map(|option| option.value.clone());
        if found.is_none() {
            tracing::debug!(index, "unknown option index");
        }
        Ok(found)
    }
}

/// A dropdown choosing one of a fixed list of values.
pub struct Select<T: Clone + PartialEq + Serialize + 'static> {
    inner: ValueElement<Choice<T>>,
}

impl<T: Clone + PartialEq + Serialize + 'static> Select<T> {
    /// Create a select.
    pub fn new(client: &Rc<Client>, options: Vec<SelectOption<T>>, value: Option<T>) -> Self {
        Self::with_options(client, options, value, ValueOptions::default())
    }

    /// Create a select with explicit value options.
    pub fn with_options(
        client: &Rc<Client>,
        options: Vec<SelectOption<T>>,
        value: Option<T>,
        value_options: ValueOptions,
    ) -> Self {
        let choice = Choice::new(options);
        let wire = choice.wire_options();
        let inner = ValueElement::new(client, "q-select", choice, value, value_options);
        let element = inner.element();
        element.set_prop("options", wire);
        element.set_prop("emit-value", true);
        element.set_prop("map-options", true);
        Self { inner }
    }
}

impl<T: Clone + PartialEq + Serialize + 'static> Deref for Select<T> {
    type Target = ValueElement<Choice<T>>;

    fn deref(&self) -> &ValueElement<Choice<T>> {
        &self.inner
    }
}
