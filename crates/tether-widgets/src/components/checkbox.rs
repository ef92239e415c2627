#![forbid(unsafe_code)]

//! Boolean checkbox.

use std::ops::Deref;
use std::rc::Rc;

use serde_json::Value;
use tether_core::client::Client;

use crate::value::{DecodeError, ValueElement, ValueKind, ValueOptions};

/// Boolean value conventions.
#[derive(Clone, Copy, Debug, Default)]
pub struct Toggle;

impl ValueKind for Toggle {
    type Value = bool;
    type EventValue = bool;

    fn to_model_value(&self, value: &bool) -> Value {
        Value::Bool(*value)
    }

    fn to_event_value(&self, value: &bool) -> bool {
        *value
    }

    fn from_event_args(&self, args: &Value) -> Result<bool, DecodeError> {
        args.as_bool()
            .ok_or_else(|| DecodeError::Invalid(format!("expected boolean, got {args}")))
    }
}

/// A labelled checkbox.
pub struct Checkbox {
    inner: ValueElement<Toggle>,
}

impl Checkbox {
    /// Create a checkbox.
    pub fn new(client: &Rc<Client>, text: &str, value: bool) -> Self {
        Self::with_options(client, text, value, ValueOptions::default())
    }

    /// Create a checkbox with explicit options.
    pub fn with_options(
        client: &Rc<Client>,
        text: &str,
        value: bool,
        options: ValueOptions,
    ) -> Self {
        let inner = ValueElement::new(client, "q-checkbox", Toggle, value, options);
        inner.element().set_prop("label", text);
        Self { inner }
    }

    /// Flip the value.
    pub fn toggle(&self) {
        self.inner.set_value(!self.inner.value());
    }
}

impl Deref for Checkbox {
    type Target = ValueElement<Toggle>;

    fn deref(&self) -> &ValueElement<Toggle> {
        &self.inner
    }
}
