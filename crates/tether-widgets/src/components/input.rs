#![forbid(unsafe_code)]

//! Single-line text input.

use std::ops::Deref;
use std::rc::Rc;

use serde_json::Value;
use tether_core::client::Client;

use crate::validation::{ValidationElement, ValidationRules};
use crate::value::{DecodeError, ValueKind, ValueOptions};

/// Text value conventions.
///
/// Typing is not echoed back: the browser already shows what the user
/// typed, and an echo would race with further keystrokes.
#[derive(Clone, Copy, Debug, Default)]
pub struct Text;

impl ValueKind for Text {
    type Value = String;
    type EventValue = String;
    const LOOPBACK: bool = false;

    fn to_model_value(&self, value: &String) -> Value {
        Value::String(value.clone())
    }

    fn to_event_value(&self, value: &String) -> String {
        value.clone()
    }

    fn from_event_args(&self, args: &Value) -> Result<String, DecodeError> {
        match args {
            Value::String(text) => Ok(text.clone()),
            Value::Null => Ok(String::new()),
            Value::Number(number) => Ok(number.to_string()),
            other => Err(DecodeError::Invalid(format!("expected text, got {other}"))),
        }
    }
}

/// A labelled text input with validation.
pub struct Input {
    inner: ValidationElement<Text>,
}

impl Input {
    /// Create an input.
    pub fn new(
        client: &Rc<Client>,
        label: &str,
        value: impl Into<String>,
        rules: ValidationRules<String>,
    ) -> Self {
        Self::with_options(client, label, value, rules, ValueOptions::default())
    }

    /// Create an input with explicit options.
    pub fn with_options(
        client: &Rc<Client>,
        label: &str,
        value: impl Into<String>,
        rules: ValidationRules<String>,
        options: ValueOptions,
    ) -> Self {
        let inner = ValidationElement::new(client, "q-input", Text, value.into(), rules, options);
        inner.element().set_prop("label", label);
        Self { inner }
    }

    /// Set placeholder text shown while empty.
    pub fn placeholder(&self, text: &str) -> &Self {
        self.inner.element().set_prop("placeholder", text);
        self.inner.element().update();
        self
    }
}

impl Deref for Input {
    type Target = ValidationElement<Text>;

    fn deref(&self) -> &ValidationElement<Text> {
        &self.inner
    }
}
