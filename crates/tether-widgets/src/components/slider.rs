#![forbid(unsafe_code)]

//! Numeric slider.

use std::ops::Deref;
use std::rc::Rc;

use serde_json::Value;
use tether_core::client::Client;

use crate::value::{DecodeError, ValueElement, ValueKind, ValueOptions, model_value_of};

/// Range configuration for a [`Slider`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SliderOptions {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
    /// Granularity; `0` disables snapping.
    pub step: f64,
}

impl Default for SliderOptions {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 100.0,
            step: 1.0,
        }
    }
}

impl SliderOptions {
    /// Clamp into `[min, max]` and snap to the nearest step from `min`.
    ///
    /// Non-finite input maps to `min`.
    #[must_use]
    pub fn normalize(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return self.min;
        }
        let clamped = value.clamp(self.min, self.max);
        if self.step <= 0.0 {
            return clamped;
        }
        let steps = ((clamped - self.min) / self.step).round();
        (self.min + steps * self.step).min(self.max)
    }
}

/// Numeric range conventions.
#[derive(Clone, Copy, Debug, Default)]
pub struct Range {
    options: SliderOptions,
}

impl Range {
    /// Conventions for the given range.
    #[must_use]
    pub fn new(options: SliderOptions) -> Self {
        Self { options }
    }

    /// The configured range.
    #[must_use]
    pub fn options(&self) -> &SliderOptions {
        &self.options
    }
}

impl ValueKind for Range {
    type Value = f64;
    type EventValue = f64;

    fn to_model_value(&self, value: &f64) -> Value {
        model_value_of(&self.options.normalize(*value))
    }

    fn to_event_value(&self, value: &f64) -> f64 {
        *value
    }

    fn from_event_args(&self, args: &Value) -> Result<f64, DecodeError> {
        args.as_f64()
            .map(|raw| self.options.normalize(raw))
            .ok_or_else(|| DecodeError::Invalid(format!("expected number, got {args}")))
    }
}

/// A slider over a numeric range.
pub struct Slider {
    inner: ValueElement<Range>,
}

impl Slider {
    /// Create a slider.
    pub fn new(client: &Rc<Client>, range: SliderOptions, value: f64) -> Self {
        Self::with_options(client, range, value, ValueOptions::default())
    }

    /// Create a slider with explicit value options.
    pub fn with_options(
        client: &Rc<Client>,
        range: SliderOptions,
        value: f64,
        options: ValueOptions,
    ) -> Self {
        let inner = ValueElement::new(client, "q-slider", Range::new(range), value, options);
        let element = inner.element();
        element.set_prop("min", range.min);
        element.set_prop("max", range.max);
        element.set_prop("step", range.step);
        Self { inner }
    }
}

impl Deref for Slider {
    type Target = ValueElement<Range>;

    fn deref(&self) -> &ValueElement<Range> {
        &self.inner
    }
}
