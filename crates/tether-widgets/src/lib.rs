#![forbid(unsafe_code)]

//! Value-bearing elements for Tether.
//!
//! # Layers
//!
//! - [`value`]: [`ValueKind`] conversion hooks and the [`ValueElement`]
//!   engine (change pipeline, echo suppression, bindings).
//! - [`validation`]: ordered [`ValidationRules`] and
//!   [`ValidationElement`], a value element composed with validation state.
//! - [`components`]: [`Input`], [`Checkbox`], [`Slider`] and [`Select`].
//!
//! Components implement the [`ValueHolder`] capability; validated ones also
//! implement [`Validatable`].

pub mod components;
pub mod validation;
pub mod value;

pub use components::{Checkbox, Input, Select, SelectOption, Slider, SliderOptions};
pub use validation::{Validatable, ValidationElement, ValidationRules};
pub use value::{DecodeError, Identity, ValueElement, ValueHolder, ValueKind, ValueOptions};
