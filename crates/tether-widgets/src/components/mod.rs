#![forbid(unsafe_code)]

//! Concrete value components.

pub mod checkbox;
pub mod input;
pub mod select;
pub mod slider;

pub use checkbox::{Checkbox, Toggle};
pub use input::{Input, Text};
pub use select::{Choice, Select, SelectOption};
pub use slider::{Range, Slider, SliderOptions};
