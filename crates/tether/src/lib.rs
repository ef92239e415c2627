#![forbid(unsafe_code)]

//! Tether public facade.
//!
//! Re-exports the public types of the member crates and gathers the ones
//! most applications need in [`prelude`].
//!
//! ```
//! use tether::prelude::*;
//!
//! let client = Client::new();
//! let name = Input::new(
//!     &client,
//!     "Name",
//!     "",
//!     ValidationRules::new().with_rule("Required", |v: &String| !v.is_empty()),
//! );
//! let model = Observable::new(String::from("Ada"));
//! name.bind_value(&model, identity, identity);
//! assert_eq!(name.value(), "Ada");
//!
//! model.set(String::new());
//! assert_eq!(name.error().as_deref(), Some("Required"));
//! ```

pub use tether_core::{
    ArgsFilter, Client, ClientId, ClientScope, Element, ElementId, ElementUpdate, GenericEvent,
    HtmlError, HtmlScope, ListenerOptions, Outbox, ValueChangeEvent, add_body_html, add_head_html,
    current_client,
};
pub use tether_runtime::{
    BindingCoordinator, BindingHandle, BindingScope, Observable, Subscription, identity,
};
#[cfg(feature = "widgets")]
pub use tether_widgets::{
    Checkbox, DecodeError, Identity, Input, Select, SelectOption, Slider, SliderOptions,
    Validatable, ValidationElement, ValidationRules, ValueElement, ValueHolder, ValueKind,
    ValueOptions,
};

/// Common imports for applications.
pub mod prelude {
    pub use tether_core::{
        Client, GenericEvent, HtmlScope, ListenerOptions, ValueChangeEvent, add_body_html,
        add_head_html,
    };
    pub use tether_runtime::{BindingCoordinator, BindingScope, Observable, identity};
    #[cfg(feature = "widgets")]
    pub use tether_widgets::{
        Checkbox, Input, Select, SelectOption, Slider, SliderOptions, Validatable,
        ValidationRules, ValueHolder, ValueOptions,
    };
}
