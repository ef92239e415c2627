#![forbid(unsafe_code)]

//! Element base, client sessions and page-level plumbing for Tether.
//!
//! # Core Components
//!
//! - [`Element`]: addressable node with outbound [`Props`] and inbound
//!   event listeners (argument filtering, per-listener throttling).
//! - [`Client`]: one page session; owns the [`Outbox`] of update requests
//!   and the page's private HTML. [`Client::enter`] sets the current-client
//!   context.
//! - [`html`]: head/body HTML injection, shared or per client.
//! - [`Throttle`]: leading/trailing rate limiter used by listeners.

pub mod client;
pub mod element;
pub mod event;
pub mod html;
pub mod props;
pub mod throttle;

pub use client::{Client, ClientId, ClientScope, ElementUpdate, Outbox, current_client};
pub use element::{Element, ElementId, ListenerId};
pub use event::{ArgsFilter, GenericEvent, ListenerOptions, ValueChangeEvent};
pub use html::{HtmlError, HtmlScope, Section, add_body_html, add_head_html};
pub use props::Props;
pub use throttle::{Admission, Throttle};
