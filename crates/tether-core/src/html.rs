#![forbid(unsafe_code)]

//! Raw HTML injection into page head and body.
//!
//! Markup goes either into the process-wide shared registry, which every
//! page renders, or into the current client's own buffer. Per-client
//! injection is only possible before the page reaches a live connection;
//! after that the markup could never be delivered.
//!
//! # Shared Registry
//!
//! The shared registry is a `Mutex`-guarded static. It is empty at startup
//! and append-only: there is no way to remove shared markup once added.
//!
//! # Example
//!
//! ```
//! use tether_core::client::Client;
//! use tether_core::html::{HtmlScope, add_head_html, shared_head_html};
//!
//! add_head_html("<meta name=\"generator\" content=\"tether\">", HtmlScope::Shared).unwrap();
//! assert!(shared_head_html().contains("generator"));
//!
//! let client = Client::new();
//! let _scope = client.enter();
//! add_head_html("<style>.page { color: red }</style>", HtmlScope::Client).unwrap();
//! assert!(client.head_html().contains(".page"));
//! ```

use std::fmt;
use std::sync::Mutex;

use crate::client::{ClientId, current_client};

static SHARED_HTML: Mutex<SharedHtml> = Mutex::new(SharedHtml::new());

/// Markup rendered into every page.
#[derive(Debug)]
struct SharedHtml {
    head: String,
    body: String,
}

impl SharedHtml {
    const fn new() -> Self {
        Self {
            head: String::new(),
            body: String::new(),
        }
    }
}

/// Page section markup is injected into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    /// `<head>`.
    Head,
    /// End of `<body>`.
    Body,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Head => write!(f, "head"),
            Self::Body => write!(f, "body"),
        }
    }
}

/// Where injected markup goes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HtmlScope {
    /// Only the current client's page.
    #[default]
    Client,
    /// Every page served by this process.
    Shared,
}

/// Error type for HTML injection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HtmlError {
    /// The client's page is already served over a live connection.
    AlreadyConnected {
        /// Client the markup was meant for.
        client: ClientId,
        /// Section the markup was meant for.
        section: Section,
    },
    /// Per-client injection was requested outside any client context.
    NoClient,
    /// The shared registry lock was poisoned (another thread panicked while
    /// holding it).
    PoisonedLock,
}

impl fmt::Display for HtmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyConnected { client, section } => write!(
                f,
                "cannot add {section} HTML for {client} after the page has been sent to the client"
            ),
            Self::NoClient => write!(f, "no client in context for per-client HTML"),
            Self::PoisonedLock => write!(f, "shared HTML registry lock was poisoned"),
        }
    }
}

impl std::error::Error for HtmlError {}

/// Add markup to the page head.
///
/// A trailing newline is appended to `code`.
///
/// # Errors
///
/// - [`HtmlError::NoClient`] for [`HtmlScope::Client`] outside a client
///   context.
/// - [`HtmlError::AlreadyConnected`] if the current client is live.
/// - [`HtmlError::PoisonedLock`] if the shared registry is poisoned.
pub fn add_head_html(code: &str, scope: HtmlScope) -> Result<(), HtmlError> {
    add_html(Section::Head, code, scope)
}

/// Add markup to the end of the page body.
///
/// A trailing newline is appended to `code`.
///
/// # Errors
///
/// Same as [`add_head_html`].
pub fn add_body_html(code: &str, scope: HtmlScope) -> Result<(), HtmlError> {
    add_html(Section::Body, code, scope)
}

/// Markup shared by every page's head.
#[must_use]
pub fn shared_head_html() -> String {
    SHARED_HTML
        .lock()
        .map(|shared| shared.head.clone())
        .unwrap_or_default()
}

/// Markup shared by every page's body.
#[must_use]
pub fn shared_body_html() -> String {
    SHARED_HTML
        .lock()
        .map(|shared| shared.body.clone())
        .unwrap_or_default()
}

fn add_html(section: Section, code: &str, scope: HtmlScope) -> Result<(), HtmlError> {
    match scope {
        HtmlScope::Shared => {
            let mut shared = SHARED_HTML.lock().map_err(|_| HtmlError::PoisonedLock)?;
            let buffer = match section {
                Section::Head => &mut shared.head,
                Section::Body => &mut shared.body,
            };
            buffer.push_str(code);
            buffer.push('\n');
            tracing::debug!(%section, bytes = code.len(), "shared html added");
            Ok(())
        }
        HtmlScope::Client => {
            let client = current_client().ok_or(HtmlError::NoClient)?;
            let result = match section {
                Section::Head => client.add_head_html(code),
                Section::Body => client.add_body_html(code),
            };
            if let Err(err) = &result {
                tracing::warn!(error = %err, "html injection rejected");
            }
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;

    #[test]
    fn shared_markup_is_visible_to_every_client() {
        add_body_html("<div id=\"shared-banner-7f3\"></div>", HtmlScope::Shared).unwrap();
        let a = Client::new();
        let b = Client::new();
        b.mark_connected();
        assert!(shared_body_html().contains("shared-banner-7f3"));
        assert!(a.body_html().contains("shared-banner-7f3"));
        assert!(b.body_html().contains("shared-banner-7f3"));
    }

    #[test]
    fn shared_markup_allowed_even_when_connected() {
        let client = Client::new();
        client.mark_connected();
        let _scope = client.enter();
        assert!(add_head_html("<link rel=\"x-shared-91c\">", HtmlScope::Shared).is_ok());
        assert!(shared_head_html().contains("x-shared-91c\">\n"));
    }

    #[test]
    fn client_markup_requires_context() {
        assert_eq!(
            add_head_html("<meta>", HtmlScope::Client),
            Err(HtmlError::NoClient)
        );
    }

    #[test]
    fn client_markup_goes_to_current_client_only() {
        let page = Client::new();
        let other = Client::new();
        let _scope = page.enter();
        add_head_html("<meta name=\"only-page-2b1\">", HtmlScope::Client).unwrap();
        assert!(page.head_html().contains("only-page-2b1"));
        assert!(!other.head_html().contains("only-page-2b1"));
        assert!(!shared_head_html().contains("only-page-2b1"));
    }

    #[test]
    fn client_markup_after_connection_is_usage_error() {
        let page = Client::new();
        let _scope = page.enter();
        add_body_html("<p>before</p>", HtmlScope::Client).unwrap();
        page.mark_connected();

        let err = add_body_html("<p>after</p>", HtmlScope::Client).unwrap_err();
        assert!(matches!(err, HtmlError::AlreadyConnected { section: Section::Body, .. }));
        assert!(err.to_string().contains("after the page has been sent"));
        assert!(page.body_html().contains("<p>before</p>\n"));
        assert!(!page.body_html().contains("<p>after</p>"));
    }
}
