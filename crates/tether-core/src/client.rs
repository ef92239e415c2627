#![forbid(unsafe_code)]

//! Client sessions, the outbound update queue, and the current-client
//! context.
//!
//! A [`Client`] is one connected (or about to connect) browser page. It
//! owns the element id allocator, the [`Outbox`] the transport drains, and
//! the page's private head/body HTML.
//!
//! # Context
//!
//! Code that builds a page runs inside [`Client::enter`]; the returned
//! [`ClientScope`] makes the client available through [`current_client`]
//! until it is dropped. Scopes nest and unwind LIFO.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::element::ElementId;
use crate::html::{self, HtmlError, Section};

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CONTEXT: RefCell<Vec<Rc<Client>>> = const { RefCell::new(Vec::new()) };
}

/// Identifier of a client session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(u64);

impl ClientId {
    /// Wrap a raw id, e.g. one decoded from the wire.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client#{}", self.0)
    }
}

/// A request to push an element's props to the client.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ElementUpdate {
    /// Element to update.
    pub element: ElementId,
    /// Props snapshot taken when the update was requested.
    pub props: Map<String, Value>,
}

/// Queue of outbound update requests, drained by the transport.
///
/// Requests are kept in the order they were made.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: RefCell<VecDeque<ElementUpdate>>,
    enqueued: Cell<u64>,
}

impl Outbox {
    /// Append a request.
    pub fn enqueue(&self, update: ElementUpdate) {
        self.pending.borrow_mut().push_back(update);
        self.enqueued.set(self.enqueued.get() + 1);
    }

    /// Take every pending request, oldest first.
    pub fn drain(&self) -> Vec<ElementUpdate> {
        self.pending.borrow_mut().drain(..).collect()
    }

    /// Number of pending requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    /// Pending requests for one element.
    #[must_use]
    pub fn pending_for(&self, element: ElementId) -> usize {
        self.pending
            .borrow()
            .iter()
            .filter(|update| update.element == element)
            .count()
    }

    /// Total requests ever enqueued, including drained ones.
    #[must_use]
    pub fn total_enqueued(&self) -> u64 {
        self.enqueued.get()
    }
}

/// One client session.
pub struct Client {
    id: ClientId,
    has_socket_connection: Cell<bool>,
    head_html: RefCell<String>,
    body_html: RefCell<String>,
    outbox: Outbox,
    next_element: Cell<u64>,
}

impl Client {
    /// Create a client that has not connected yet.
    #[must_use]
    pub fn new() -> Rc<Self> {
        let id = ClientId(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(client = %id, "client created");
        Rc::new(Self {
            id,
            has_socket_connection: Cell::new(false),
            head_html: RefCell::new(String::new()),
            body_html: RefCell::new(String::new()),
            outbox: Outbox::default(),
            next_element: Cell::new(0),
        })
    }

    /// Client id.
    #[must_use]
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Whether the page has been delivered to a live connection.
    #[must_use]
    pub fn has_socket_connection(&self) -> bool {
        self.has_socket_connection.get()
    }

    /// Record that the page is now served over a live connection.
    pub fn mark_connected(&self) {
        tracing::debug!(client = %self.id, "socket connected");
        self.has_socket_connection.set(true);
    }

    /// Record that the connection went away.
    pub fn mark_disconnected(&self) {
        tracing::debug!(client = %self.id, "socket disconnected");
        self.has_socket_connection.set(false);
    }

    /// Outbound update queue.
    #[must_use]
    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Append `code` to this page's head.
    ///
    /// # Errors
    ///
    /// [`HtmlError::AlreadyConnected`] once the page has a live connection.
    pub fn add_head_html(&self, code: &str) -> Result<(), HtmlError> {
        self.append_html(Section::Head, code)
    }

    /// Append `code` to this page's body.
    ///
    /// # Errors
    ///
    /// [`HtmlError::AlreadyConnected`] once the page has a live connection.
    pub fn add_body_html(&self, code: &str) -> Result<(), HtmlError> {
        self.append_html(Section::Body, code)
    }

    /// Head HTML to inject: shared content followed by this client's own.
    #[must_use]
    pub fn head_html(&self) -> String {
        let mut html = html::shared_head_html();
        html.push_str(&self.head_html.borrow());
        html
    }

    /// Body HTML to inject: shared content followed by this client's own.
    #[must_use]
    pub fn body_html(&self) -> String {
        let mut html = html::shared_body_html();
        html.push_str(&self.body_html.borrow());
        html
    }

    /// Make this client current until the returned scope is dropped.
    #[must_use = "dropping the scope leaves the client context"]
    pub fn enter(self: &Rc<Self>) -> ClientScope {
        CONTEXT.with(|stack| stack.borrow_mut().push(Rc::clone(self)));
        ClientScope { client: self.id }
    }

    pub(crate) fn next_element_id(&self) -> ElementId {
        let next = self.next_element.get() + 1;
        self.next_element.set(next);
        ElementId(next)
    }

    fn append_html(&self, section: Section, code: &str) -> Result<(), HtmlError> {
        if self.has_socket_connection() {
            return Err(HtmlError::AlreadyConnected {
                client: self.id,
                section,
            });
        }
        let buffer = match section {
            Section::Head => &self.head_html,
            Section::Body => &self.body_html,
        };
        let mut buffer = buffer.borrow_mut();
        buffer.push_str(code);
        buffer.push('\n');
        Ok(())
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("has_socket_connection", &self.has_socket_connection.get())
            .field("pending_updates", &self.outbox.len())
            .finish_non_exhaustive()
    }
}

/// RAII guard for the current-client context.
#[must_use = "dropping the scope leaves the client context"]
pub struct ClientScope {
    client: ClientId,
}

impl Drop for ClientScope {
    fn drop(&mut self) {
        let popped = CONTEXT.with(|stack| stack.borrow_mut().pop());
        if let Some(popped) = popped {
            debug_assert_eq!(popped.id(), self.client);
        }
    }
}

impl fmt::Debug for ClientScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientScope")
            .field("client", &self.client)
            .finish()
    }
}

/// The innermost client entered on this thread, if any.
#[must_use]
pub fn current_client() -> Option<Rc<Client>> {
    CONTEXT.with(|stack| stack.borrow().last().cloned())
}
