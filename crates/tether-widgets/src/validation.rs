#![forbid(unsafe_code)]

//! Validation rules and the validated value element.
//!
//! A [`ValidationElement`] is a [`ValueElement`] composed with a
//! [`ValidationCore`]. The core registers itself as a post-change hook on
//! the value, so every write re-runs the rules.
//!
//! Rules run in insertion order and stop at the first failure. A failing
//! rule's message becomes the current error and is mirrored into the
//! `error` / `error-message` props; an outbound update is requested only
//! when that state actually changes.

use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use tether_core::client::Client;
use tether_core::element::Element;
use tether_runtime::reactive::Observable;

use crate::value::{ValueElement, ValueHolder, ValueKind, ValueOptions};

/// Property flagging the element as invalid.
pub const ERROR_PROP: &str = "error";
/// Property carrying the current error message.
pub const ERROR_MESSAGE_PROP: &str = "error-message";

type Predicate<T> = Rc<dyn Fn(&T) -> bool>;

/// Ordered mapping from error message to predicate.
///
/// A predicate returns `true` when the value is acceptable.
pub struct ValidationRules<T> {
    rules: Vec<(String, Predicate<T>)>,
}

impl<T> ValidationRules<T> {
    /// No rules; every value is valid.
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with_rule(
        mut self,
        message: impl Into<String>,
        check: impl Fn(&T) -> bool + 'static,
    ) -> Self {
        self.insert(message, check);
        self
    }

    /// Add a rule. A rule with the same message is replaced in place, keeping
    /// its position.
    pub fn insert(&mut self, message: impl Into<String>, check: impl Fn(&T) -> bool + 'static) {
        let message = message.into();
        let check: Predicate<T> = Rc::new(check);
        match self.rules.iter_mut().find(|(existing, _)| *existing == message) {
            Some(slot) => slot.1 = check,
            None => self.rules.push((message, check)),
        }
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule messages in evaluation order.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|(message, _)| message.as_str())
    }

    /// Message of the first rule `value` fails, if any.
    #[must_use]
    pub fn first_failure(&self, value: &T) -> Option<&str> {
        self.rules
            .iter()
            .find(|(_, check)| !check(value))
            .map(|(message, _)| message.as_str())
    }
}

impl<T> Default for ValidationRules<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ValidationRules<T> {
    fn clone(&self) -> Self {
        Self {
            rules: self.rules.clone(),
        }
    }
}

impl<T> fmt::Debug for ValidationRules<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.messages()).finish()
    }
}

/// Capability: can be checked against validation rules.
pub trait Validatable {
    /// Run the rules against the current value. Returns whether it passed.
    fn validate(&self) -> bool;

    /// Current error message, `None` when valid.
    fn error(&self) -> Option<String>;
}

/// Validation state attached to one element's value.
pub(crate) struct ValidationCore<T: Clone + PartialEq + 'static> {
    element: Rc<Element>,
    value: Observable<T>,
    rules: RefCell<ValidationRules<T>>,
    error: RefCell<Option<String>>,
}

impl<T: Clone + PartialEq + 'static> ValidationCore<T> {
    fn validate(&self) -> bool {
        // Release the borrow so predicates may touch the element.
        let rules = self.rules.borrow().clone();
        let value = self.value.get();
        let failure = rules.first_failure(&value).map(str::to_owned);
        let valid = failure.is_none();
        self.set_error(failure);
        valid
    }

    fn set_error(&self, message: Option<String>) {
        let changed = *self.error.borrow() != message;
        let element = &self.element;
        match &message {
            Some(text) => {
                element.set_prop(ERROR_PROP, true);
                element.set_prop(ERROR_MESSAGE_PROP, text.clone());
            }
            None => {
                element.remove_prop(ERROR_PROP);
                element.remove_prop(ERROR_MESSAGE_PROP);
            }
        }
        *self.error.borrow_mut() = message;

        if changed {
            tracing::debug!(
                element = %element.id(),
                error = self.error.borrow().as_deref().unwrap_or(""),
                "validation state changed"
            );
            element.update();
        }
    }
}

/// A value element with validation rules.
pub struct ValidationElement<K: ValueKind> {
    value: ValueElement<K>,
    validation: Rc<ValidationCore<K::Value>>,
}

impl<K: ValueKind> ValidationElement<K> {
    /// Create a validated value element rendered as `tag`.
    ///
    /// The initial value is not validated.
    pub fn new(
        client: &Rc<Client>,
        tag: impl Into<String>,
        kind: K,
        value: K::Value,
        rules: ValidationRules<K::Value>,
        options: ValueOptions,
    ) -> Self {
        let value = ValueElement::new(client, tag, kind, value, options);
        let core = value.core();
        let validation = Rc::new(ValidationCore {
            element: Rc::clone(core.element()),
            value: core.observable().clone(),
            rules: RefCell::new(rules),
            error: RefCell::new(None),
        });

        let weak: Weak<ValidationCore<K::Value>> = Rc::downgrade(&validation);
        core.on_value_changed(move |_| {
            if let Some(validation) = weak.upgrade() {
                validation.validate();
            }
        });

        Self { value, validation }
    }

    /// Replace the rules. Takes effect on the next validation.
    pub fn set_validation(&self, rules: ValidationRules<K::Value>) -> &Self {
        *self.validation.rules.borrow_mut() = rules;
        self
    }

    /// Snapshot of the current rules.
    #[must_use]
    pub fn rules(&self) -> ValidationRules<K::Value> {
        self.validation.rules.borrow().clone()
    }

    /// Run the rules against the current value.
    pub fn validate(&self) -> bool {
        self.validation.validate()
    }

    /// Current error message, `None` when valid.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.validation.error.borrow().clone()
    }

    /// The wrapped value element.
    #[must_use]
    pub fn value_element(&self) -> &ValueElement<K> {
        &self.value
    }
}

impl<K: ValueKind> Deref for ValidationElement<K> {
    type Target = ValueElement<K>;

    fn deref(&self) -> &ValueElement<K> {
        &self.value
    }
}

impl<K: ValueKind> Validatable for ValidationElement<K> {
    fn validate(&self) -> bool {
        ValidationElement::validate(self)
    }

    fn error(&self) -> Option<String> {
        ValidationElement::error(self)
    }
}

impl<K: ValueKind> ValueHolder for ValidationElement<K> {
    type Value = K::Value;

    fn value(&self) -> K::Value {
        self.value.value()
    }

    fn set_value(&self, value: K::Value) {
        self.value.set_value(value);
    }

    fn element(&self) -> &Rc<Element> {
        self.value.element()
    }

    fn value_prop(&self) -> &'static str {
        K::VALUE_PROP
    }
}

impl<K: ValueKind> fmt::Debug for ValidationElement<K>
where
    K::Value: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationElement")
            .field("value", &self.value)
            .field("rules", &*self.validation.rules.borrow())
            .field("error", &*self.validation.error.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Identity;
    use serde_json::json;
    use std::cell::Cell;
    use tether_core::event::GenericEvent;

    fn length_rules() -> ValidationRules<String> {
        ValidationRules::new()
            .with_rule("Too short", |v: &String| v.len() >= 3)
            .with_rule("Too long", |v: &String| v.len() <= 5)
    }

    fn field(
        client: &Rc<Client>,
        rules: ValidationRules<String>,
    ) -> ValidationElement<Identity<String>> {
        ValidationElement::new(
            client,
            "q-input",
            Identity::new(),
            String::new(),
            rules,
            ValueOptions::default(),
        )
    }

    #[test]
    fn initial_value_is_not_validated() {
        let client = Client::new();
        let input = field(&client, length_rules());
        assert_eq!(input.error(), None);
        assert_eq!(input.element().prop(ERROR_PROP), None);
    }

    #[test]
    fn first_failing_rule_wins() {
        let client = Client::new();
        let input = field(&client, length_rules());

        input.set_value("ab".into());
        assert_eq!(input.error().as_deref(), Some("Too short"));
        assert_eq!(input.element().prop(ERROR_PROP), Some(json!(true)));
        assert_eq!(input.element().prop(ERROR_MESSAGE_PROP), Some(json!("Too short")));

        input.set_value("abcdefg".into());
        assert_eq!(input.error().as_deref(), Some("Too long"));

        input.set_value("abcd".into());
        assert_eq!(input.error(), None);
        assert_eq!(input.element().prop(ERROR_PROP), None);
        assert_eq!(input.element().prop(ERROR_MESSAGE_PROP), None);
    }

    #[test]
    fn evaluation_short_circuits() {
        let client = Client::new();
        let later_calls = Rc::new(Cell::new(0));
        let calls = Rc::clone(&later_calls);
        let rules = ValidationRules::new()
            .with_rule("always fails", |_: &String| false)
            .with_rule("counted", move |_: &String| {
                calls.set(calls.get() + 1);
                true
            });
        let input = field(&client, rules);

        input.set_value("x".into());
        assert!(!input.validate());
        assert_eq!(later_calls.get(), 0);
    }

    #[test]
    fn update_only_when_error_state_changes() {
        let client = Client::new();
        let input = field(&client, length_rules());
        let outbox = client.outbox();

        // value update + error appears
        input.set_value("a".into());
        assert_eq!(outbox.pending_for(input.id()), 2);

        // value update only; error unchanged
        input.set_value("b".into());
        assert_eq!(outbox.pending_for(input.id()), 3);

        // value update + error cleared
        input.set_value("abc".into());
        assert_eq!(outbox.pending_for(input.id()), 5);
    }

    #[test]
    fn explicit_validate_reports_current_value() {
        let client = Client::new();
        let input = field(&client, ValidationRules::new());
        input.set_value("whatever".into());
        assert!(input.validate());

        input.set_validation(length_rules());
        assert!(!input.validate());
        assert_eq!(input.error().as_deref(), Some("Too long"));
        assert_eq!(input.rules().len(), 2);
    }

    #[test]
    fn client_update_is_validated() {
        let client = Client::new();
        let input = field(&client, length_rules());
        let event = GenericEvent::new(
            input.id(),
            input.client_id(),
            "update:model-value",
            json!("no"),
        );
        input.element().dispatch(&event);
        assert_eq!(input.value(), "no");
        assert_eq!(input.error().as_deref(), Some("Too short"));
    }

    #[test]
    fn change_handler_sees_error_of_previous_value() {
        let client = Client::new();
        let input = Rc::new(field(&client, length_rules()));
        let observed = Rc::new(RefCell::new(Vec::new()));
        let (weak, seen) = (Rc::downgrade(&input), Rc::clone(&observed));
        input.on_value_change(move |_| {
            if let Some(input) = weak.upgrade() {
                seen.borrow_mut().push(input.error());
            }
        });

        input.set_value("x".into());
        input.set_value("valid".into());
        assert_eq!(*observed.borrow(), vec![None, Some("Too short".to_string())]);
        assert_eq!(input.error(), None);
    }

    #[test]
    fn insert_replaces_same_message_in_place() {
        let mut rules = length_rules();
        rules.insert("Too short", |v: &String| v.len() >= 1);
        rules.insert("No spaces", |v: &String| !v.contains(' '));
        assert_eq!(rules.messages().collect::<Vec<_>>(), ["Too short", "Too long", "No spaces"]);
        assert_eq!(rules.first_failure(&"ab".to_string()), None);
        assert_eq!(rules.first_failure(&"a b".to_string()), Some("No spaces"));
        assert!(!rules.is_empty());
    }
}
