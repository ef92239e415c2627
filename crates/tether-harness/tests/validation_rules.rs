#![forbid(unsafe_code)]

//! Integration tests: validation short-circuit, clearing and visual state.

use std::cell::Cell;
use std::rc::Rc;

use serde_json::json;
use tether_core::client::Client;
use tether_harness::{pending_updates, simulate_value_update};
use tether_runtime::reactive::{Observable, identity};
use tether_widgets::components::Input;
use tether_widgets::validation::{
    ERROR_MESSAGE_PROP, ERROR_PROP, Validatable, ValidationElement, ValidationRules,
};
use tether_widgets::value::{Identity, ValueHolder, ValueOptions};

fn counter() -> (Rc<Cell<usize>>, Rc<Cell<usize>>) {
    let calls = Rc::new(Cell::new(0));
    (Rc::clone(&calls), calls)
}

#[test]
fn first_failing_rule_short_circuits() {
    let client = Client::new();
    let (b_calls, b_probe) = counter();
    let rules = ValidationRules::new()
        .with_rule("A", |_: &i64| false)
        .with_rule("B", move |_: &i64| {
            b_calls.set(b_calls.get() + 1);
            true
        });
    let field = ValidationElement::new(
        &client,
        "q-input",
        Identity::new(),
        0_i64,
        rules,
        ValueOptions::default(),
    );

    assert!(!field.validate());
    assert_eq!(field.error().as_deref(), Some("A"));
    assert_eq!(b_probe.get(), 0);
    assert_eq!(field.element().prop(ERROR_PROP), Some(json!(true)));
    assert_eq!(field.element().prop(ERROR_MESSAGE_PROP), Some(json!("A")));
}

#[test]
fn passing_value_clears_error_and_visuals() {
    let client = Client::new();
    let rules = ValidationRules::new().with_rule("Must be positive", |v: &i64| *v > 0);
    let field = ValidationElement::new(
        &client,
        "q-input",
        Identity::new(),
        0_i64,
        rules,
        ValueOptions::default(),
    );

    field.set_value(-1);
    assert_eq!(field.error().as_deref(), Some("Must be positive"));

    field.set_value(3);
    assert!(field.validate());
    assert_eq!(field.error(), None);
    assert_eq!(field.element().prop(ERROR_PROP), None);
    assert_eq!(field.element().prop(ERROR_MESSAGE_PROP), None);
}

#[test]
fn empty_rule_set_is_always_valid() {
    let client = Client::new();
    let field = ValidationElement::new(
        &client,
        "q-input",
        Identity::new(),
        String::from("anything"),
        ValidationRules::new(),
        ValueOptions::default(),
    );
    assert!(field.validate());
    assert_eq!(field.error(), None);
}

#[test]
fn binding_driven_writes_are_validated() {
    let client = Client::new();
    let input = Input::new(
        &client,
        "Code",
        "",
        ValidationRules::new().with_rule("Four digits", |v: &String| {
            v.len() == 4 && v.chars().all(|c| c.is_ascii_digit())
        }),
    );
    let model = Observable::new(String::from("1234"));
    input.bind_value(&model, identity, identity);
    assert_eq!(input.error(), None);

    model.set("12a4".into());
    assert_eq!(input.value(), "12a4");
    assert_eq!(input.error().as_deref(), Some("Four digits"));
}

#[test]
fn client_edit_raises_error_state_update_despite_suppression() {
    let client = Client::new();
    let input = Input::new(
        &client,
        "Name",
        "Ada",
        ValidationRules::new().with_rule("Required", |v: &String| !v.is_empty()),
    );

    simulate_value_update(&*input, json!("Bob"));
    assert_eq!(pending_updates(input.element()), 0);

    simulate_value_update(&*input, json!(""));
    assert_eq!(input.error().as_deref(), Some("Required"));
    assert_eq!(pending_updates(input.element()), 1);
}

#[test]
fn capabilities_work_through_trait_objects() {
    let client = Client::new();
    let input = Input::new(
        &client,
        "Name",
        "",
        ValidationRules::new().with_rule("Required", |v: &String| !v.is_empty()),
    );
    let holder: &dyn ValueHolder<Value = String> = &*input;
    let checkable: &dyn Validatable = &*input;

    holder.set_value(String::new());
    assert!(!checkable.validate());
    holder.set_value("Ada".into());
    assert_eq!(checkable.error(), None);
    assert_eq!(holder.value(), "Ada");
    assert_eq!(holder.value_prop(), "model-value");
}

#[test]
fn replacing_rules_takes_effect_on_next_change() {
    let client = Client::new();
    let field = ValidationElement::new(
        &client,
        "q-input",
        Identity::new(),
        10_i64,
        ValidationRules::new(),
        ValueOptions::default(),
    );
    field.set_validation(ValidationRules::new().with_rule("Too big", |v: &i64| *v < 5));
    assert_eq!(field.error(), None);

    field.set_value(10);
    assert_eq!(field.error().as_deref(), Some("Too big"));
}
