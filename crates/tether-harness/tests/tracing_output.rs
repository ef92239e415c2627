#![forbid(unsafe_code)]

//! Integration tests: diagnostics emitted through `tracing`.

use std::io;
use std::sync::{Arc, Mutex};

use serde_json::json;
use tether_core::client::Client;
use tether_harness::simulate_value_update;
use tether_widgets::components::{Checkbox, Slider, SliderOptions};
use tracing::Level;

/// In-memory writer for a `fmt` subscriber.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        let bytes = self.0.lock().map(|buf| buf.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(mut inner) = self.0.lock() {
            inner.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture(level: Level, f: impl FnOnce()) -> String {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    captured.text()
}

#[test]
fn undecodable_update_is_logged_as_warning() {
    let client = Client::new();
    let checkbox = Checkbox::new(&client, "Agree", false);

    let logs = capture(Level::WARN, || {
        simulate_value_update(&*checkbox, json!("definitely"));
    });
    assert!(logs.contains("WARN"));
    assert!(logs.contains("dropping client value update"));
    assert!(logs.contains("expected boolean"));
}

#[test]
fn throttled_events_are_logged_at_debug() {
    let client = Client::new();
    let slider = Slider::with_options(
        &client,
        SliderOptions::default(),
        0.0,
        tether_widgets::ValueOptions::throttled(std::time::Duration::from_secs(60)),
    );

    let logs = capture(Level::DEBUG, || {
        simulate_value_update(&*slider, json!(1.0));
        simulate_value_update(&*slider, json!(2.0));
    });
    assert!(logs.contains("event delivered"));
    assert!(logs.contains("event throttled"));
}
