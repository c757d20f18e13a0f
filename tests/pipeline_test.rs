//! End-to-end message handling against an in-memory host

mod common;

use chrono::NaiveDateTime;
use common::{house, row, FakeHost};
use tables_sms::config::InterpreterConfig;
use tables_sms::models::{InboundMessage, Shortcut};
use tables_sms::temporal::parse_stored_instant;
use tables_sms::{MessageHandler, Outcome, Rejection};

const PHONE: &str = "+15550100";

fn now() -> NaiveDateTime {
    parse_stored_instant("2024-01-10T12:00").expect("valid instant")
}

fn handle(host: &FakeHost, body: &str) -> Outcome {
    MessageHandler::new(host, host, host, host, InterpreterConfig::default())
        .handle_at(&InboundMessage::new(PHONE, body), now())
        .expect("host never fails")
}

fn last_reply(host: &FakeHost) -> String {
    host.sent
        .borrow()
        .last()
        .map(|(_, body)| body.clone())
        .expect("a reply was sent")
}

#[test]
fn test_add_drops_columns_closed_to_sms() {
    let host = FakeHost::new(vec![house()]);
    let outcome = handle(&host, "@house +Name Joe's Cafe +Region North");

    let expected = row(&[("Name", "Joe's Cafe")]);
    assert_eq!(
        outcome,
        Outcome::Inserted {
            table: "house".to_string(),
            values: expected.clone(),
        }
    );
    assert_eq!(host.rows_of("house"), [expected]);
    assert!(host.sent.borrow().is_empty());
}

#[test]
fn test_add_with_bad_value_inserts_nothing() {
    let host = FakeHost::new(vec![house()]);
    let outcome = handle(&host, "@house +Name Elm +Beds many");

    assert!(matches!(
        outcome,
        Outcome::NotHandled(Rejection::InvalidValue { ref column, .. }) if column == "Beds"
    ));
    assert!(host.rows_of("house").is_empty());
}

#[test]
fn test_slot_query_single_booking() {
    let host = FakeHost::new(vec![house()]);
    host.seed(
        "house",
        vec![row(&[("Name", "Elm"), ("avail", "2024-01-10T09:00/2024-01-10T10:00")])],
    );

    handle(&host, "@house /avail 30m");
    assert_eq!(
        last_reply(&host),
        "before 2024-01-10T09:00;after 2024-01-10T10:00"
    );
}

#[test]
fn test_slot_query_without_rows_is_anytime() {
    let host = FakeHost::new(vec![house()]);
    let outcome = handle(&host, "@house /avail 30m");
    assert_eq!(
        outcome,
        Outcome::Responded {
            body: "anytime".to_string()
        }
    );
}

#[test]
fn test_slot_query_filters_other_columns_and_bounds_slot() {
    let host = FakeHost::new(vec![house()]);
    host.seed(
        "house",
        vec![
            row(&[("Name", "Elm"), ("avail", "2024-01-10T09:00/2024-01-10T10:00")]),
            row(&[("Name", "Oak"), ("avail", "2024-01-10T11:00/2024-01-10T12:00")]),
            row(&[("Name", "Elm"), ("avail", "2024-01-10T13:00/2024-01-10T14:00")]),
        ],
    );

    handle(&host, "@house =Name Elm /avail 30m <avail 2024-01-10T17:00");
    assert_eq!(
        last_reply(&host),
        "before 2024-01-10T09:00;2024-01-10T10:00-2024-01-10T13:00;2024-01-10T14:00-2024-01-10T17:00"
    );
}

#[test]
fn test_slot_bound_in_interval_form_keeps_bookings() {
    let host = FakeHost::new(vec![house()]);
    host.seed(
        "house",
        vec![row(&[("Name", "Elm"), ("avail", "2024-01-10T09:00/2024-01-10T10:00")])],
    );

    handle(&host, "@house /avail 30m >avail 2024-01-10");
    assert_eq!(
        last_reply(&host),
        "before 2024-01-10T09:00;after 2024-01-10T10:00"
    );
}

#[test]
fn test_date_at_end_of_calendar_is_rejected() {
    let host = FakeHost::new(vec![house()]);
    host.seed("house", vec![row(&[("Name", "Elm")])]);

    for body in [
        "@house ?Name =avail +262142-12-31",
        "@house ?Name =avail +262142-12-31T23:59",
    ] {
        assert!(matches!(
            handle(&host, body),
            Outcome::NotHandled(Rejection::InvalidValue { ref column, .. }) if column == "avail"
        ));
    }
    assert!(host.sent.borrow().is_empty());
}

#[test]
fn test_simple_query_caps_reply_at_25_rows() {
    let host = FakeHost::new(vec![house()]);
    let rows = (0..30)
        .map(|i| row(&[("Name", format!("house{i:02}").as_str()), ("Beds", "2")]))
        .collect();
    host.seed("house", rows);

    handle(&host, "@house ?Name ?Beds ~Name");
    let reply = last_reply(&host);
    let rendered: Vec<&str> = reply.split(';').collect();
    assert_eq!(rendered.len(), 25);
    assert_eq!(rendered[0], "Name:house00,Beds:2");
    assert_eq!(rendered[24], "Name:house24,Beds:2");
}

#[test]
fn test_simple_query_with_no_match() {
    let host = FakeHost::new(vec![house()]);
    host.seed("house", vec![row(&[("Name", "Elm")])]);
    handle(&host, "@house ?Name =Name Oak");
    assert_eq!(last_reply(&host), "No rows found.");
}

#[test]
fn test_query_without_output_column_is_rejected() {
    let host = FakeHost::new(vec![house()]);
    assert_eq!(
        handle(&host, "@house =Name Elm"),
        Outcome::NotHandled(Rejection::NoOutputColumns)
    );
    assert!(host.sent.borrow().is_empty());
}

#[test]
fn test_shortcut_rewrites_to_query() {
    let mut host = FakeHost::new(vec![house()]);
    host.shortcuts.push(Shortcut {
        name: "free".to_string(),
        input_pattern: "%len%".to_string(),
        output_pattern: "@house /avail %len%".to_string(),
    });

    assert!(handle(&host, "@free 1h").is_handled());
    assert_eq!(last_reply(&host), "anytime");
}

#[test]
fn test_password_guarded_table() {
    let mut table = house();
    table.access_table = Some("house_acl".to_string());
    let mut host = FakeHost::new(vec![table]);
    host.credentials.push((
        "house_acl".to_string(),
        PHONE.to_string(),
        "s3cret".to_string(),
    ));

    assert_eq!(
        handle(&host, "@house +Name Elm"),
        Outcome::NotHandled(Rejection::Unauthorized(PHONE.to_string()))
    );
    assert!(handle(&host, "@house +Name Elm #s3cret").is_handled());
    assert_eq!(host.rows_of("house"), [row(&[("Name", "Elm")])]);
}

#[test]
fn test_non_commands_make_no_calls() {
    let host = FakeHost::new(vec![house()]);
    for body in ["hi", "@house", "house ?Name", ""] {
        assert_eq!(handle(&host, body), Outcome::NotHandled(Rejection::NotACommand));
    }
    assert_eq!(host.call_count(), 0);
}
