//! Payment gateway tests: session form encoding and confirmation
//! verification.

use themes_jet::payments::{
    constant_time_eq, session_form, HostedCheckout, LineItem, PaymentError, PaymentGateway,
    SessionRequest,
};
use uuid::Uuid;

fn request() -> SessionRequest {
    SessionRequest {
        order_id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        line_items: vec![
            LineItem {
                name: "Portfolio theme".to_string(),
                image: Some("https://cdn.example/portfolio.png".to_string()),
                unit_amount: 2900,
            },
            LineItem {
                name: "Storefront theme".to_string(),
                image: None,
                unit_amount: 4900,
            },
        ],
        success_url: "https://themesjet.example/orders/success/abc".to_string(),
        cancel_url: "https://themesjet.example/cart".to_string(),
    }
}

fn gateway() -> HostedCheckout {
    HostedCheckout::new("https://api.example", "sk_test_123", "wh_token_123", "usd")
}

fn value_of<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
    form.iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

#[test]
fn session_form_carries_mode_urls_and_metadata() {
    let req = request();
    let form = session_form(&req, "usd");

    assert_eq!(value_of(&form, "mode"), Some("payment"));
    assert_eq!(value_of(&form, "success_url"), Some(req.success_url.as_str()));
    assert_eq!(value_of(&form, "cancel_url"), Some(req.cancel_url.as_str()));
    assert_eq!(
        value_of(&form, "metadata[order_id]"),
        Some(req.order_id.to_string().as_str())
    );
    assert_eq!(
        value_of(&form, "metadata[user_id]"),
        Some(req.user_id.to_string().as_str())
    );
}

#[test]
fn session_form_encodes_each_line_in_minor_units_with_quantity_one() {
    let form = session_form(&request(), "usd");

    assert_eq!(value_of(&form, "line_items[0][quantity]"), Some("1"));
    assert_eq!(value_of(&form, "line_items[1][quantity]"), Some("1"));
    assert_eq!(
        value_of(&form, "line_items[0][price_data][unit_amount]"),
        Some("2900")
    );
    assert_eq!(
        value_of(&form, "line_items[1][price_data][unit_amount]"),
        Some("4900")
    );
    assert_eq!(
        value_of(&form, "line_items[0][price_data][currency]"),
        Some("usd")
    );
    assert_eq!(
        value_of(&form, "line_items[0][price_data][product_data][name]"),
        Some("Portfolio theme")
    );
    // Image is only sent when the line has one.
    assert!(value_of(&form, "line_items[0][price_data][product_data][images][0]").is_some());
    assert!(value_of(&form, "line_items[1][price_data][product_data][images][0]").is_none());
}

#[test]
fn confirmation_with_valid_token_and_event_is_accepted() {
    let gateway = gateway();
    let order_id = Uuid::new_v4();
    let body = format!(
        r#"{{"type":"checkout.session.completed","order_id":"{order_id}"}}"#
    );

    let confirmation = gateway
        .verify_confirmation(body.as_bytes(), "wh_token_123")
        .unwrap();
    assert_eq!(confirmation.order_id, order_id);
}

#[test]
fn confirmation_with_wrong_token_is_rejected() {
    let gateway = gateway();
    let body = format!(
        r#"{{"type":"checkout.session.completed","order_id":"{}"}}"#,
        Uuid::new_v4()
    );

    let err = gateway
        .verify_confirmation(body.as_bytes(), "wrong")
        .unwrap_err();
    assert!(matches!(err, PaymentError::InvalidToken));
}

#[test]
fn confirmation_with_unexpected_event_type_is_rejected() {
    let gateway = gateway();
    let body = format!(
        r#"{{"type":"checkout.session.expired","order_id":"{}"}}"#,
        Uuid::new_v4()
    );

    let err = gateway
        .verify_confirmation(body.as_bytes(), "wh_token_123")
        .unwrap_err();
    assert!(matches!(err, PaymentError::MalformedEvent(_)));
}

#[test]
fn malformed_confirmation_body_is_rejected() {
    let gateway = gateway();

    let err = gateway
        .verify_confirmation(b"not json", "wh_token_123")
        .unwrap_err();
    assert!(matches!(err, PaymentError::MalformedEvent(_)));
}

#[test]
fn constant_time_eq_basic_cases() {
    assert!(constant_time_eq("abc", "abc"));
    assert!(!constant_time_eq("abc", "abd"));
    assert!(!constant_time_eq("abc", "abcd"));
    assert!(constant_time_eq("", ""));
}
