//! Verify cookie extraction and response parsing against JSON test vectors
//! stored in `test-vectors/`.
//!
//! Comparing parsed JSON (not raw strings) avoids false negatives from
//! field-ordering differences.

use bulletin_core::{extract_cookies, parse_response, ApiError, HttpResponse};
use serde_json::Value;

fn cases(raw: &str) -> Vec<Value> {
    let vectors: Value = serde_json::from_str(raw).unwrap();
    vectors["cases"].as_array().unwrap().clone()
}

// ---------------------------------------------------------------------------
// Set-Cookie extraction
// ---------------------------------------------------------------------------

#[test]
fn set_cookie_test_vectors() {
    for case in cases(include_str!("../../test-vectors/set_cookie.json")) {
        let name = case["name"].as_str().unwrap();
        let headers = case["set_cookie"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| ("Set-Cookie".to_string(), v.as_str().unwrap().to_string()))
            .collect();
        let response = HttpResponse {
            status: 204,
            headers,
            body: String::new(),
        };

        let extracted = serde_json::to_value(extract_cookies(&response)).unwrap();
        assert_eq!(extracted, case["expected"], "{name}");
    }
}

// ---------------------------------------------------------------------------
// Response classification
// ---------------------------------------------------------------------------

#[test]
fn error_test_vectors() {
    for case in cases(include_str!("../../test-vectors/errors.json")) {
        let name = case["name"].as_str().unwrap();
        let response = HttpResponse {
            status: case["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: case["body"].as_str().unwrap().to_string(),
        };
        let expected = &case["expected"];

        match parse_response::<Value>(&response) {
            Ok(payload) => assert_eq!(&payload, &expected["ok"], "{name}"),
            Err(ApiError::Status {
                status,
                code,
                message,
                detail,
            }) => {
                let err = &expected["err"];
                assert!(!err.is_null(), "{name}: unexpected error {code}");
                assert_eq!(u64::from(status), err["status"].as_u64().unwrap(), "{name}");
                assert_eq!(code, err["code"].as_str().unwrap(), "{name}");
                assert_eq!(message, err["message"].as_str().unwrap(), "{name}");
                assert_eq!(detail.unwrap_or(Value::Null), err["detail"], "{name}");
            }
            Err(other) => panic!("{name}: unexpected error {other:?}"),
        }
    }
}
