//! HTTP response assertions.

use axum::http::StatusCode;
use axum_test::TestResponse;
use serde_json::Value;

/// Asserts that the body is an OperationOutcome whose first issue has `code`.
pub fn assert_outcome(body: &Value, code: &str) {
    assert_eq!(
        body["resourceType"], "OperationOutcome",
        "Expected OperationOutcome, got {}",
        body
    );
    assert_eq!(
        body["issue"][0]["code"], code,
        "Expected issue code {}, got {}",
        code, body
    );
}

/// Returns the `expression` of every issue in an OperationOutcome.
pub fn issue_fields(body: &Value) -> Vec<String> {
    body["issue"]
        .as_array()
        .map(|issues| {
            issues
                .iter()
                .filter_map(|issue| issue["expression"][0].as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Asserts a 401 with the `login` issue code.
pub fn assert_no_session(response: &TestResponse) {
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_outcome(&response.json::<Value>(), "login");
}

/// Asserts a lookup result reported as degraded.
pub fn assert_degraded(body: &Value) {
    assert_eq!(body["status"], "degraded", "Expected degraded lookup, got {}", body);
    assert!(
        body["reason"].as_str().is_some_and(|r| !r.is_empty()),
        "Degraded lookup without a reason: {}",
        body
    );
}
