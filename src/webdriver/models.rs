// src/webdriver/models.rs
use serde::Deserialize;

/// Every WebDriver response wraps its payload in a `value` field.
#[derive(Debug, Deserialize)]
pub struct WdResponse<T> {
    pub value: T,
}

/// Payload of a successful New Session command.
#[derive(Debug, Deserialize)]
pub struct SessionValue {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// The W3C web element identifier object. The magic key is fixed by the
/// WebDriver specification.
#[derive(Debug, Deserialize)]
pub struct WireElement {
    #[serde(rename = "element-6066-11e4-a52e-4f735466cecf")]
    pub id: String,
}

/// Error payload carried by non-2xx WebDriver responses.
#[derive(Debug, Deserialize)]
pub struct WireError {
    pub error: String,
    pub message: String,
}
