//! Error types for the WebRTC localhost monitor
//!
//! Observation must never break the page, so almost nothing in here reaches
//! page code. These errors travel between the monitor's own layers and out to
//! the host through the wasm exports:
//! - Error classification (recoverable vs. installation-fatal)
//! - Error codes for programmatic handling
//! - `ErrorInfo` for JavaScript consumption

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wasm_bindgen::JsValue;

pub type Result<T> = std::result::Result<T, MonitorError>;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Bridge errors (1xx)
    BridgeUnavailable = 100,
    BridgeRejected = 101,
    ChannelClosed = 102,

    // Installation errors (2xx)
    ApiUnavailable = 200,
    AlreadyInstalled = 201,
    NotInstalled = 202,

    // Serialization errors (3xx)
    SerializationFailed = 300,
    MalformedRecord = 301,

    // Configuration errors (4xx)
    InvalidConfig = 400,

    // Internal errors (9xx)
    JsError = 900,
    InternalError = 901,
}

/// Main error type for the monitor
#[derive(Error, Debug, Clone)]
pub enum MonitorError {
    // ===== Bridge Errors =====
    #[error("{0} not exposed")]
    BridgeUnavailable(String),

    #[error("Bridge call failed: {0}")]
    BridgeRejected(String),

    #[error("Observation channel closed")]
    ChannelClosed,

    // ===== Installation Errors =====
    #[error("API not available in this context: {0}")]
    ApiUnavailable(String),

    #[error("Instrumentation already installed")]
    AlreadyInstalled,

    #[error("Instrumentation not installed")]
    NotInstalled,

    // ===== Serialization Errors =====
    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Malformed observation record: {0}")]
    MalformedRecord(String),

    // ===== Configuration Errors =====
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ===== Internal Errors =====
    #[error("JavaScript error: {0}")]
    Js(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MonitorError {
    /// Get the error code for programmatic handling
    pub fn code(&self) -> ErrorCode {
        match self {
            MonitorError::BridgeUnavailable(_) => ErrorCode::BridgeUnavailable,
            MonitorError::BridgeRejected(_) => ErrorCode::BridgeRejected,
            MonitorError::ChannelClosed => ErrorCode::ChannelClosed,

            MonitorError::ApiUnavailable(_) => ErrorCode::ApiUnavailable,
            MonitorError::AlreadyInstalled => ErrorCode::AlreadyInstalled,
            MonitorError::NotInstalled => ErrorCode::NotInstalled,

            MonitorError::Serialization(_) => ErrorCode::SerializationFailed,
            MonitorError::MalformedRecord(_) => ErrorCode::MalformedRecord,

            MonitorError::InvalidConfig(_) => ErrorCode::InvalidConfig,

            MonitorError::Js(_) => ErrorCode::JsError,
            MonitorError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Whether the intercepted call can simply carry on.
    ///
    /// Every error raised while observing a single call is recoverable: the
    /// record is dropped and the page continues. Only installation-time errors
    /// are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MonitorError::BridgeUnavailable(_)
                | MonitorError::BridgeRejected(_)
                | MonitorError::ChannelClosed
                | MonitorError::Serialization(_)
                | MonitorError::MalformedRecord(_)
        )
    }

    /// Convert a thrown JS value into a monitor error, keeping its message.
    pub fn from_js(value: &JsValue) -> Self {
        let message = value
            .as_string()
            .or_else(|| {
                js_sys::Reflect::get(value, &JsValue::from_str("message"))
                    .ok()
                    .and_then(|m| m.as_string())
            })
            .unwrap_or_else(|| format!("{:?}", value));
        MonitorError::Js(message)
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Serialization(err.to_string())
    }
}

impl From<serde_wasm_bindgen::Error> for MonitorError {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        MonitorError::Serialization(err.to_string())
    }
}

impl From<MonitorError> for JsValue {
    fn from(err: MonitorError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

/// Error information for JavaScript consumption
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub code: u32,
    pub message: String,
    pub is_recoverable: bool,
}

impl From<&MonitorError> for ErrorInfo {
    fn from(err: &MonitorError) -> Self {
        ErrorInfo {
            code: err.code() as u32,
            message: err.to_string(),
            is_recoverable: err.is_recoverable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(MonitorError::BridgeUnavailable("calledWebRTC".into()).is_recoverable());
        assert!(MonitorError::ChannelClosed.is_recoverable());
        assert!(MonitorError::Serialization("bad".into()).is_recoverable());

        assert!(!MonitorError::ApiUnavailable("RTCPeerConnection".into()).is_recoverable());
        assert!(!MonitorError::AlreadyInstalled.is_recoverable());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            MonitorError::BridgeUnavailable("x".into()).code(),
            ErrorCode::BridgeUnavailable
        );
        assert_eq!(MonitorError::NotInstalled.code(), ErrorCode::NotInstalled);
        assert_eq!(
            MonitorError::InvalidConfig("x".into()).code(),
            ErrorCode::InvalidConfig
        );
    }

    #[test]
    fn test_bridge_unavailable_message() {
        let err = MonitorError::BridgeUnavailable("calledWebRTC".into());
        assert_eq!(err.to_string(), "calledWebRTC not exposed");
    }

    #[test]
    fn test_error_info() {
        let info = ErrorInfo::from(&MonitorError::ChannelClosed);
        assert_eq!(info.code, 102);
        assert!(info.is_recoverable);
    }
}
