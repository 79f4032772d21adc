//! Call-site attribution from captured stack traces.
//!
//! A trace is captured synchronously inside the interception hook, the
//! monitor's own leading frames are dropped, and the page script that made the
//! WebRTC call is read off the remaining frames.
//!
//! ## Attribution depth
//!
//! Before the depth is applied, every frame the page cannot own is removed:
//! the bare `Error` header Chromium prints, frames executing inside the wasm
//! module, and wasm-bindgen's generated `__wbg_*` shims (the `Error`
//! constructor import and, in releases that emit one, the closure adapter).
//! How many of those appear depends on the engine, on inlining and on the
//! wasm-bindgen release, so none of them are counted. What is left always
//! starts at the closure wrapper the `Proxy` trap invoked:
//!
//! ```text
//! Error                                   <- header, removed
//!     at __wbg_new_…  (…/monitor.js)      <- import shim, removed
//!     at monitor.wasm.… (wasm://…)        <- wasm frames, removed
//!     at __wbg_adapter_… (…/monitor.js)   <- closure adapter, removed
//!     at real (…/monitor.js)              <- index 0: hook boundary
//!     at connect (https://site/app.js…)   <- index 1: page caller
//! ```
//!
//! [`AttributionDepth::DEFAULT`] drops nothing more, so index 1 is the page
//! caller on every engine. Hosts that layer their own wrappers over the
//! monitor raise the depth by one per extra frame.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::record::UNKNOWN_SOURCE;

/// Number of leading frames to drop above the hook boundary, counted after
/// header, wasm and glue frames are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributionDepth(pub usize);

impl AttributionDepth {
    pub const DEFAULT: AttributionDepth = AttributionDepth(0);
}

impl Default for AttributionDepth {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Trimmed trace plus the source URL resolved from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub frames: Vec<String>,
    pub source_url: String,
}

impl CallSite {
    pub fn from_frames(frames: Vec<String>) -> Self {
        let source_url = attribute_source(&frames);
        Self { frames, source_url }
    }

    /// Call site used when no trace could be captured at all.
    pub fn unknown() -> Self {
        Self {
            frames: Vec::new(),
            source_url: UNKNOWN_SOURCE.to_string(),
        }
    }
}

/// `http(s)://…:line:col`, optionally wrapped in parentheses (V8 style).
fn stack_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\()?(http[^)]+):[0-9]+:[0-9]+(\))?").expect("stack line regex is valid")
    })
}

/// Lines that never belong to page code: the header line, frames executing
/// inside the wasm module (their count varies with inlining), and
/// wasm-bindgen's generated glue.
fn is_monitor_noise(line: &str) -> bool {
    let line = line.trim();
    line == "Error"
        || line.contains("wasm://")
        || line.contains("wasm-function[")
        || line.contains("__wbg_")
}

/// Split a raw `Error.stack` string into lines, remove header, wasm and glue
/// frames, and drop the first `depth` of what is left.
pub fn trim_trace(stack: &str, depth: AttributionDepth) -> Vec<String> {
    stack
        .lines()
        .filter(|line| !is_monitor_noise(line))
        .skip(depth.0)
        .map(str::to_string)
        .collect()
}

/// Resolve the script URL of the page caller: the second line of a trimmed
/// trace. Returns [`UNKNOWN_SOURCE`] when that line is missing or carries no
/// `http(s)` location.
pub fn attribute_source(trace: &[String]) -> String {
    trace
        .get(1)
        .and_then(|line| stack_line_regex().captures(line))
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_SOURCE.to_string())
}

/// Capture the current JS stack and trim it to the page-side frames.
///
/// Must run synchronously inside the hook closure. Rust frames between the
/// closure and this call execute in wasm and are filtered out.
#[cfg(target_arch = "wasm32")]
pub fn capture_trace(depth: AttributionDepth) -> Vec<String> {
    let error = js_sys::Error::new("");
    js_sys::Reflect::get(&error, &wasm_bindgen::JsValue::from_str("stack"))
        .ok()
        .and_then(|stack| stack.as_string())
        .map(|stack| trim_trace(&stack, depth))
        .unwrap_or_default()
}

/// Outside a JS engine there is no page stack to inspect.
#[cfg(not(target_arch = "wasm32"))]
pub fn capture_trace(_depth: AttributionDepth) -> Vec<String> {
    Vec::new()
}

/// Capture and attribute in one step.
pub fn capture_call_site(depth: AttributionDepth) -> CallSite {
    CallSite::from_frames(capture_trace(depth))
}
