//! Build script for fqs-scanner
//!
//! Exposes to the crate at compile time:
//! - GIT_HASH: short commit hash, "unknown" outside a checkout
//! - BUILD_TIMESTAMP: local time, RFC 3339
//! - BUILD_PROFILE: debug / release
//! - INFERENCE_BACKEND: "onnx" with the `onnx` feature, otherwise "none"

use std::env;
use std::process::Command;

fn git_hash() -> String {
    Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    let build_timestamp = chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false);
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let backend = if env::var_os("CARGO_FEATURE_ONNX").is_some() {
        "onnx"
    } else {
        "none"
    };

    for (key, value) in [
        ("GIT_HASH", git_hash()),
        ("BUILD_TIMESTAMP", build_timestamp),
        ("BUILD_PROFILE", profile),
        ("INFERENCE_BACKEND", backend.to_string()),
    ] {
        println!("cargo:rustc-env={}={}", key, value);
    }
}
