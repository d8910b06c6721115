//! Shared utilities and common types for the PowerGuard backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Request validation helpers for `validator` derives
//! - Numeric clamping and unit conversion for device telemetry

pub mod units;
pub mod validation;
