//! # xqk-core
//!
//! Core types, size codec, and error kinds for xfs-quota-kit.
//!
//! This crate provides the foundational types shared across all xfs-quota-kit crates:
//! - Entity kinds (user, group, project) and quota status classification
//! - Value types for limits, per-entity records, reports, projects, and filesystem info
//! - The human-readable size codec (`"1.5GB"` <-> bytes)
//! - The error-kind taxonomy every crate maps its failures onto
//! - CLI response types

pub mod entities;
pub mod enums;
pub mod errors;
pub mod responses;
pub mod size;

/// Usage percentage above which a record is classified as a warning.
pub const WARNING_THRESHOLD_PERCENT: f64 = 80.0;
