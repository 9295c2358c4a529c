//! Tollgate - In-Process Request Admission Control
//!
//! This crate decides, per caller, whether a unit of work may proceed based on
//! a fixed-window quota. A [`quota::QuotaTracker`] counts units per key,
//! [`policy`] types derive keys from a request and combine per-key checks, and
//! the [`http`] module turns denials into `429 Too Many Requests` for axum.
//!
//! State lives in the process only. Nothing is persisted or shared between
//! instances.

pub mod config;
pub mod error;
pub mod http;
pub mod policy;
pub mod quota;
