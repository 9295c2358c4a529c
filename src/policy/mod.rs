//! Admission policies layered on the quota tracker.
//!
//! A policy derives one or more keys from a request context, checks each key
//! against a [`QuotaTracker`](crate::quota::QuotaTracker) and folds the results
//! into a single [`Admission`].

mod combined;
mod dimension;
mod single;

use std::time::Duration;

pub use combined::CombinedPolicy;
pub use dimension::{Dimension, KeyExtractor};
pub use single::SingleKeyPolicy;

/// Namespace for keys that identify a network address.
pub const ADDRESS: &str = "addr";
/// Namespace for keys that identify an account.
pub const ACCOUNT: &str = "account";

/// Outcome of an admission policy.
#[must_use = "a denied admission must be acted upon"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The unit of work may proceed; its quota has been consumed.
    Admitted,
    /// The unit of work must be rejected.
    Denied(Denial),
}

impl Admission {
    /// Whether the unit of work may proceed.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Details of a rejected unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    /// Namespace of the dimension whose quota is exhausted
    pub dimension: &'static str,
    /// Time until that dimension's window elapses
    pub retry_after: Duration,
}

/// Decides whether a unit of work described by `C` may proceed.
pub trait AdmissionPolicy<C: ?Sized>: Send + Sync {
    /// Check the quota(s) for `ctx`, consuming a unit on every dimension that
    /// was consulted and admitted.
    fn admit(&self, ctx: &C) -> Admission;
}
