//! A single keyed dimension of an admission policy.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use super::{Admission, Denial};
use crate::quota::QuotaTracker;

/// Derives a rate-limit key from a request context.
///
/// An extractor that cannot identify the caller returns the empty string,
/// which is tracked like any other key.
pub trait KeyExtractor<C: ?Sized>: Send + Sync {
    /// Extract the raw key for `ctx`.
    fn extract(&self, ctx: &C) -> String;
}

impl<C: ?Sized, F> KeyExtractor<C> for F
where
    F: Fn(&C) -> String + Send + Sync,
{
    fn extract(&self, ctx: &C) -> String {
        self(ctx)
    }
}

/// A namespaced key extractor bound to a tracker.
///
/// Keys are stored in the tracker as `<namespace>:<raw key>`, so dimensions
/// sharing one tracker never collide in accounting.
pub struct Dimension<E> {
    namespace: &'static str,
    tracker: Arc<QuotaTracker>,
    extractor: E,
}

impl<E> Dimension<E> {
    /// Create a dimension checking keys produced by `extractor` against
    /// `tracker` under `namespace`.
    pub fn new(namespace: &'static str, tracker: Arc<QuotaTracker>, extractor: E) -> Self {
        Self {
            namespace,
            tracker,
            extractor,
        }
    }

    /// The namespace prefixed to every key of this dimension.
    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    /// The tracker this dimension consumes from.
    pub fn tracker(&self) -> &Arc<QuotaTracker> {
        &self.tracker
    }

    /// Whether `other` would share accounting with this dimension.
    pub(crate) fn collides_with<F>(&self, other: &Dimension<F>) -> bool {
        self.namespace == other.namespace && Arc::ptr_eq(&self.tracker, &other.tracker)
    }

    /// The full tracker key for a raw extracted key.
    pub fn tracker_key(&self, raw: &str) -> String {
        format!("{}:{}", self.namespace, raw)
    }

    /// Extract the key for `ctx` and consume one unit of its quota.
    pub fn check<C: ?Sized>(&self, ctx: &C) -> Admission
    where
        E: KeyExtractor<C>,
    {
        let key = self.tracker_key(&self.extractor.extract(ctx));
        let status = self.tracker.check(&key);

        trace!(
            dimension = self.namespace,
            key = %key,
            allowed = status.allowed,
            "Checked dimension"
        );

        if status.allowed {
            Admission::Admitted
        } else {
            debug!(dimension = self.namespace, key = %key, "Dimension denied");
            Admission::Denied(Denial {
                dimension: self.namespace,
                retry_after: status.reset_in,
            })
        }
    }
}

impl<E> fmt::Debug for Dimension<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dimension")
            .field("namespace", &self.namespace)
            .field("capacity", &self.tracker.capacity())
            .field("window", &self.tracker.window())
            .finish()
    }
}
