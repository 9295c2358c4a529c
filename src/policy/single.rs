//! Single-key admission policy.

use std::sync::Arc;

use super::{Admission, AdmissionPolicy, Dimension, KeyExtractor};
use crate::quota::QuotaTracker;

/// Admits a unit of work when the quota for its one extracted key allows it.
#[derive(Debug)]
pub struct SingleKeyPolicy<E> {
    dimension: Dimension<E>,
}

impl<E> SingleKeyPolicy<E> {
    /// Create a policy limiting keys produced by `extractor` under `namespace`.
    pub fn new(namespace: &'static str, tracker: Arc<QuotaTracker>, extractor: E) -> Self {
        Self::from_dimension(Dimension::new(namespace, tracker, extractor))
    }

    /// Create a policy from an existing dimension.
    pub fn from_dimension(dimension: Dimension<E>) -> Self {
        Self { dimension }
    }

    /// The dimension this policy checks.
    pub fn dimension(&self) -> &Dimension<E> {
        &self.dimension
    }
}

impl<C: ?Sized, E: KeyExtractor<C>> AdmissionPolicy<C> for SingleKeyPolicy<E> {
    fn admit(&self, ctx: &C) -> Admission {
        self.dimension.check(ctx)
    }
}
