//! Two-dimension admission policy for brute-force prevention.

use std::sync::Arc;

use tracing::debug;

use super::{Admission, AdmissionPolicy, Dimension, KeyExtractor, ACCOUNT, ADDRESS};
use crate::error::{Result, TollgateError};
use crate::quota::QuotaTracker;

/// Admits a unit of work only if both of its dimensions admit it.
///
/// The first dimension is always checked first. If it denies, the second
/// dimension is not consulted and consumes nothing. If the first admits and
/// the second denies, the unit consumed on the first dimension stays consumed,
/// so probing the second dimension still costs first-dimension quota.
#[derive(Debug)]
pub struct CombinedPolicy<A, B> {
    first: Dimension<A>,
    second: Dimension<B>,
}

impl<A, B> CombinedPolicy<A, B> {
    /// Combine two dimensions.
    ///
    /// Fails if both dimensions use the same namespace on the same tracker,
    /// since their keys would then be counted together.
    pub fn new(first: Dimension<A>, second: Dimension<B>) -> Result<Self> {
        if first.collides_with(&second) {
            return Err(TollgateError::NamespaceCollision(
                first.namespace().to_string(),
            ));
        }
        Ok(Self { first, second })
    }

    /// Limit by network address, then by account, on one shared tracker.
    pub fn address_then_account(
        tracker: Arc<QuotaTracker>,
        address: A,
        account: B,
    ) -> Self {
        Self {
            first: Dimension::new(ADDRESS, tracker.clone(), address),
            second: Dimension::new(ACCOUNT, tracker, account),
        }
    }

    /// The dimension checked first.
    pub fn first(&self) -> &Dimension<A> {
        &self.first
    }

    /// The dimension checked second.
    pub fn second(&self) -> &Dimension<B> {
        &self.second
    }
}

impl<C, A, B> AdmissionPolicy<C> for CombinedPolicy<A, B>
where
    C: ?Sized,
    A: KeyExtractor<C>,
    B: KeyExtractor<C>,
{
    fn admit(&self, ctx: &C) -> Admission {
        if let Admission::Denied(denial) = self.first.check(ctx) {
            debug!(
                dimension = denial.dimension,
                skipped = self.second.namespace(),
                "First dimension denied, second not consulted"
            );
            return Admission::Denied(denial);
        }

        self.second.check(ctx)
    }
}
