//! HTTP integration for axum routers.
//!
//! [`AdmissionLayer`] wraps any [`AdmissionPolicy`](crate::policy::AdmissionPolicy)
//! over axum requests and rejects denied requests with `429 Too Many Requests`.

mod extract;
mod layer;
mod response;

use std::sync::Arc;

pub use extract::{ClientIp, Fixed, Header};
pub use layer::{AdmissionLayer, AdmissionService};
pub use response::retry_after_secs;

use crate::policy::{CombinedPolicy, SingleKeyPolicy, ACCOUNT, ADDRESS};
use crate::quota::QuotaTracker;

/// Limit requests per client IP address.
///
/// The address is the connection's peer. Use [`rate_limit_by_client_ip`] with
/// [`ClientIp::behind_proxy`] when a trusted proxy sets forwarding headers.
pub fn rate_limit_by_ip(tracker: Arc<QuotaTracker>) -> AdmissionLayer<SingleKeyPolicy<ClientIp>> {
    rate_limit_by_client_ip(tracker, ClientIp::peer())
}

/// Limit requests per client IP address as resolved by `client_ip`.
pub fn rate_limit_by_client_ip(
    tracker: Arc<QuotaTracker>,
    client_ip: ClientIp,
) -> AdmissionLayer<SingleKeyPolicy<ClientIp>> {
    AdmissionLayer::new(SingleKeyPolicy::new(ADDRESS, tracker, client_ip))
}

/// Limit every request of a route against one account identifier.
pub fn rate_limit_by_account(
    tracker: Arc<QuotaTracker>,
    account: impl Into<String>,
) -> AdmissionLayer<SingleKeyPolicy<Fixed>> {
    AdmissionLayer::new(SingleKeyPolicy::new(ACCOUNT, tracker, Fixed::new(account)))
}

/// Limit by client IP address and then by account, on one shared tracker.
///
/// A request passes only if both its address and the account have quota left.
pub fn prevent_brute_force(
    tracker: Arc<QuotaTracker>,
    account: impl Into<String>,
) -> AdmissionLayer<CombinedPolicy<ClientIp, Fixed>> {
    AdmissionLayer::new(CombinedPolicy::address_then_account(
        tracker,
        ClientIp::peer(),
        Fixed::new(account),
    ))
}
