//! Availability probing.

use std::sync::Arc;

use tracing::debug;

use crate::capability::kinds::{CapabilityKind, Tier};
use crate::capability::provider::{CapabilityFactory, CapabilityProvider};
use crate::core::errors::{CapabilityError, CapabilityResult};

/// Queries the host for a capability's readiness tier.
///
/// Tiers are never cached: a model downloaded by an earlier call changes the
/// answer, so every acquisition attempt probes again.
#[derive(Clone)]
pub struct AvailabilityProber {
    provider: Arc<dyn CapabilityProvider>,
}

impl AvailabilityProber {
    /// Create a prober over the injected host provider.
    #[must_use]
    pub fn new(provider: Arc<dyn CapabilityProvider>) -> Self {
        Self { provider }
    }

    /// Host factory for `kind`.
    ///
    /// # Errors
    /// Returns [`CapabilityError::CapabilityUnsupported`] if the host does not
    /// expose the capability.
    pub fn factory(&self, kind: CapabilityKind) -> CapabilityResult<Arc<dyn CapabilityFactory>> {
        self.provider
            .factory(kind)
            .ok_or(CapabilityError::CapabilityUnsupported(kind))
    }

    /// Query the current tier for `kind`.
    ///
    /// # Errors
    /// Returns [`CapabilityError::CapabilityUnsupported`] if the host does not
    /// expose the capability, or [`CapabilityError::CapabilityUnavailable`]
    /// if the availability query itself is rejected.
    pub async fn probe(&self, kind: CapabilityKind) -> CapabilityResult<Tier> {
        let factory = self.factory(kind)?;
        let availability = factory.availability().await.map_err(|err| {
            debug!(capability = kind.as_str(), %err, "Availability query rejected");
            CapabilityError::CapabilityUnavailable(kind)
        })?;
        let tier = Tier::from(availability);
        debug!(capability = kind.as_str(), tier = tier.as_str(), "Probed capability");
        Ok(tier)
    }
}
