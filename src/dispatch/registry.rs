use crate::ports::AddressRegistry;
use crate::ports::store::StoreResult;
use crate::types::registration::Registration;

/// Working copy of one recipient's registered addresses for a cycle.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecipientAddresses {
    registrations: Vec<Registration>,
}

impl RecipientAddresses {
    pub(crate) fn new(registrations: Vec<Registration>) -> Self {
        Self { registrations }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub(crate) fn all(&self) -> Vec<String> {
        self.registrations
            .iter()
            .map(|r| r.address.clone())
            .collect()
    }

    /// Splits into addresses registered for `device_id` and everything else.
    pub(crate) fn partition(&self, device_id: &str) -> (Vec<String>, Vec<String>) {
        let (matching, other): (Vec<&Registration>, Vec<&Registration>) = self
            .registrations
            .iter()
            .partition(|r| r.matches_device(device_id));
        (
            matching.into_iter().map(|r| r.address.clone()).collect(),
            other.into_iter().map(|r| r.address.clone()).collect(),
        )
    }

    /// Drops addresses already queued for deletion.
    pub(crate) fn forget(&mut self, addresses: &[String]) {
        self.registrations
            .retain(|r| !addresses.iter().any(|a| *a == r.address));
    }
}

pub(crate) async fn load(
    registry: &dyn AddressRegistry,
    recipient_id: &str,
) -> StoreResult<RecipientAddresses> {
    let registrations = registry.addresses_for(recipient_id).await?;
    Ok(RecipientAddresses::new(registrations))
}
