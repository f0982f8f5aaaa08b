use crate::auth::Mechanism;
use crate::capability::descriptor::{CapabilityDescriptor, CapabilityValue};
use crate::capability::error::CapabilityError;
use crate::protocol::messages::{Capabilities, CapabilitiesSet};

pub const AUTH_MECHANISMS: &str = "authentication.mechanisms";
pub const DOC_FORMATS: &str = "doc.formats";
pub const NODE_TYPE: &str = "node_type";
pub const PWD_EXPIRE_OK: &str = "client.pwd_expire_ok";

/// The ordered set of capabilities this server negotiates.
///
/// Built once at startup and shared read-only by every connection.
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    descriptors: Vec<CapabilityDescriptor>,
}

impl CapabilityRegistry {
    pub fn new(descriptors: Vec<CapabilityDescriptor>) -> Self {
        Self { descriptors }
    }

    /// The standard descriptor set, advertising `mechanisms` for
    /// authentication.
    pub fn server_defaults(mechanisms: &[Mechanism]) -> Self {
        Self::new(vec![
            CapabilityDescriptor::list(AUTH_MECHANISMS, mechanisms.iter().map(|m| m.name())),
            CapabilityDescriptor::read_only(DOC_FORMATS, CapabilityValue::String("text".into())),
            CapabilityDescriptor::read_only(NODE_TYPE, CapabilityValue::String("mysql".into())),
            CapabilityDescriptor::read_only(PWD_EXPIRE_OK, CapabilityValue::Bool(true)),
        ])
    }

    pub fn list(&self) -> &[CapabilityDescriptor] {
        &self.descriptors
    }

    /// Looks up a supported descriptor by name.
    pub fn find(&self, name: &str) -> Option<&CapabilityDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.is_supported() && d.name() == name)
    }

    /// The `CONN_CAPABILITIES` response body: every supported descriptor, in
    /// registry order.
    pub fn snapshot(&self) -> Capabilities {
        Capabilities {
            capabilities: self
                .descriptors
                .iter()
                .filter(|d| d.is_supported())
                .map(CapabilityDescriptor::to_capability)
                .collect(),
        }
    }

    /// Validates a capabilities-set request.
    ///
    /// Either every proposed pair is accepted or the request fails with the
    /// first refusal; nothing is applied on failure. Returns the accepted
    /// pairs.
    pub fn negotiate(
        &self,
        request: &CapabilitiesSet,
    ) -> Result<Vec<(String, CapabilityValue)>, CapabilityError> {
        let proposed = request
            .capabilities
            .as_ref()
            .map(|c| c.capabilities.as_slice())
            .unwrap_or_default();

        let mut accepted = Vec::with_capacity(proposed.len());
        for capability in proposed {
            let descriptor = self
                .find(&capability.name)
                .ok_or_else(|| CapabilityError::NotFound(capability.name.clone()))?;
            let value = capability
                .value
                .as_ref()
                .filter(|value| descriptor.try_set(value))
                .and_then(CapabilityValue::from_any)
                .ok_or_else(|| CapabilityError::PrepareFailed(capability.name.clone()))?;
            accepted.push((capability.name.clone(), value));
        }

        Ok(accepted)
    }
}
