use crate::protocol::messages::{Any, AnyType, Capability, Scalar};

/// Value reported for a capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityValue {
    String(String),
    Bool(bool),
    List(Vec<CapabilityValue>),
}

impl CapabilityValue {
    pub fn to_any(&self) -> Any {
        match self {
            CapabilityValue::String(s) => Any::scalar(Scalar::string(s.as_str())),
            CapabilityValue::Bool(b) => Any::scalar(Scalar::bool(*b)),
            CapabilityValue::List(values) => {
                Any::array(values.iter().map(CapabilityValue::to_any).collect())
            }
        }
    }

    /// Reads a value back from its wire form. Returns `None` for shapes no
    /// capability uses (objects, numbers, octets).
    pub fn from_any(any: &Any) -> Option<Self> {
        match any.any_type()? {
            AnyType::Scalar => {
                let scalar = any.scalar.as_ref()?;
                if let Some(s) = scalar.as_str() {
                    Some(CapabilityValue::String(s.to_string()))
                } else {
                    scalar.as_bool().map(CapabilityValue::Bool)
                }
            }
            AnyType::Array => any
                .array
                .as_ref()?
                .value
                .iter()
                .map(CapabilityValue::from_any)
                .collect::<Option<Vec<_>>>()
                .map(CapabilityValue::List),
            AnyType::Object => None,
        }
    }
}

/// A named capability the server can report during negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityDescriptor {
    /// A fixed scalar such as `node_type` or `client.pwd_expire_ok`.
    ReadOnly { name: String, value: CapabilityValue },
    /// A list of supported options such as `authentication.mechanisms`.
    List { name: String, options: Vec<String> },
}

impl CapabilityDescriptor {
    pub fn read_only(name: impl Into<String>, value: CapabilityValue) -> Self {
        CapabilityDescriptor::ReadOnly {
            name: name.into(),
            value,
        }
    }

    pub fn list<I, S>(name: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CapabilityDescriptor::List {
            name: name.into(),
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    /// A list capability with nothing to offer is not reported.
    pub fn is_supported(&self) -> bool {
        match self {
            CapabilityDescriptor::ReadOnly { .. } => true,
            CapabilityDescriptor::List { options, .. } => !options.is_empty(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CapabilityDescriptor::ReadOnly { name, .. } | CapabilityDescriptor::List { name, .. } => {
                name
            }
        }
    }

    pub fn value(&self) -> CapabilityValue {
        match self {
            CapabilityDescriptor::ReadOnly { value, .. } => value.clone(),
            CapabilityDescriptor::List { options, .. } => CapabilityValue::List(
                options
                    .iter()
                    .cloned()
                    .map(CapabilityValue::String)
                    .collect(),
            ),
        }
    }

    pub fn get(&self) -> (&str, CapabilityValue) {
        (self.name(), self.value())
    }

    /// Offers a client-proposed value. Every descriptor this server defines
    /// is fixed, so all proposals are refused.
    pub fn try_set(&self, _proposed: &Any) -> bool {
        false
    }

    pub fn to_capability(&self) -> Capability {
        Capability {
            name: self.name().to_string(),
            value: Some(self.value().to_any()),
        }
    }
}
