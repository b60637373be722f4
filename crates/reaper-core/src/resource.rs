use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseRefError;

/// Every deletable resource type inside an Amazon Connect instance.
///
/// Variants are declared in alphabetical order of their serialized names,
/// so the derived `Ord` is the lexicographic order used for plan
/// tie-breaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Flow,
    HoursOfOperation,
    Instance,
    PhoneNumberAssociation,
    Queue,
    QuickConnect,
    RoutingProfile,
    SecurityProfile,
    User,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 9] = [
        ResourceKind::Flow,
        ResourceKind::HoursOfOperation,
        ResourceKind::Instance,
        ResourceKind::PhoneNumberAssociation,
        ResourceKind::Queue,
        ResourceKind::QuickConnect,
        ResourceKind::RoutingProfile,
        ResourceKind::SecurityProfile,
        ResourceKind::User,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Flow => "flow",
            ResourceKind::HoursOfOperation => "hours_of_operation",
            ResourceKind::Instance => "instance",
            ResourceKind::PhoneNumberAssociation => "phone_number_association",
            ResourceKind::Queue => "queue",
            ResourceKind::QuickConnect => "quick_connect",
            ResourceKind::RoutingProfile => "routing_profile",
            ResourceKind::SecurityProfile => "security_profile",
            ResourceKind::User => "user",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ParseRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ParseRefError::UnknownKind(s.to_string()))
    }
}

/// Identity of one deletable object.
///
/// Field order matters: the derived `Ord` sorts by (kind, id) first,
/// which gives plans a reproducible layout.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: String,
    /// The Connect instance that owns the resource. For the instance
    /// itself this equals `id`.
    pub instance_id: String,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, instance_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            instance_id: instance_id.into(),
        }
    }

    pub fn instance(instance_id: impl Into<String>) -> Self {
        let instance_id = instance_id.into();
        Self {
            kind: ResourceKind::Instance,
            id: instance_id.clone(),
            instance_id,
        }
    }
}

/// Rendered as `kind:instance/id`, or `instance:id` for an instance.
impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            ResourceKind::Instance => write!(f, "{}:{}", self.kind, self.id),
            kind => write!(f, "{}:{}/{}", kind, self.instance_id, self.id),
        }
    }
}

impl FromStr for ResourceRef {
    type Err = ParseRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = s
            .split_once(':')
            .ok_or_else(|| ParseRefError::Malformed(s.to_string()))?;
        let kind: ResourceKind = kind.trim().parse()?;

        if kind == ResourceKind::Instance {
            let id = rest.trim();
            if id.is_empty() || id.contains('/') {
                return Err(ParseRefError::Malformed(s.to_string()));
            }
            return Ok(ResourceRef::instance(id));
        }

        match rest.split_once('/') {
            Some((instance, id)) if !instance.trim().is_empty() && !id.trim().is_empty() => {
                Ok(ResourceRef::new(kind, instance.trim(), id.trim()))
            }
            _ => Err(ParseRefError::Malformed(s.to_string())),
        }
    }
}
