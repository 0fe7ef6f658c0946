use crate::constants::SUBSYSTEM_QUALIFIER;
use crate::identity::{Fdn, Rdn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A subscriber that can receive fulfillment tasks
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "participant_kind", rename_all = "snake_case")]
pub enum Participant {
    /// A WUP running in this process group
    Local {
        wup_instance_id: Fdn,
        wup_function_id: Fdn,
        ingress_endpoint: String,
    },
    /// Another subsystem reached over the transport
    Remote {
        service_name: String,
        ingress_endpoint: String,
    },
}

impl Participant {
    pub fn local(
        wup_instance_id: Fdn,
        wup_function_id: Fdn,
        ingress_endpoint: impl Into<String>,
    ) -> Self {
        Self::Local {
            wup_instance_id,
            wup_function_id,
            ingress_endpoint: ingress_endpoint.into(),
        }
    }

    pub fn remote(service_name: impl Into<String>, ingress_endpoint: impl Into<String>) -> Self {
        Self::Remote {
            service_name: service_name.into(),
            ingress_endpoint: ingress_endpoint.into(),
        }
    }

    pub fn ingress_endpoint(&self) -> &str {
        match self {
            Self::Local {
                ingress_endpoint, ..
            }
            | Self::Remote {
                ingress_endpoint, ..
            } => ingress_endpoint,
        }
    }

    pub fn service_name(&self) -> Option<&str> {
        match self {
            Self::Remote { service_name, .. } => Some(service_name),
            Self::Local { .. } => None,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// Whether this is the remote subsystem named `service_name`
    pub fn is_remote_named(&self, service_name: &str) -> bool {
        self.service_name() == Some(service_name)
    }

    /// Whether both name the same subscriber
    ///
    /// Local participants are identified by WUP instance, remote ones by
    /// service name; the ingress endpoint is not part of the identity.
    pub fn same_subscriber(&self, other: &Participant) -> bool {
        match (self, other) {
            (
                Self::Local {
                    wup_instance_id: a, ..
                },
                Self::Local {
                    wup_instance_id: b, ..
                },
            ) => a == b,
            (Self::Remote { service_name: a, .. }, Self::Remote { service_name: b, .. }) => a == b,
            _ => false,
        }
    }

    /// Copy of this participant addressed at `endpoint`
    pub fn with_endpoint(&self, endpoint: impl Into<String>) -> Self {
        let mut participant = self.clone();
        match &mut participant {
            Self::Local {
                ingress_endpoint, ..
            }
            | Self::Remote {
                ingress_endpoint, ..
            } => *ingress_endpoint = endpoint.into(),
        }
        participant
    }

    /// Function identifier registered as a downstream interest
    ///
    /// Remote subsystems are identified as `[subsystem=<service name>]`.
    pub fn function_id(&self) -> Fdn {
        match self {
            Self::Local {
                wup_function_id, ..
            } => wup_function_id.clone(),
            Self::Remote { service_name, .. } => {
                Fdn::root().append(Rdn::constant(SUBSYSTEM_QUALIFIER, service_name.as_str()))
            }
        }
    }

    /// WUP instance a dispatched parcel is scoped to
    ///
    /// Remote subsystems have no instance visible here, so their subsystem
    /// identifier stands in.
    pub fn instance_id(&self) -> Fdn {
        match self {
            Self::Local {
                wup_instance_id, ..
            } => wup_instance_id.clone(),
            Self::Remote { .. } => self.function_id(),
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local {
                wup_instance_id, ..
            } => write!(f, "local:{wup_instance_id}"),
            Self::Remote { service_name, .. } => write!(f, "remote:{service_name}"),
        }
    }
}
