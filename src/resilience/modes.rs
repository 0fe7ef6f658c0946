use serde::{Deserialize, Serialize};
use std::fmt;

/// How many replicas of a WUP may exist and where
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResilienceMode {
    /// Exactly one replica
    Standalone,
    /// Replicas within one site
    Clustered,
    /// Replicas across sites
    Multisite,
}

/// How a WUP replica executes units of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyMode {
    Standalone,
    OnDemand,
    Concurrent,
}

impl ResilienceMode {
    pub const ALL: [ResilienceMode; 3] = [Self::Standalone, Self::Clustered, Self::Multisite];
}

impl ConcurrencyMode {
    pub const ALL: [ConcurrencyMode; 3] = [Self::Standalone, Self::OnDemand, Self::Concurrent];
}

impl fmt::Display for ResilienceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standalone => write!(f, "standalone"),
            Self::Clustered => write!(f, "clustered"),
            Self::Multisite => write!(f, "multisite"),
        }
    }
}

impl fmt::Display for ConcurrencyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standalone => write!(f, "standalone"),
            Self::OnDemand => write!(f, "on_demand"),
            Self::Concurrent => write!(f, "concurrent"),
        }
    }
}

/// Key under which focus strategies are registered
pub type ModePair = (ResilienceMode, ConcurrencyMode);
