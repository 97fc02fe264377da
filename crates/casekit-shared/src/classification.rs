//! The mandatory 6-field classification taxonomy.
//!
//! Every operation and every tool carries a complete classification; the
//! registries reject anything with a missing or empty field.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Structural complexity of an operation or tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Atomic,
    Composite,
    Pipeline,
}

/// Lifecycle maturity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Maturity {
    Experimental,
    Beta,
    Stable,
    Deprecated,
}

/// Where the capability's implementation lives relative to this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationTier {
    Internal,
    External,
    Hybrid,
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Complexity::Atomic => "atomic",
            Complexity::Composite => "composite",
            Complexity::Pipeline => "pipeline",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for Maturity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Maturity::Experimental => "experimental",
            Maturity::Beta => "beta",
            Maturity::Stable => "stable",
            Maturity::Deprecated => "deprecated",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for IntegrationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntegrationTier::Internal => "internal",
            IntegrationTier::External => "external",
            IntegrationTier::Hybrid => "hybrid",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Complexity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "atomic" => Ok(Complexity::Atomic),
            "composite" => Ok(Complexity::Composite),
            "pipeline" => Ok(Complexity::Pipeline),
            other => Err(format!(
                "unknown complexity: '{other}' (expected atomic, composite, or pipeline)"
            )),
        }
    }
}

impl FromStr for Maturity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "experimental" => Ok(Maturity::Experimental),
            "beta" => Ok(Maturity::Beta),
            "stable" => Ok(Maturity::Stable),
            "deprecated" => Ok(Maturity::Deprecated),
            other => Err(format!(
                "unknown maturity: '{other}' (expected experimental, beta, stable, or deprecated)"
            )),
        }
    }
}

impl FromStr for IntegrationTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "internal" => Ok(IntegrationTier::Internal),
            "external" => Ok(IntegrationTier::External),
            "hybrid" => Ok(IntegrationTier::Hybrid),
            other => Err(format!(
                "unknown integration tier: '{other}' (expected internal, external, or hybrid)"
            )),
        }
    }
}

/// The complete 6-field classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Top-level business domain (e.g. `workspace`).
    pub domain: String,
    /// Subdomain within the domain (e.g. `casefile`).
    pub subdomain: String,
    /// Capability verb (e.g. `create`).
    pub capability: String,
    /// Structural complexity.
    pub complexity: Complexity,
    /// Lifecycle maturity.
    pub maturity: Maturity,
    /// Implementation locality.
    pub integration_tier: IntegrationTier,
}

impl Classification {
    /// Names of the string fields that are missing (empty). The three enum
    /// fields cannot be incomplete once the value typechecks, so a non-empty
    /// return here is the full completeness verdict.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.domain.trim().is_empty() {
            missing.push("domain");
        }
        if self.subdomain.trim().is_empty() {
            missing.push("subdomain");
        }
        if self.capability.trim().is_empty() {
            missing.push("capability");
        }
        missing
    }

    /// Whether all six fields are present and non-empty.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Hierarchical discovery path: `domain.subdomain.capability`.
    pub fn path(&self) -> String {
        format!("{}.{}.{}", self.domain, self.subdomain, self.capability)
    }
}
