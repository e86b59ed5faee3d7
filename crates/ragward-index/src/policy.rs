//! Identity to access-predicate resolution.
//!
//! Lookup is exact and case-sensitive. An identity missing from the table,
//! or no identity at all, resolves to [`AccessPredicate::DenyAll`].

use std::collections::HashMap;

use ragward_store::{FieldCondition, VectorFilter};
use serde::{Deserialize, Serialize};

use crate::attributes::AccessAttributes;
use crate::document::fields;
use crate::error::{IndexError, Result};

/// Restriction applied to a search before it reaches the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPredicate {
    /// Every present field must equal the chunk's attribute.
    Require {
        status: Option<String>,
        approved_by: Option<String>,
    },
    /// Matches no chunk.
    DenyAll,
}

impl AccessPredicate {
    /// Lower to a store filter. `DenyAll` becomes a contradiction
    /// (`must` and `must_not` on one condition).
    #[must_use]
    pub fn to_filter(&self) -> VectorFilter {
        match self {
            Self::Require {
                status,
                approved_by,
            } => {
                let mut must = Vec::new();
                if let Some(s) = status {
                    must.push(FieldCondition::text(fields::STATUS, s.as_str()));
                }
                if let Some(a) = approved_by {
                    must.push(FieldCondition::text(fields::APPROVED_BY, a.as_str()));
                }
                VectorFilter::must(must)
            }
            Self::DenyAll => {
                let cond = FieldCondition::text(fields::STATUS, crate::attributes::UNKNOWN);
                VectorFilter {
                    must: vec![cond.clone()],
                    must_not: vec![cond],
                }
            }
        }
    }

    #[must_use]
    pub fn allows(&self, attributes: &AccessAttributes) -> bool {
        match self {
            Self::Require {
                status,
                approved_by,
            } => {
                status.as_ref().is_none_or(|s| *s == attributes.status)
                    && approved_by
                        .as_ref()
                        .is_none_or(|a| *a == attributes.approved_by)
            }
            Self::DenyAll => false,
        }
    }
}

/// One row of the identity table, as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    pub identity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    /// Sees every chunk, no filter applied.
    #[serde(default)]
    pub unrestricted: bool,
}

impl AccessRule {
    #[must_use]
    pub fn unrestricted(identity: &str) -> Self {
        Self {
            identity: identity.to_owned(),
            status: None,
            approved_by: None,
            unrestricted: true,
        }
    }

    #[must_use]
    pub fn require(identity: &str, status: Option<&str>, approved_by: Option<&str>) -> Self {
        Self {
            identity: identity.to_owned(),
            status: status.map(str::to_owned),
            approved_by: approved_by.map(str::to_owned),
            unrestricted: false,
        }
    }

    /// # Errors
    ///
    /// Returns [`IndexError::Config`] for an empty identity, a rule with no
    /// conditions that is not marked unrestricted, or an unrestricted rule
    /// that also carries conditions.
    pub fn validate(&self) -> Result<()> {
        if self.identity.trim().is_empty() {
            return Err(IndexError::Config("access rule identity must not be empty".into()));
        }
        let has_conditions = self.status.is_some() || self.approved_by.is_some();
        match (self.unrestricted, has_conditions) {
            (false, false) => Err(IndexError::Config(format!(
                "access rule for {:?} has no conditions; set unrestricted = true to grant full access",
                self.identity
            ))),
            (true, true) => Err(IndexError::Config(format!(
                "access rule for {:?} is unrestricted but also sets conditions",
                self.identity
            ))),
            _ => Ok(()),
        }
    }

    fn predicate(&self) -> Option<AccessPredicate> {
        if self.unrestricted {
            None
        } else {
            Some(AccessPredicate::Require {
                status: self.status.clone(),
                approved_by: self.approved_by.clone(),
            })
        }
    }
}

/// The built-in identity table.
#[must_use]
pub fn default_rules() -> Vec<AccessRule> {
    vec![
        AccessRule::require("Suske", Some("final"), Some("Wiske")),
        AccessRule::unrestricted("Wiske"),
    ]
}

#[derive(Debug, Clone)]
pub struct AccessPolicy {
    table: HashMap<String, Option<AccessPredicate>>,
}

impl AccessPolicy {
    /// # Errors
    ///
    /// Returns [`IndexError::Config`] if a rule is malformed or an identity repeats.
    pub fn from_rules(rules: &[AccessRule]) -> Result<Self> {
        let mut table = HashMap::with_capacity(rules.len());
        for rule in rules {
            rule.validate()?;
            if table
                .insert(rule.identity.clone(), rule.predicate())
                .is_some()
            {
                return Err(IndexError::Config(format!(
                    "duplicate access rule for {:?}",
                    rule.identity
                )));
            }
        }
        Ok(Self { table })
    }

    /// Predicate for `identity`; `None` means search unfiltered.
    #[must_use]
    pub fn resolve(&self, identity: Option<&str>) -> Option<AccessPredicate> {
        match identity.and_then(|id| self.table.get(id)) {
            Some(entry) => entry.clone(),
            None => Some(AccessPredicate::DenyAll),
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        let table = default_rules()
            .iter()
            .map(|r| (r.identity.clone(), r.predicate()))
            .collect();
        Self { table }
    }
}
