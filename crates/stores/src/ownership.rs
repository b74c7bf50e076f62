//! Ownership / membership checks for entities addressed through a store.
//!
//! Update paths are always scoped by a store id (`/pet_store/{id}/...`). Before
//! any field of a fetched child is touched, the child must be shown to belong
//! to that store.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use petstore_core::{DomainError, DomainResult, Entity, StoreId};

use crate::{Customer, Employee};

/// How a child entity is attached to stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owners<'a> {
    /// Exactly one owning store (employees). `None` means not yet assigned.
    Exclusive(Option<StoreId>),
    /// A membership set (customers).
    Shared(&'a BTreeSet<StoreId>),
}

/// An entity that is owned by, or a member of, one or more stores.
pub trait Owned: Entity {
    fn owners(&self) -> Owners<'_>;
}

impl Owned for Employee {
    fn owners(&self) -> Owners<'_> {
        Owners::Exclusive(self.store_id())
    }
}

impl Owned for Customer {
    fn owners(&self) -> Owners<'_> {
        Owners::Shared(self.store_ids())
    }
}

/// Rule applied to a shared entity's membership set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipPolicy {
    /// The target store must be one of the current members.
    Member,
    /// Every current member must be the target store. An empty set passes.
    #[default]
    Exclusive,
}

impl FromStr for MembershipPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "member" => Ok(Self::Member),
            "exclusive" => Ok(Self::Exclusive),
            other => Err(DomainError::validation(format!(
                "membership policy must be one of: member, exclusive (got '{other}')"
            ))),
        }
    }
}

/// Confirms that a child entity is associated with the store it is addressed
/// through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OwnershipValidator {
    policy: MembershipPolicy,
}

impl OwnershipValidator {
    pub fn new(policy: MembershipPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MembershipPolicy {
        self.policy
    }

    /// Fails with `OwnershipViolation` unless `child` belongs to `expected`.
    ///
    /// Takes the child by shared reference: a failed check never leaves a
    /// partially mutated entity behind.
    pub fn validate<C: Owned>(&self, child: &C, expected: StoreId) -> DomainResult<()> {
        let allowed = match child.owners() {
            Owners::Exclusive(owner) => owner == Some(expected),
            Owners::Shared(members) => match self.policy {
                MembershipPolicy::Member => members.contains(&expected),
                MembershipPolicy::Exclusive => members.iter().all(|m| *m == expected),
            },
        };

        if allowed {
            Ok(())
        } else {
            Err(DomainError::ownership(format!(
                "{} {} does not belong to store {}",
                C::KIND,
                describe_id(child),
                expected
            )))
        }
    }
}

fn describe_id<C: Entity>(child: &C) -> String {
    child
        .id()
        .map(|id| format!("with id {id}"))
        .unwrap_or_else(|| "without id".to_string())
}
