//! Named privilege bits and the rank entitlement policy.
//!
//! A [`Privileges`] value is a plain bit set. Each known bit has a stable
//! display name and a minimum rank; the bits a rank may hold form its
//! entitlement, and every token mask is clamped to that entitlement.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Sub};

/// Set of capabilities held by a token or required by a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Privileges(u64);

impl Privileges {
    pub const READ: Self = Self(1 << 0);
    pub const READ_CONFIDENTIAL: Self = Self(1 << 1);
    pub const WRITE: Self = Self(1 << 2);
    pub const MANAGE_BADGES: Self = Self(1 << 3);
    pub const BETA_KEYS: Self = Self(1 << 4);
    pub const MANAGE_SETTINGS: Self = Self(1 << 5);
    pub const VIEW_USER_ADVANCED: Self = Self(1 << 6);
    pub const MANAGE_USER: Self = Self(1 << 7);
    pub const MANAGE_ROLES: Self = Self(1 << 8);
    pub const MANAGE_API_KEYS: Self = Self(1 << 9);
    pub const BLOG: Self = Self(1 << 10);
    pub const API_META: Self = Self(1 << 11);
    pub const BEATMAP: Self = Self(1 << 12);

    /// The set with no capabilities.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every known capability.
    #[cfg(test)]
    pub const fn all() -> Self {
        Self((1 << CATALOGUE.len()) - 1)
    }

    /// Wrap raw bits as stored or requested. Unknown bits are kept; they
    /// carry no name and no rank entitles them.
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is held.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Bits of `self` not present in `other`.
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Known single-bit privileges set in this mask, in bit order.
    pub fn iter(self) -> impl Iterator<Item = Privileges> {
        CATALOGUE
            .iter()
            .map(|entry| entry.bit)
            .filter(move |bit| self.contains(*bit))
    }

    /// Display names of the known bits set in this mask, in bit order.
    pub fn names(self) -> Vec<&'static str> {
        CATALOGUE
            .iter()
            .filter(|entry| self.contains(entry.bit))
            .map(|entry| entry.name)
            .collect()
    }

    /// Everything a principal of `rank` is allowed to hold.
    pub fn entitlement(rank: i64) -> Self {
        CATALOGUE
            .iter()
            .filter(|entry| rank >= entry.min_rank)
            .fold(Self::empty(), |acc, entry| acc | entry.bit)
    }

    /// Clamp a requested mask to what `rank` entitles.
    ///
    /// The result is always a submask of both `self` and
    /// [`Privileges::entitlement`]`(rank)`.
    pub fn cap_to_rank(self, rank: i64) -> Self {
        self & Self::entitlement(rank)
    }
}

struct CatalogueEntry {
    bit: Privileges,
    name: &'static str,
    min_rank: i64,
}

const CATALOGUE: &[CatalogueEntry] = &[
    CatalogueEntry { bit: Privileges::READ, name: "Read", min_rank: 1 },
    CatalogueEntry { bit: Privileges::READ_CONFIDENTIAL, name: "ReadConfidential", min_rank: 1 },
    CatalogueEntry { bit: Privileges::WRITE, name: "Write", min_rank: 1 },
    CatalogueEntry { bit: Privileges::MANAGE_BADGES, name: "ManageBadges", min_rank: 3 },
    CatalogueEntry { bit: Privileges::BETA_KEYS, name: "BetaKeys", min_rank: 3 },
    CatalogueEntry { bit: Privileges::MANAGE_SETTINGS, name: "ManageSettings", min_rank: 4 },
    CatalogueEntry { bit: Privileges::VIEW_USER_ADVANCED, name: "ViewUserAdvanced", min_rank: 4 },
    CatalogueEntry { bit: Privileges::MANAGE_USER, name: "ManageUser", min_rank: 4 },
    CatalogueEntry { bit: Privileges::MANAGE_ROLES, name: "ManageRoles", min_rank: 4 },
    CatalogueEntry { bit: Privileges::MANAGE_API_KEYS, name: "ManageApiKeys", min_rank: 4 },
    CatalogueEntry { bit: Privileges::BLOG, name: "Blog", min_rank: 3 },
    CatalogueEntry { bit: Privileges::API_META, name: "ApiMeta", min_rank: 4 },
    CatalogueEntry { bit: Privileges::BEATMAP, name: "Beatmap", min_rank: 4 },
];

impl fmt::Display for Privileges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(", "))
    }
}

impl BitOr for Privileges {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for Privileges {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Privileges {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

impl BitAndAssign for Privileges {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Sub for Privileges {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.difference(rhs)
    }
}
