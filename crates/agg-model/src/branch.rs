//! Branch identity
//!
//! Every upstream lookup issued during an aggregation is a branch. The
//! [`BranchKind`] selects the recovery behavior; the [`BranchId`] adds the
//! per-option key inventory branches are correlated by.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of upstream lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchKind {
    /// Product info (the anchor lookup)
    Info,
    /// Review summary
    Review,
    /// Inventory for one product option
    Inventory,
}

impl BranchKind {
    /// All kinds known to the aggregator
    pub const ALL: [BranchKind; 3] = [BranchKind::Info, BranchKind::Review, BranchKind::Inventory];

    /// Stable lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchKind::Info => "info",
            BranchKind::Review => "review",
            BranchKind::Inventory => "inventory",
        }
    }
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a single branch within one aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchId {
    /// Product info lookup
    Info,
    /// Review lookup
    Review,
    /// Inventory lookup for the option at `position`
    ///
    /// Option ids may repeat, so the position in the option list is the key.
    Inventory { option_id: u32, position: usize },
}

impl BranchId {
    /// Inventory branch for the option at `position`
    #[inline]
    #[must_use]
    pub fn inventory(option_id: u32, position: usize) -> Self {
        Self::Inventory {
            option_id,
            position,
        }
    }

    /// Kind used for recovery lookup
    #[inline]
    #[must_use]
    pub fn kind(&self) -> BranchKind {
        match self {
            BranchId::Info => BranchKind::Info,
            BranchId::Review => BranchKind::Review,
            BranchId::Inventory { .. } => BranchKind::Inventory,
        }
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchId::Info => f.write_str("info"),
            BranchId::Review => f.write_str("review"),
            BranchId::Inventory {
                option_id,
                position,
            } => write!(f, "inventory[option={option_id}, position={position}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_id_maps_to_kind() {
        assert_eq!(BranchId::Info.kind(), BranchKind::Info);
        assert_eq!(BranchId::Review.kind(), BranchKind::Review);
        assert_eq!(BranchId::inventory(7, 0).kind(), BranchKind::Inventory);
    }

    #[test]
    fn inventory_branches_with_same_option_id_differ_by_position() {
        assert_ne!(BranchId::inventory(1, 0), BranchId::inventory(1, 1));
    }

    #[test]
    fn branch_id_display() {
        assert_eq!(BranchId::Review.to_string(), "review");
        assert_eq!(
            BranchId::inventory(2, 1).to_string(),
            "inventory[option=2, position=1]"
        );
    }
}
