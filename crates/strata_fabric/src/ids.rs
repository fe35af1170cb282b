//! Opaque ID newtypes for fabric entities.
//!
//! Each ID is a thin `u32` wrapper that is `Copy`, `Hash`, and
//! `Serialize`/`Deserialize`. These IDs reference sites, site kinds, area
//! types, regions, clock regions, and instances within a placement run.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a site (placement location) in the fabric grid.
    SiteId
);

define_id!(
    /// Opaque, copyable ID for a site kind (capacity profile shared by sites).
    SiteKindId
);

define_id!(
    /// Opaque, copyable ID for a resource/area type (LUT, FF, DSP, IO, ...).
    AreaTypeId
);

define_id!(
    /// Opaque, copyable ID for a placement region (fence).
    RegionId
);

define_id!(
    /// Opaque, copyable ID for a clock region of the fabric.
    ClockRegionId
);

define_id!(
    /// Opaque, copyable ID for a placeable instance.
    ///
    /// Instances are owned by the placement setup collaborator, but the
    /// fabric references them in region member lists, so the ID type lives
    /// here.
    InstId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn id_roundtrip() {
        let id = SiteId::from_raw(42);
        assert_eq!(id.as_raw(), 42);
    }

    #[test]
    fn id_equality() {
        let a = AreaTypeId::from_raw(7);
        let b = AreaTypeId::from_raw(7);
        let c = AreaTypeId::from_raw(8);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn id_ordering() {
        assert!(SiteId::from_raw(3) < SiteId::from_raw(4));
        assert!(InstId::from_raw(0) < InstId::from_raw(u32::MAX));
    }

    #[test]
    fn id_hash_in_set() {
        let mut set = HashSet::new();
        set.insert(RegionId::from_raw(1));
        set.insert(RegionId::from_raw(2));
        set.insert(RegionId::from_raw(1));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn id_serde_roundtrip() {
        let id = ClockRegionId::from_raw(99);
        let json = serde_json::to_string(&id).unwrap();
        let restored: ClockRegionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, restored);
    }

    #[test]
    fn id_display() {
        let id = InstId::from_raw(42);
        assert_eq!(format!("{id}"), "42");
    }
}
