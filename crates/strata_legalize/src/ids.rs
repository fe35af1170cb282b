//! Opaque ID newtypes for legalization group entities.
//!
//! [`ShapeId`] and [`ChainId`] are thin `u32` wrappers indexing into the
//! design's group tables. Instance IDs ([`strata_fabric::InstId`]) come from
//! the fabric crate because region member lists reference them.

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
    /// Opaque, copyable ID for a shape group (rigid offset group).
    ShapeId
);

define_id!(
    /// Opaque, copyable ID for a chain group (rigid group legalized by search).
    ChainId
);
