//! Core legalization data structures.
//!
//! Defines the physical design view used during legalization: instances
//! (with footprint, class, and group membership), rigid shape and chain
//! groups, and the shared [`Positions`] coordinate buffer that every stage
//! mutates in place. The [`Design`] is the central data structure handed in
//! by the placement setup collaborator.

use crate::ids::{ChainId, ShapeId};
use serde::{Deserialize, Serialize};
use strata_fabric::{AreaTypeId, InstId, RegionId};

/// The placement class of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstClass {
    /// A functional instance the legalizer may move.
    Movable,
    /// A pre-placed instance that must never move; acts as an obstacle.
    Fixed,
    /// A non-functional density placeholder; excluded from assignment and
    /// from legality checks, dropped by the caller after legalization.
    Filler,
}

/// The fixed relative offset of a group member from its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupOffset {
    /// Horizontal offset in site units.
    pub dx: f32,
    /// Vertical offset in site units.
    pub dy: f32,
    /// Sub-site slot offset.
    pub dz: i32,
}

impl GroupOffset {
    /// The zero offset (the anchor's own offset).
    pub const ZERO: GroupOffset = GroupOffset {
        dx: 0.0,
        dy: 0.0,
        dz: 0,
    };

    /// Creates an offset from its components.
    pub fn new(dx: f32, dy: f32, dz: i32) -> Self {
        Self { dx, dy, dz }
    }
}

/// A placeable instance.
///
/// Positions live in the separate [`Positions`] buffer, indexed by
/// [`InstId`]; the instance record itself is immutable during legalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    /// The unique ID of this instance.
    pub id: InstId,
    /// Human-readable instance name (e.g., "u_core/alu/add_0").
    pub name: String,
    /// The resource/area type this instance occupies.
    pub area_type: AreaTypeId,
    /// Footprint width in site units.
    pub width: f32,
    /// Footprint height in site units.
    pub height: f32,
    /// The placement class of this instance.
    pub class: InstClass,
    /// The region confining this instance, if any.
    pub region: Option<RegionId>,
    /// The shape group this instance belongs to, if any.
    pub shape: Option<ShapeId>,
    /// The chain group this instance belongs to, if any.
    pub chain: Option<ChainId>,
    /// Clock nets loaded by this instance (for clock-budget checks).
    pub clock_nets: Vec<u32>,
}

impl Instance {
    /// Returns whether the legalizer may move this instance.
    pub fn is_movable(&self) -> bool {
        self.class == InstClass::Movable
    }
}

/// An ordered group of instances holding fixed offsets from an anchor.
///
/// `members[0]` is the anchor and `offsets[0]` is [`GroupOffset::ZERO`].
/// After shape alignment every member sits at anchor + offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeGroup {
    /// The unique ID of this shape group.
    pub id: ShapeId,
    /// Member instances; the first is the anchor.
    pub members: Vec<InstId>,
    /// Per-member offsets from the anchor, parallel to `members`.
    pub offsets: Vec<GroupOffset>,
}

/// A rigid group legalized by radius-expanding search.
///
/// Like a [`ShapeGroup`], but members must land on a contiguous run of
/// compatible sites, so the group is placed as one body by the chain
/// legalizer rather than through flow assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainGroup {
    /// The unique ID of this chain group.
    pub id: ChainId,
    /// Member instances; the first is the anchor.
    pub members: Vec<InstId>,
    /// Per-member offsets from the anchor, parallel to `members`.
    pub offsets: Vec<GroupOffset>,
}

/// The design view handed to the legalizer by placement setup.
///
/// Holds all instances and their group structure. Instances are never
/// created or destroyed during legalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Design {
    /// All instances, indexed by [`InstId`].
    pub instances: Vec<Instance>,
    /// All shape groups.
    pub shapes: Vec<ShapeGroup>,
    /// All chain groups.
    pub chains: Vec<ChainGroup>,
}

impl Design {
    /// Creates an empty design.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an instance and returns its ID.
    pub fn add_instance(&mut self, mut inst: Instance) -> InstId {
        let id = InstId::from_raw(self.instances.len() as u32);
        inst.id = id;
        self.instances.push(inst);
        id
    }

    /// Adds a shape group and returns its ID, recording membership on each
    /// member instance.
    ///
    /// Group definitions are assumed validated on ingestion; the member and
    /// offset lists must be parallel and the first offset must be zero.
    pub fn add_shape(&mut self, members: Vec<InstId>, offsets: Vec<GroupOffset>) -> ShapeId {
        debug_assert_eq!(members.len(), offsets.len());
        debug_assert_eq!(offsets.first().copied(), Some(GroupOffset::ZERO));
        let id = ShapeId::from_raw(self.shapes.len() as u32);
        for &m in &members {
            self.instances[m.as_raw() as usize].shape = Some(id);
        }
        self.shapes.push(ShapeGroup {
            id,
            members,
            offsets,
        });
        id
    }

    /// Adds a chain group and returns its ID, recording membership on each
    /// member instance.
    pub fn add_chain(&mut self, members: Vec<InstId>, offsets: Vec<GroupOffset>) -> ChainId {
        debug_assert_eq!(members.len(), offsets.len());
        debug_assert_eq!(offsets.first().copied(), Some(GroupOffset::ZERO));
        let id = ChainId::from_raw(self.chains.len() as u32);
        for &m in &members {
            self.instances[m.as_raw() as usize].chain = Some(id);
        }
        self.chains.push(ChainGroup {
            id,
            members,
            offsets,
        });
        id
    }

    /// Returns the instance with the given ID.
    pub fn instance(&self, id: InstId) -> &Instance {
        &self.instances[id.as_raw() as usize]
    }

    /// Returns the number of instances.
    pub fn num_instances(&self) -> usize {
        self.instances.len()
    }

    /// Returns all instances of the given area type.
    pub fn instances_of_type(&self, area_type: AreaTypeId) -> impl Iterator<Item = &Instance> {
        self.instances
            .iter()
            .filter(move |i| i.area_type == area_type)
    }
}

/// The shared host-resident coordinate buffer, one entry per instance.
///
/// `x` and `y` are the instance's lower-left corner in site units; `z` is
/// the discrete sub-site slot for multi-capacity sites. Stages mutate this
/// buffer in place under the pipeline's strict stage ordering. Positions
/// originating in accelerator memory must be copied into this buffer at the
/// pipeline boundary and copied back afterward; no internal stage is aware
/// of any other residency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Positions {
    x: Vec<f32>,
    y: Vec<f32>,
    z: Vec<u32>,
}

impl Positions {
    /// Creates a zeroed buffer for `len` instances.
    pub fn new(len: usize) -> Self {
        Self {
            x: vec![0.0; len],
            y: vec![0.0; len],
            z: vec![0; len],
        }
    }

    /// Creates a buffer from parallel coordinate vectors.
    pub fn from_xy(x: Vec<f32>, y: Vec<f32>) -> Self {
        assert_eq!(x.len(), y.len());
        let len = x.len();
        Self {
            x,
            y,
            z: vec![0; len],
        }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Returns whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Returns the `(x, y)` coordinates of an instance.
    pub fn xy(&self, id: InstId) -> (f32, f32) {
        let i = id.as_raw() as usize;
        (self.x[i], self.y[i])
    }

    /// Returns the `(x, y, z)` coordinates of an instance.
    pub fn xyz(&self, id: InstId) -> (f32, f32, u32) {
        let i = id.as_raw() as usize;
        (self.x[i], self.y[i], self.z[i])
    }

    /// Returns the sub-site slot of an instance.
    pub fn z(&self, id: InstId) -> u32 {
        self.z[id.as_raw() as usize]
    }

    /// Sets the `(x, y)` coordinates of an instance, leaving `z` unchanged.
    pub fn set_xy(&mut self, id: InstId, x: f32, y: f32) {
        let i = id.as_raw() as usize;
        self.x[i] = x;
        self.y[i] = y;
    }

    /// Sets all three coordinates of an instance.
    pub fn set_xyz(&mut self, id: InstId, x: f32, y: f32, z: u32) {
        let i = id.as_raw() as usize;
        self.x[i] = x;
        self.y[i] = y;
        self.z[i] = z;
    }
}
