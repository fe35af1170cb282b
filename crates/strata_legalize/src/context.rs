//! Shared legalization state passed explicitly between stages.
//!
//! The context replaces ambient counters with one struct handed by
//! reference to every stage: the per-instance lock mask, the per-area-type
//! lock mask, and the claimed `(site, slot)` set used by the sequential
//! chain legalizer.

use std::collections::HashSet;
use strata_fabric::{AreaTypeId, InstId, SiteId};

/// Mutable state shared across pipeline stages.
///
/// Lock masks are raised by the flow and region legalizers so that
/// subsequent placement stages treat the legalized instances (and their
/// whole area types) as fixed. The claimed set records `(site, slot)`
/// occupancy for the chain search.
#[derive(Debug, Clone)]
pub struct LegalizationContext {
    inst_locked: Vec<bool>,
    area_type_locked: Vec<bool>,
    claimed: HashSet<(SiteId, u32)>,
}

impl LegalizationContext {
    /// Creates a context for `num_insts` instances and `num_area_types` area types.
    pub fn new(num_insts: usize, num_area_types: usize) -> Self {
        Self {
            inst_locked: vec![false; num_insts],
            area_type_locked: vec![false; num_area_types],
            claimed: HashSet::new(),
        }
    }

    /// Raises the lock flag on an instance.
    pub fn lock_inst(&mut self, id: InstId) {
        self.inst_locked[id.as_raw() as usize] = true;
    }

    /// Returns whether an instance is locked.
    pub fn is_inst_locked(&self, id: InstId) -> bool {
        self.inst_locked[id.as_raw() as usize]
    }

    /// Raises the lock flag on an area type.
    pub fn lock_area_type(&mut self, id: AreaTypeId) {
        self.area_type_locked[id.as_raw() as usize] = true;
    }

    /// Returns whether an area type is locked.
    pub fn is_area_type_locked(&self, id: AreaTypeId) -> bool {
        self.area_type_locked[id.as_raw() as usize]
    }

    /// Returns the instance lock mask, indexed by raw instance ID.
    pub fn inst_lock_mask(&self) -> &[bool] {
        &self.inst_locked
    }

    /// Claims the `(site, slot)` pair.
    ///
    /// Returns `false` if the pair was already claimed.
    pub fn claim(&mut self, site: SiteId, z: u32) -> bool {
        self.claimed.insert((site, z))
    }

    /// Returns whether the `(site, slot)` pair is claimed.
    pub fn is_claimed(&self, site: SiteId, z: u32) -> bool {
        self.claimed.contains(&(site, z))
    }

    /// Returns the number of claimed `(site, slot)` pairs.
    pub fn num_claimed(&self) -> usize {
        self.claimed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_unlocked() {
        let ctx = LegalizationContext::new(3, 2);
        assert!(!ctx.is_inst_locked(InstId::from_raw(0)));
        assert!(!ctx.is_area_type_locked(AreaTypeId::from_raw(1)));
        assert_eq!(ctx.num_claimed(), 0);
    }

    #[test]
    fn lock_inst_and_type() {
        let mut ctx = LegalizationContext::new(3, 2);
        ctx.lock_inst(InstId::from_raw(2));
        ctx.lock_area_type(AreaTypeId::from_raw(0));
        assert!(ctx.is_inst_locked(InstId::from_raw(2)));
        assert!(!ctx.is_inst_locked(InstId::from_raw(1)));
        assert!(ctx.is_area_type_locked(AreaTypeId::from_raw(0)));
        assert_eq!(ctx.inst_lock_mask(), &[false, false, true]);
    }

    #[test]
    fn claim_is_exclusive() {
        let mut ctx = LegalizationContext::new(0, 0);
        let site = SiteId::from_raw(4);
        assert!(ctx.claim(site, 0));
        assert!(!ctx.claim(site, 0));
        assert!(ctx.claim(site, 1));
        assert!(ctx.is_claimed(site, 0));
        assert!(!ctx.is_claimed(SiteId::from_raw(5), 0));
        assert_eq!(ctx.num_claimed(), 2);
    }
}
