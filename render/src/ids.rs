// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Allocation of per-hop encapsulation identifiers (VLAN ids, MPLS labels).
//!
//! Every path gets a block of `per_path` identifiers and each of its hops one identifier in
//! that block, `per_hop` apart. Allocators are shared by all compiles and safe to use from
//! concurrent ones.

use crate::concurrency::sync::Mutex;
use crate::errors::RenderError;
use crate::params::{IdAllocation, IdPoolParams};
use ordermap::OrderMap;
use std::collections::BTreeSet;
use std::sync::PoisonError;
use topology::{PathId, PathTransport};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct Blocks {
    /// Start of the next block handed out by the sequential allocator.
    next: Option<u32>,
    /// Blocks currently held by paths.
    assigned: OrderMap<PathId, u32>,
}

/// Hands out identifier blocks to paths from one pool.
#[derive(Debug)]
pub struct IdAllocator {
    transport: PathTransport,
    pool: IdPoolParams,
    mode: IdAllocation,
    blocks: Mutex<Blocks>,
}

impl IdAllocator {
    #[must_use]
    pub fn new(transport: PathTransport, pool: IdPoolParams, mode: IdAllocation) -> Self {
        Self {
            transport,
            pool,
            mode,
            blocks: Mutex::new(Blocks::default()),
        }
    }

    fn blocks_in_pool(&self) -> u32 {
        self.pool.range() / self.pool.per_path
    }

    /// Start of the block following the one at `start`, wrapping at the end of the pool.
    fn block_after(&self, start: u32) -> u32 {
        match start.checked_add(self.pool.per_path) {
            Some(next) if next.saturating_add(self.pool.per_path - 1) <= self.pool.last => next,
            _ => self.pool.first,
        }
    }

    /// The first block from the sequential counter on that no path holds.
    fn next_sequential_block(&self, blocks: &mut Blocks) -> Option<u32> {
        let held: BTreeSet<u32> = blocks.assigned.values().copied().collect();
        let mut start = blocks.next.unwrap_or(self.pool.first);
        for _ in 0..self.blocks_in_pool() {
            let next = self.block_after(start);
            if next == self.pool.first {
                debug!("{} identifier pool wraps around", self.transport);
            }
            if !held.contains(&start) {
                blocks.next = Some(next);
                return Some(start);
            }
            start = next;
        }
        None
    }

    fn derived_block(&self, path: PathId) -> u32 {
        let index = path.as_u32() % self.blocks_in_pool();
        self.pool.first + index * self.pool.per_path
    }

    /// The identifiers of the `hops` hops of `path`, in hop order.
    ///
    /// A path that already holds a block keeps it, so that re-rendering a path does not move
    /// its identifiers.
    pub fn allocate(&self, path: PathId, hops: usize) -> Result<Vec<u32>, RenderError> {
        if hops == 0 {
            return Ok(vec![]);
        }
        let exhausted = || RenderError::IdSpaceExhausted {
            path,
            transport: self.transport,
            hops,
        };
        let hops_u32 = u32::try_from(hops).map_err(|_| exhausted())?;
        if hops_u32 > self.pool.hops_per_block() {
            return Err(exhausted());
        }
        let start = {
            // the lock is only held for the counter update
            let mut blocks = self.blocks.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(start) = blocks.assigned.get(&path) {
                *start
            } else {
                let start = match self.mode {
                    IdAllocation::Sequential => {
                        let Some(start) = self.next_sequential_block(&mut blocks) else {
                            warn!(
                                "No free {} block left among {} for path {path}",
                                self.transport,
                                blocks.assigned.len()
                            );
                            return Err(exhausted());
                        };
                        start
                    }
                    IdAllocation::PathDerived => {
                        let start = self.derived_block(path);
                        if let Some((other, _)) =
                            blocks.assigned.iter().find(|(_, held)| **held == start)
                        {
                            warn!("Path {path} shares its {} block with path {other}", self.transport);
                        }
                        start
                    }
                };
                blocks.assigned.insert(path, start);
                start
            }
        };
        debug!("Path {path}: {} block starting at {start}", self.transport);
        Ok((0..hops_u32)
            .map(|k| start + k * self.pool.per_hop)
            .collect())
    }

    /// Give up the block held by `path`. The sequential counter does not go back, the block is
    /// only handed out again once the counter wraps around to it.
    pub fn release(&self, path: PathId) {
        let mut blocks = self.blocks.lock().unwrap_or_else(PoisonError::into_inner);
        if blocks.assigned.remove(&path).is_some() {
            debug!("Path {path}: released {} block", self.transport);
        }
    }
}

#[cfg(all(test, not(feature = "shuttle")))]
mod tests {
    use super::*;

    fn vlan(mode: IdAllocation) -> IdAllocator {
        IdAllocator::new(PathTransport::Vlan, IdPoolParams::vlan(), mode)
    }

    #[test]
    fn sequential_blocks_of_100() {
        let ids = vlan(IdAllocation::Sequential);
        assert_eq!(ids.allocate(PathId::new(1), 2).unwrap(), vec![100, 101]);
        assert_eq!(ids.allocate(PathId::new(2), 3).unwrap(), vec![200, 201, 202]);
        // same path, same block
        assert_eq!(ids.allocate(PathId::new(1), 2).unwrap(), vec![100, 101]);
        ids.release(PathId::new(1));
        assert_eq!(ids.allocate(PathId::new(1), 2).unwrap(), vec![300, 301]);
    }

    #[test]
    fn sequential_wraps_around_held_blocks() {
        let pool = IdPoolParams {
            first: 100,
            last: 399,
            per_path: 100,
            per_hop: 1,
        };
        let ids = IdAllocator::new(PathTransport::Vlan, pool, IdAllocation::Sequential);
        let starts: Vec<u32> = (0..3)
            .map(|p| ids.allocate(PathId::new(p), 1).unwrap()[0])
            .collect();
        assert_eq!(starts, vec![100, 200, 300]);
        ids.release(PathId::new(1));
        // 100 is still held by path 0
        assert_eq!(ids.allocate(PathId::new(3), 2).unwrap(), vec![200, 201]);
    }

    #[test]
    fn live_paths_never_share_a_block() {
        let ids = vlan(IdAllocation::Sequential);
        // 3995 identifiers make 39 blocks
        let starts: BTreeSet<u32> = (0..39)
            .map(|p| ids.allocate(PathId::new(p), 2).unwrap()[0])
            .collect();
        assert_eq!(starts.len(), 39);
        assert_eq!(
            ids.allocate(PathId::new(39), 2),
            Err(RenderError::IdSpaceExhausted {
                path: PathId::new(39),
                transport: PathTransport::Vlan,
                hops: 2
            })
        );
        // path 0 still holds its block
        assert_eq!(ids.allocate(PathId::new(0), 2).unwrap(), vec![100, 101]);

        ids.release(PathId::new(5));
        assert_eq!(ids.allocate(PathId::new(39), 2).unwrap(), vec![600, 601]);
    }

    #[test]
    fn path_derived_blocks() {
        let ids = vlan(IdAllocation::PathDerived);
        // 3995 identifiers make 39 blocks
        assert_eq!(ids.allocate(PathId::new(0), 1).unwrap(), vec![100]);
        assert_eq!(ids.allocate(PathId::new(5), 2).unwrap(), vec![600, 601]);
        assert_eq!(ids.allocate(PathId::new(39), 1).unwrap(), vec![100]);
    }

    #[test]
    fn too_many_hops() {
        let ids = vlan(IdAllocation::Sequential);
        assert_eq!(
            ids.allocate(PathId::new(1), 101),
            Err(RenderError::IdSpaceExhausted {
                path: PathId::new(1),
                transport: PathTransport::Vlan,
                hops: 101
            })
        );
        assert_eq!(ids.allocate(PathId::new(1), 0), Ok(vec![]));
    }

    #[test]
    fn identifiers_increase_within_a_path() {
        bolero::check!()
            .with_type::<(u32, u8, bool)>()
            .cloned()
            .for_each(|(path, hops, derived)| {
                let mode = if derived {
                    IdAllocation::PathDerived
                } else {
                    IdAllocation::Sequential
                };
                let ids = vlan(mode);
                let hops = usize::from(hops % 100) + 1;
                let allocated = ids.allocate(PathId::new(path), hops).unwrap();
                assert_eq!(allocated.len(), hops);
                assert!(allocated.windows(2).all(|w| w[0] < w[1]));
                assert!(allocated.iter().all(|id| (100..=4094).contains(id)));
            });
    }

    #[test]
    fn concurrent_paths_get_distinct_blocks() {
        let ids = std::sync::Arc::new(vlan(IdAllocation::Sequential));
        let handles: Vec<_> = (0..8)
            .map(|p| {
                let ids = ids.clone();
                std::thread::spawn(move || ids.allocate(PathId::new(p), 3).unwrap())
            })
            .collect();
        let mut seen = BTreeSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(seen.insert(id), "identifier {id} handed out twice");
            }
        }
        assert_eq!(seen.len(), 24);
    }
}
