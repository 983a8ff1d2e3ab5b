//! Spatial hashing for neighbor search.
//!
//! Maps each particle's grid cell to a 32-bit key, sorts the per-particle
//! (key, index) pairs with a stable counting sort, and derives a per-key
//! offset table. Neighbor queries scan the 3×3 cell block around a
//! position; with the cell size equal to the kernel support radius that
//! block covers the support exactly.
//!
//! The key alone decides bucket membership: two distant cells that collide
//! under the hash share a bucket, so candidate sets are a superset of the
//! true neighborhood and every consumer filters by distance. Duplicate
//! keys within one 3×3 block are visited once, otherwise a small key space
//! would scan the same sorted run repeatedly.

use bytemuck::{Pod, Zeroable};
use glam::{IVec2, Vec2};

use crate::parallel;

/// Offset-table sentinel: no entry carries this key.
pub const EMPTY_KEY: u32 = u32::MAX;

const HASH_K1: u32 = 15823;
const HASH_K2: u32 = 9737333;

/// Cell offsets scanned for a neighbor query.
pub const NEIGHBOR_OFFSETS: [IVec2; 9] = [
    IVec2::new(-1, -1),
    IVec2::new(-1, 0),
    IVec2::new(-1, 1),
    IVec2::new(0, -1),
    IVec2::new(0, 0),
    IVec2::new(0, 1),
    IVec2::new(1, -1),
    IVec2::new(1, 0),
    IVec2::new(1, 1),
];

/// One particle's (cell key, original index) pair.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct SpatialEntry {
    pub key: u32,
    pub index: u32,
}

#[inline]
pub fn cell_of(position: Vec2, cell_size: f32) -> IVec2 {
    (position / cell_size).floor().as_ivec2()
}

#[inline]
fn hash_cell(cell: IVec2) -> u32 {
    // large-prime multiply hash; negative cells wrap through `as u32`
    let x = cell.x as u32;
    let y = cell.y as u32;
    x.wrapping_mul(HASH_K1).wrapping_add(y.wrapping_mul(HASH_K2))
}

#[inline]
pub fn key_of(cell: IVec2, table_size: u32) -> u32 {
    hash_cell(cell) % table_size
}

/// Counting-sort spatial hash over a fixed particle population.
///
/// All storage is allocated once for `num_particles` and rebuilt in place
/// every step; the key space is sized to the particle count.
pub struct SpatialHash {
    table_size: u32,
    entries: Vec<SpatialEntry>,
    sorted_keys: Vec<u32>,
    sorted_indices: Vec<u32>,
    /// original index -> sorted slot, recorded during the scatter
    slot_of: Vec<u32>,
    counts: Vec<u32>,
    offsets: Vec<u32>,
}

impl SpatialHash {
    pub fn new(num_particles: usize) -> Self {
        let table_size = num_particles.max(1);
        Self {
            table_size: table_size as u32,
            entries: vec![SpatialEntry::default(); num_particles],
            sorted_keys: vec![0; num_particles],
            sorted_indices: vec![0; num_particles],
            slot_of: vec![0; num_particles],
            counts: vec![0; table_size],
            offsets: vec![EMPTY_KEY; table_size],
        }
    }

    pub fn table_size(&self) -> u32 {
        self.table_size
    }

    /// Permutation: sorted slot -> original particle index.
    pub fn sorted_indices(&self) -> &[u32] {
        &self.sorted_indices
    }

    /// Inverse permutation: original particle index -> sorted slot.
    pub fn slot_of(&self) -> &[u32] {
        &self.slot_of
    }

    pub fn sorted_keys(&self) -> &[u32] {
        &self.sorted_keys
    }

    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// Rebuild, sort, and index the hash for the given positions.
    pub fn update(&mut self, positions: &[Vec2], cell_size: f32) {
        self.build(positions, cell_size);
        self.sort();
        self.build_offsets();
    }

    /// Recompute every particle's (key, index) entry.
    pub fn build(&mut self, positions: &[Vec2], cell_size: f32) {
        debug_assert_eq!(positions.len(), self.entries.len());
        let table_size = self.table_size;
        parallel::fill_indexed(&mut self.entries, |i| SpatialEntry {
            key: key_of(cell_of(positions[i], cell_size), table_size),
            index: i as u32,
        });
    }

    /// Stable counting sort of the entries by key. Scattering in original
    /// index order keeps equal keys in index order, which makes the whole
    /// step deterministic. Also records each particle's destination slot
    /// for the copyback inverse permutation.
    pub fn sort(&mut self) {
        self.counts.fill(0);
        for entry in &self.entries {
            self.counts[entry.key as usize] += 1;
        }

        // exclusive prefix scan; counts then holds the next free slot per key
        let mut total = 0u32;
        for count in &mut self.counts {
            let n = *count;
            *count = total;
            total += n;
        }

        for entry in &self.entries {
            let dst = self.counts[entry.key as usize];
            self.counts[entry.key as usize] += 1;
            self.sorted_keys[dst as usize] = entry.key;
            self.sorted_indices[dst as usize] = entry.index;
            self.slot_of[entry.index as usize] = dst;
        }
    }

    /// Derive `offsets[key]` = first sorted slot holding that key.
    pub fn build_offsets(&mut self) {
        self.offsets.fill(EMPTY_KEY);
        let mut prev = EMPTY_KEY;
        for (slot, &key) in self.sorted_keys.iter().enumerate() {
            if key != prev {
                self.offsets[key as usize] = slot as u32;
                prev = key;
            }
        }
    }

    /// Visit the sorted slot of every neighbor candidate around `position`:
    /// all entries of the 3×3 cell block. Candidates are a superset of the
    /// true neighborhood; callers filter by distance.
    pub fn for_each_candidate(&self, position: Vec2, cell_size: f32, mut visit: impl FnMut(usize)) {
        let origin = cell_of(position, cell_size);
        let mut seen = [EMPTY_KEY; NEIGHBOR_OFFSETS.len()];
        let mut seen_len = 0;

        for offset in NEIGHBOR_OFFSETS {
            let key = key_of(origin + offset, self.table_size);
            if seen[..seen_len].contains(&key) {
                continue;
            }
            seen[seen_len] = key;
            seen_len += 1;

            let start = self.offsets[key as usize];
            if start == EMPTY_KEY {
                continue;
            }
            let mut slot = start as usize;
            while slot < self.sorted_keys.len() && self.sorted_keys[slot] == key {
                visit(slot);
                slot += 1;
            }
        }
    }

    pub(crate) fn release(&mut self) {
        self.entries = Vec::new();
        self.sorted_keys = Vec::new();
        self.sorted_indices = Vec::new();
        self.slot_of = Vec::new();
        self.counts = Vec::new();
        self.offsets = Vec::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spawner::Spawner2D;

    const CELL: f32 = 0.5;

    #[test]
    fn key_is_deterministic() {
        let cell = IVec2::new(3, -7);
        assert_eq!(key_of(cell, 1024), key_of(cell, 1024));
    }

    #[test]
    fn cell_floor_handles_negative_coordinates() {
        assert_eq!(cell_of(Vec2::new(0.2, 0.2), CELL), IVec2::ZERO);
        assert_eq!(cell_of(Vec2::new(-0.2, 0.7), CELL), IVec2::new(-1, 1));
    }

    #[test]
    fn sort_is_stable_and_records_slots() {
        let positions = vec![
            Vec2::new(0.1, 0.1),
            Vec2::new(3.0, 0.0),
            Vec2::new(0.2, 0.2),
            Vec2::new(0.3, 0.1),
        ];
        let mut hash = SpatialHash::new(positions.len());
        hash.update(&positions, CELL);

        // the co-located particles stay in index order; the outlier's cell
        // keys differently in this 4-slot table
        let shared_key = key_of(IVec2::ZERO, hash.table_size());
        assert_ne!(key_of(cell_of(positions[1], CELL), hash.table_size()), shared_key);
        let run: Vec<u32> = hash
            .sorted_keys()
            .iter()
            .zip(hash.sorted_indices())
            .filter(|&(&k, _)| k == shared_key)
            .map(|(_, &i)| i)
            .collect();
        assert_eq!(run, vec![0, 2, 3]);

        // slot_of inverts sorted_indices
        for (slot, &orig) in hash.sorted_indices().iter().enumerate() {
            assert_eq!(hash.slot_of()[orig as usize], slot as u32);
        }
    }

    #[test]
    fn offsets_point_at_run_starts() {
        let positions = vec![Vec2::ZERO, Vec2::new(3.0, 0.0), Vec2::new(0.1, 0.0)];
        let mut hash = SpatialHash::new(positions.len());
        hash.update(&positions, CELL);

        for (key, &offset) in hash.offsets().iter().enumerate() {
            if offset == EMPTY_KEY {
                assert!(!hash.sorted_keys().contains(&(key as u32)));
            } else {
                let offset = offset as usize;
                assert_eq!(hash.sorted_keys()[offset], key as u32);
                assert!(offset == 0 || hash.sorted_keys()[offset - 1] != key as u32);
            }
        }
    }

    /// Hash candidates must be a superset of the brute-force neighborhood,
    /// never a subset: collisions may add candidates, distance filtering
    /// removes them.
    #[test]
    fn candidates_superset_of_brute_force() {
        let spawner = Spawner2D {
            region_size: Vec2::new(4.0, 4.0),
            position_jitter: 0.4,
            grid_count: glam::UVec2::new(13, 11),
            ..Default::default()
        };
        let positions = spawner.spawn_data().positions;
        let mut hash = SpatialHash::new(positions.len());
        hash.update(&positions, CELL);

        for (i, &pos) in positions.iter().enumerate() {
            let mut candidates: Vec<u32> = Vec::new();
            hash.for_each_candidate(pos, CELL, |slot| {
                candidates.push(hash.sorted_indices()[slot]);
            });
            candidates.sort_unstable();
            candidates.dedup();

            for (j, &other) in positions.iter().enumerate() {
                if pos.distance_squared(other) <= CELL * CELL {
                    assert!(
                        candidates.contains(&(j as u32)),
                        "particle {i} missing true neighbor {j}"
                    );
                }
            }
        }
    }

    /// A population of one maps every block cell to the same key; the
    /// in-block dedup must still visit the particle exactly once.
    #[test]
    fn single_particle_visited_once() {
        let positions = vec![Vec2::new(0.2, 0.3)];
        let mut hash = SpatialHash::new(1);
        hash.update(&positions, CELL);

        let mut visits = 0;
        hash.for_each_candidate(positions[0], CELL, |_| visits += 1);
        assert_eq!(visits, 1);
    }
}
