use glam::Vec2;

use crate::parallel;
use crate::spawner::ParticleSpawnData;

/// Column-oriented particle state.
///
/// Slot `i` of every array refers to the same particle at every step
/// boundary; the reorder/copyback pair permutes all arrays in lockstep so
/// external readers always see stable per-particle identity. Arrays are
/// sized once at init and never grow or shrink during a run.
#[derive(Clone, Debug, Default)]
pub struct ParticleBuffers {
    pub positions: Vec<Vec2>,
    pub predicted_positions: Vec<Vec2>,
    pub velocities: Vec<Vec2>,
    /// x = density, y = near-density.
    pub densities: Vec<Vec2>,

    // shadow arrays for the permutation passes and the viscosity snapshot
    pub(crate) sort_target_positions: Vec<Vec2>,
    pub(crate) sort_target_predicted: Vec<Vec2>,
    pub(crate) sort_target_velocities: Vec<Vec2>,
    pub(crate) sort_target_densities: Vec<Vec2>,
    pub(crate) scratch_velocities: Vec<Vec2>,
}

impl ParticleBuffers {
    pub fn from_spawn_data(data: &ParticleSpawnData) -> Self {
        let n = data.positions.len();
        let mut velocities = data.velocities.clone();
        velocities.resize(n, Vec2::ZERO);

        Self {
            positions: data.positions.clone(),
            predicted_positions: data.positions.clone(),
            velocities,
            densities: vec![Vec2::ZERO; n],
            sort_target_positions: vec![Vec2::ZERO; n],
            sort_target_predicted: vec![Vec2::ZERO; n],
            sort_target_velocities: vec![Vec2::ZERO; n],
            sort_target_densities: vec![Vec2::ZERO; n],
            scratch_velocities: vec![Vec2::ZERO; n],
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Permute position, predicted position, and velocity into sorted-slot
    /// order: slot `s` receives particle `sorted_indices[s]`. Densities are
    /// recomputed in sorted space right after, so they are not carried over.
    pub(crate) fn reorder(&mut self, sorted_indices: &[u32]) {
        permute_into(&self.positions, &mut self.sort_target_positions, sorted_indices);
        permute_into(
            &self.predicted_positions,
            &mut self.sort_target_predicted,
            sorted_indices,
        );
        permute_into(&self.velocities, &mut self.sort_target_velocities, sorted_indices);

        std::mem::swap(&mut self.positions, &mut self.sort_target_positions);
        std::mem::swap(&mut self.predicted_positions, &mut self.sort_target_predicted);
        std::mem::swap(&mut self.velocities, &mut self.sort_target_velocities);
    }

    /// Inverse of [`reorder`](Self::reorder): original index `i` receives
    /// the particle currently at slot `slot_of[i]`. Densities were produced
    /// in sorted space, so they come along to keep every externally
    /// readable array in positional correspondence.
    pub(crate) fn copyback(&mut self, slot_of: &[u32]) {
        permute_into(&self.positions, &mut self.sort_target_positions, slot_of);
        permute_into(&self.predicted_positions, &mut self.sort_target_predicted, slot_of);
        permute_into(&self.velocities, &mut self.sort_target_velocities, slot_of);
        permute_into(&self.densities, &mut self.sort_target_densities, slot_of);

        std::mem::swap(&mut self.positions, &mut self.sort_target_positions);
        std::mem::swap(&mut self.predicted_positions, &mut self.sort_target_predicted);
        std::mem::swap(&mut self.velocities, &mut self.sort_target_velocities);
        std::mem::swap(&mut self.densities, &mut self.sort_target_densities);
    }

    pub(crate) fn release(&mut self) {
        for buf in [
            &mut self.positions,
            &mut self.predicted_positions,
            &mut self.velocities,
            &mut self.densities,
            &mut self.sort_target_positions,
            &mut self.sort_target_predicted,
            &mut self.sort_target_velocities,
            &mut self.sort_target_densities,
            &mut self.scratch_velocities,
        ] {
            buf.clear();
            buf.shrink_to_fit();
        }
    }
}

fn permute_into(src: &[Vec2], dst: &mut [Vec2], map: &[u32]) {
    parallel::fill_indexed(dst, |i| src[map[i] as usize]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> ParticleBuffers {
        let data = ParticleSpawnData {
            positions: (0..n).map(|i| Vec2::splat(i as f32)).collect(),
            velocities: (0..n).map(|i| Vec2::new(i as f32, -(i as f32))).collect(),
        };
        ParticleBuffers::from_spawn_data(&data)
    }

    #[test]
    fn reorder_applies_permutation() {
        let mut bufs = numbered(4);
        let perm = [2u32, 0, 3, 1];
        bufs.reorder(&perm);
        assert_eq!(bufs.positions[0], Vec2::splat(2.0));
        assert_eq!(bufs.positions[1], Vec2::splat(0.0));
        assert_eq!(bufs.velocities[2], Vec2::new(3.0, -3.0));
    }

    #[test]
    fn copyback_inverts_reorder_bit_exactly() {
        let mut bufs = numbered(16);
        bufs.densities = (0..16).map(|i| Vec2::new(i as f32 * 0.5, 1.0)).collect();
        let before = bufs.clone();

        // sorted_indices: slot -> original; slot_of: original -> slot
        let sorted_indices: Vec<u32> = vec![5, 3, 11, 0, 7, 1, 15, 2, 9, 4, 13, 6, 10, 8, 14, 12];
        let mut slot_of = vec![0u32; 16];
        for (slot, &orig) in sorted_indices.iter().enumerate() {
            slot_of[orig as usize] = slot as u32;
        }

        bufs.reorder(&sorted_indices);
        // densities written while in sorted space travel back through copyback
        let sorted_densities: Vec<Vec2> = sorted_indices
            .iter()
            .map(|&orig| before.densities[orig as usize])
            .collect();
        bufs.densities = sorted_densities;
        bufs.copyback(&slot_of);

        assert_eq!(bufs.positions, before.positions);
        assert_eq!(bufs.predicted_positions, before.predicted_positions);
        assert_eq!(bufs.velocities, before.velocities);
        assert_eq!(bufs.densities, before.densities);
    }
}
