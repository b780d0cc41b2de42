//! Per-vertex bone influences in the fixed-width layout a skinning shader
//! expects: exactly `MAX_INFLUENCES` `(bone, weight)` slots per vertex.
use log::warn;
use crate::model::{Mesh, SkinWeights};

pub const MAX_INFLUENCES: usize = 4;
/// Weight sums at or below this are treated as zero and left unnormalized.
pub const WEIGHT_EPSILON: f32 = 0.001;

/// Two parallel arrays of `MAX_INFLUENCES * vertex_count` entries.  Slots
/// `4 * v .. 4 * v + 4` belong to vertex `v`, heaviest first.  Bone indices
/// are mesh-local.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VertexInfluences {
    pub bone_indices: Vec<u32>,
    pub weights: Vec<f32>,
}

impl VertexInfluences {
    pub fn vertex_count(&self) -> usize {
        self.bone_indices.len() / MAX_INFLUENCES
    }

    /// The `(bone, weight)` slots of vertex `v`.
    pub fn vertex(&self, v: usize) -> impl Iterator<Item = (u32, f32)> + '_ {
        let r = v * MAX_INFLUENCES .. (v + 1) * MAX_INFLUENCES;
        self.bone_indices[r.clone()].iter().copied().zip(self.weights[r].iter().copied())
    }

    fn push(&mut self, slots: &[(u32, f32); MAX_INFLUENCES]) {
        for &(b, w) in slots {
            self.bone_indices.push(b);
            self.weights.push(w);
        }
    }
}

/// Keep the `MAX_INFLUENCES` heaviest candidates, heaviest first.  Equal
/// weights go in ascending bone order.  Unused slots are `(0, 0.0)`.
pub fn select_top_influences(candidates: &[(u32, f32)]) -> [(u32, f32); MAX_INFLUENCES] {
    let mut sorted = candidates.to_owned();
    sorted.sort_by(|&(ba, wa), &(bb, wb)| wb.total_cmp(&wa).then(ba.cmp(&bb)));

    let mut out = [(0, 0.); MAX_INFLUENCES];
    for (slot, &c) in out.iter_mut().zip(&sorted) {
        *slot = c;
    }
    out
}

/// Scale the weights to sum to 1, unless they are all (nearly) zero.
pub fn normalize_influences(slots: &mut [(u32, f32); MAX_INFLUENCES]) {
    let sum = slots.iter().map(|&(_, w)| w).sum::<f32>();
    if sum > WEIGHT_EPSILON {
        for (_, w) in slots.iter_mut() {
            *w /= sum;
        }
    }
}

/// Turn per-bone `(vertex, weight)` lists into per-vertex `(bone, weight)`
/// lists.  Within each vertex, candidates appear in bone order.
pub fn gather_per_bone(per_bone: &[Vec<(u32, f32)>], vertex_count: usize) -> Vec<Vec<(u32, f32)>> {
    let mut per_vertex = vec![Vec::new(); vertex_count];
    for (b, list) in per_bone.iter().enumerate() {
        for &(v, w) in list {
            per_vertex[v as usize].push((b as u32, w));
        }
    }
    per_vertex
}

fn resolve(mesh: &Mesh, per_vertex: &[Vec<(u32, f32)>], normalize: bool) -> VertexInfluences {
    let mut out = VertexInfluences {
        bone_indices: Vec::with_capacity(per_vertex.len() * MAX_INFLUENCES),
        weights: Vec::with_capacity(per_vertex.len() * MAX_INFLUENCES),
    };
    let mut truncated = 0;
    for candidates in per_vertex {
        if candidates.len() > MAX_INFLUENCES {
            truncated += 1;
        }
        let mut slots = select_top_influences(candidates);
        if normalize {
            normalize_influences(&mut slots);
        }
        out.push(&slots);
    }
    if truncated > 0 {
        warn!(
            "mesh {:?}: {} vertices have more than {} influences; dropped the lightest",
            mesh.name, truncated, MAX_INFLUENCES,
        );
    }
    out
}

/// Resolve a mesh's stored weights into fixed-width influences.
///
/// Per-bone weights are only selected, since the exporter writes them already
/// normalized.  Per-vertex weights are selected and then normalized.
///
/// # Panics
///
/// Panics if a stored vertex index is out of range for the mesh.  Meshes built
/// by `parse_asset` have been checked.
pub fn resolve_vertex_influences(mesh: &Mesh) -> VertexInfluences {
    match mesh.weights {
        SkinWeights::PerBone(ref per_bone) => {
            let per_vertex = gather_per_bone(per_bone, mesh.vertex_count());
            resolve(mesh, &per_vertex, false)
        },
        SkinWeights::PerVertex(ref per_vertex) => resolve(mesh, per_vertex, true),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix4;

    fn mesh(vertex_count: usize, bone_count: usize, weights: SkinWeights) -> Mesh {
        Mesh {
            name: "Cube".into(),
            verts: vec![[0.; 3]; vertex_count],
            tris: Vec::new(),
            root_matrix: Matrix4::identity(),
            bone_base: 0,
            bone_count,
            weights,
        }
    }

    fn assert_weights(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-4, "{:?} != {:?}", actual, expected);
        }
    }

    #[test]
    fn keeps_top_four_and_normalizes() {
        let m = mesh(1, 5, SkinWeights::PerVertex(vec![
            vec![(4, 0.05), (1, 0.3), (0, 0.6), (3, 0.1), (2, 0.2)],
        ]));
        let inf = resolve_vertex_influences(&m);
        assert_eq!(inf.bone_indices, vec![0, 1, 2, 3]);
        assert_weights(&inf.weights, &[0.5, 0.25, 0.2 / 1.2, 0.1 / 1.2]);
        assert!((inf.weights.iter().sum::<f32>() - 1.).abs() < 1e-5);
    }

    #[test]
    fn zero_weights_stay_zero() {
        let m = mesh(2, 2, SkinWeights::PerVertex(vec![
            vec![(0, 0.), (1, 0.)],
            vec![],
        ]));
        let inf = resolve_vertex_influences(&m);
        assert_eq!(inf.vertex_count(), 2);
        assert!(inf.weights.iter().all(|&w| w == 0.));
        assert!(inf.weights.iter().all(|w| !w.is_nan()));
    }

    #[test]
    fn ties_go_to_the_lower_bone() {
        let slots = select_top_influences(&[(7, 0.25), (2, 0.25), (5, 0.5), (3, 0.25), (1, 0.25)]);
        assert_eq!(slots, [(5, 0.5), (1, 0.25), (2, 0.25), (3, 0.25)]);
    }

    #[test]
    fn short_lists_are_padded() {
        let slots = select_top_influences(&[(3, 0.4)]);
        assert_eq!(slots, [(3, 0.4), (0, 0.), (0, 0.), (0, 0.)]);
        assert_eq!(select_top_influences(&[]), [(0, 0.); MAX_INFLUENCES]);
    }

    #[test]
    fn tiny_sums_are_not_divided() {
        let mut slots = [(0, 0.0004), (1, 0.0004), (0, 0.), (0, 0.)];
        normalize_influences(&mut slots);
        assert_eq!(slots, [(0, 0.0004), (1, 0.0004), (0, 0.), (0, 0.)]);
    }

    #[test]
    fn per_bone_lists_are_gathered_by_vertex() {
        // Bone 0 weights vertices 0 and 2; bone 1 weights vertices 1 and 2.
        let per_bone = vec![
            vec![(0, 1.), (2, 0.25)],
            vec![(1, 1.), (2, 0.75)],
        ];
        assert_eq!(
            gather_per_bone(&per_bone, 3),
            vec![vec![(0, 1.)], vec![(1, 1.)], vec![(0, 0.25), (1, 0.75)]],
        );

        let inf = resolve_vertex_influences(&mesh(3, 2, SkinWeights::PerBone(per_bone)));
        assert_eq!(inf.vertex(2).collect::<Vec<_>>(), vec![(1, 0.75), (0, 0.25), (0, 0.), (0, 0.)]);
        assert_eq!(inf.vertex(0).next(), Some((0, 1.)));
    }

    #[test]
    fn per_bone_weights_are_not_normalized() {
        let m = mesh(1, 2, SkinWeights::PerBone(vec![vec![(0, 0.2)], vec![(0, 0.2)]]));
        let inf = resolve_vertex_influences(&m);
        assert_weights(&inf.weights, &[0.2, 0.2, 0., 0.]);
    }
}
