//! Forward kinematics over node and bone forests.
//!
//! Matrices are column-major `nalgebra::Matrix4<f32>`, and a child's world
//! transform is `parent_world * local`.
use nalgebra::Matrix4;
use crate::error::{ParseError, ParseResult};
use crate::hierarchy;
use crate::model::{AssetModel, Mesh};

/// Compose local transforms down every tree of a forest.  Each root `r` starts
/// from `root_transforms[r]`, so its world matrix is `root_transforms[r] * locals[r]`.
///
/// # Panics
///
/// Panics if the slices differ in length, or if `children` doesn't reach every
/// entity exactly once from the roots of `parents`.  Both mean the forest was
/// built wrong, not that the input file is bad.
pub fn accumulate_world_transforms(
    locals: &[Matrix4<f32>],
    children: &[Vec<usize>],
    parents: &[Option<usize>],
    root_transforms: &[Matrix4<f32>],
) -> Vec<Matrix4<f32>> {
    let n = locals.len();
    assert!(
        children.len() == n && parents.len() == n && root_transforms.len() == n,
        "transform inputs disagree on entity count",
    );
    assert!(
        hierarchy::every_entity_reached_exactly_once(parents, children),
        "child lists don't cover the forest exactly once",
    );

    let mut world = vec![Matrix4::identity(); n];
    let mut stack = hierarchy::roots(parents)
        .map(|r| (r, root_transforms[r]))
        .collect::<Vec<_>>();
    while let Some((i, acc)) = stack.pop() {
        let w = acc * locals[i];
        world[i] = w;
        for &c in &children[i] {
            stack.push((c, w));
        }
    }
    world
}

#[derive(Clone, Debug, PartialEq)]
pub struct WorldTransforms {
    pub nodes: Vec<Matrix4<f32>>,
    pub bones: Vec<Matrix4<f32>>,
}

/// Seed for each bone's tree: the root matrix of the mesh owning the bone, or
/// identity for bones no mesh owns.
pub fn bone_root_transforms(model: &AssetModel) -> Vec<Matrix4<f32>> {
    let mut roots = vec![Matrix4::identity(); model.bones().len()];
    for m in model.meshes() {
        for b in m.bone_range() {
            roots[b] = m.root_matrix;
        }
    }
    roots
}

/// World matrices for every node (rooted at the origin) and every bone (rooted
/// at its mesh's root matrix), in the bind pose stored in the file.
pub fn compute_world_transforms(model: &AssetModel) -> WorldTransforms {
    let node_locals = model.nodes().iter().map(|n| n.matrix).collect::<Vec<_>>();
    let node_parents = model.nodes().iter().map(|n| n.parent).collect::<Vec<_>>();
    let node_roots = vec![Matrix4::identity(); node_locals.len()];

    let bone_locals = model.bones().iter().map(|b| b.matrix).collect::<Vec<_>>();
    let bone_parents = model.bones().iter().map(|b| b.parent).collect::<Vec<_>>();
    let bone_roots = bone_root_transforms(model);

    let h = model.hierarchy();
    WorldTransforms {
        nodes: accumulate_world_transforms(&node_locals, &h.node_children, &node_parents, &node_roots),
        bones: accumulate_world_transforms(&bone_locals, &h.bone_children, &bone_parents, &bone_roots),
    }
}

/// For each bone the mesh owns, the inverse of the bone's bind-pose world
/// matrix.  It takes a bind-pose vertex from the space the bone world matrices
/// live in (mesh root matrix applied, owning node's world matrix not) into that
/// bone's local space.  Entry `i` belongs to mesh-local bone `i`.
///
/// # Panics
///
/// Panics if `bone_world` doesn't cover the mesh's bone range.
pub fn compute_mesh_to_bone_transforms(
    mesh: &Mesh,
    bone_world: &[Matrix4<f32>],
) -> ParseResult<Vec<Matrix4<f32>>> {
    assert!(mesh.bone_range().end <= bone_world.len(), "bone world matrices don't cover mesh bones");
    mesh.bone_range()
        .map(|b| bone_world[b].try_inverse().ok_or(ParseError::SingularMatrix(b)))
        .collect()
}

/// Per-bone skinning matrices for a posed skeleton: a vertex goes into bone
/// space, then back out through the bone's current world transform.  In the
/// bind pose every matrix is the identity.
///
/// # Panics
///
/// Panics if `mesh_to_bone` doesn't have one entry per mesh bone, or if
/// `posed_bone_world` doesn't cover the mesh's bone range.
pub fn skinning_matrices(
    mesh: &Mesh,
    mesh_to_bone: &[Matrix4<f32>],
    posed_bone_world: &[Matrix4<f32>],
) -> Vec<Matrix4<f32>> {
    assert!(
        mesh_to_bone.len() == mesh.bone_count && mesh.bone_range().end <= posed_bone_world.len(),
        "skinning inputs disagree on bone count",
    );
    mesh.bone_range()
        .zip(mesh_to_bone)
        .map(|(b, inv)| posed_bone_world[b] * inv)
        .collect()
}
