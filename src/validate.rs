//! Structural checks run once after every section has been decoded.
//!
//! Checks run in a fixed order and the first failure aborts the parse:
//! collections are non-empty and consistently sized, names are non-empty,
//! parent indices are in range and acyclic, each mesh is claimed by at most one
//! node, and mesh geometry and weights agree on vertex and bone counts.
use crate::error::{EntityKind, ParseError, ParseResult};
use crate::hierarchy;
use crate::model::{
    Asset, Bone, Mesh, Node, RawAsset, RawWeights, SkinWeights,
    SEC_MESH_BONE_WEIGHT, SEC_MESH_VERT_BONE_WEIGHT,
};

/// Most bones a single mesh may be skinned to.
pub const MAX_MESH_BONES: usize = 64;

fn check_non_empty(kind: EntityKind, len: usize) -> ParseResult<()> {
    if len == 0 {
        return Err(ParseError::EmptyCollection(kind));
    }
    Ok(())
}

fn check_count(context: &str, expected: usize, actual: usize) -> ParseResult<()> {
    if expected != actual {
        return Err(ParseError::CountMismatch { context: context.to_owned(), expected, actual });
    }
    Ok(())
}

fn check_names(kind: EntityKind, names: &[String]) -> ParseResult<()> {
    match names.iter().position(|n| n.is_empty()) {
        Some(index) => Err(ParseError::EmptyName { kind, index }),
        None => Ok(()),
    }
}

fn convert_parents(kind: EntityKind, parents: &[i32]) -> ParseResult<Vec<Option<usize>>> {
    let n = parents.len();
    parents.iter().enumerate().map(|(i, &p)| {
        if p == -1 {
            return Ok(None);
        }
        match usize::try_from(p) {
            Ok(p) if p < n && p != i => Ok(Some(p)),
            _ => Err(ParseError::InvalidParentIndex { kind, index: i, parent: p }),
        }
    }).collect()
}

fn check_acyclic(kind: EntityKind, parents: &[Option<usize>]) -> ParseResult<()> {
    if hierarchy::detect_cycle(parents) {
        return Err(ParseError::CyclicHierarchy(kind));
    }
    Ok(())
}

/// Convert a stored index into `0 .. count`, or report which entity held it.
fn check_index(
    kind: EntityKind,
    index: usize,
    what: &'static str,
    value: i32,
    count: usize,
) -> ParseResult<usize> {
    match usize::try_from(value) {
        Ok(v) if v < count => Ok(v),
        _ => Err(ParseError::InvalidReference { kind, index, what, value: value.into(), count }),
    }
}

fn convert_node_meshes(node_meshes: &[i32], mesh_count: usize) -> ParseResult<Vec<Option<usize>>> {
    let mut owner = vec![None; mesh_count];
    let mut v = Vec::with_capacity(node_meshes.len());
    for (i, &m) in node_meshes.iter().enumerate() {
        if m == -1 {
            v.push(None);
            continue;
        }
        let m = check_index(EntityKind::Node, i, "mesh", m, mesh_count)?;
        if let Some(first) = owner[m] {
            return Err(ParseError::DuplicateMeshAssignment { mesh: m, first, second: i });
        }
        owner[m] = Some(i);
        v.push(Some(m));
    }
    Ok(v)
}

fn convert_verts(mesh: usize, floats: &[f32]) -> ParseResult<Vec<[f32; 3]>> {
    check_count(&format!("mesh {} vertex float count mod 3", mesh), 0, floats.len() % 3)?;
    Ok(floats.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect())
}

fn convert_tris(mesh: usize, indices: &[i32], vertex_count: usize) -> ParseResult<Vec<[u32; 3]>> {
    check_count(&format!("mesh {} index count mod 3", mesh), 0, indices.len() % 3)?;
    let mut tris = Vec::with_capacity(indices.len() / 3);
    for t in indices.chunks_exact(3) {
        let mut tri = [0; 3];
        for (out, &i) in tri.iter_mut().zip(t) {
            *out = check_index(EntityKind::Mesh, mesh, "triangle vertex", i, vertex_count)? as u32;
        }
        tris.push(tri);
    }
    Ok(tris)
}

fn convert_bone_counts(counts: &[i32], bone_total: usize) -> ParseResult<Vec<usize>> {
    let counts = counts.iter().map(|&c| {
        match usize::try_from(c) {
            Ok(c) if c <= MAX_MESH_BONES => Ok(c),
            _ => Err(ParseError::MalformedValue { value: c.into(), context: "mesh bone count" }),
        }
    }).collect::<ParseResult<Vec<_>>>()?;

    let owned = counts.iter().sum::<usize>();
    if owned > bone_total {
        return Err(ParseError::CountMismatch {
            context: "bones owned by meshes, at most".into(),
            expected: bone_total,
            actual: owned,
        });
    }
    Ok(counts)
}

fn check_weight(mesh: usize, weight: f32) -> ParseResult<f32> {
    if !weight.is_finite() || weight < 0. {
        return Err(ParseError::InvalidWeight { mesh, weight });
    }
    Ok(weight)
}

/// Convert raw `(index, weight)` pairs, checking each index against `count`.
fn convert_pairs(
    mesh: usize,
    what: &'static str,
    pairs: &[(i32, f32)],
    count: usize,
) -> ParseResult<Vec<(u32, f32)>> {
    pairs.iter()
        .map(|&(i, w)| {
            let i = check_index(EntityKind::Mesh, mesh, what, i, count)?;
            Ok((i as u32, check_weight(mesh, w)?))
        })
        .collect()
}

/// Split the flat weight chunk list into one `SkinWeights` per mesh.
fn convert_weights(
    raw: &RawWeights,
    bone_counts: &[usize],
    vertex_counts: &[usize],
) -> ParseResult<Vec<SkinWeights>> {
    let (chunks, per_mesh, section, what) = match raw {
        RawWeights::PerBone(chunks) => (chunks, bone_counts, SEC_MESH_BONE_WEIGHT, "weighted vertex"),
        RawWeights::PerVertex(chunks) => (chunks, vertex_counts, SEC_MESH_VERT_BONE_WEIGHT, "influencing bone"),
    };
    check_count(&format!("{} chunks", section), per_mesh.iter().sum(), chunks.len())?;

    let mut out = Vec::with_capacity(per_mesh.len());
    let mut start = 0;
    for (m, &n) in per_mesh.iter().enumerate() {
        let mesh_chunks = &chunks[start .. start + n];
        start += n;
        match raw {
            RawWeights::PerBone(_) => {
                let lists = mesh_chunks.iter()
                    .map(|c| convert_pairs(m, what, c, vertex_counts[m]))
                    .collect::<ParseResult<Vec<_>>>()?;
                out.push(SkinWeights::PerBone(lists));
            },
            RawWeights::PerVertex(_) => {
                let lists = mesh_chunks.iter()
                    .map(|c| convert_pairs(m, what, c, bone_counts[m]))
                    .collect::<ParseResult<Vec<_>>>()?;
                out.push(SkinWeights::PerVertex(lists));
            },
        }
    }
    Ok(out)
}

pub fn validate(raw: RawAsset) -> ParseResult<Asset> {
    let node_count = raw.node_names.len();
    let bone_count = raw.bone_names.len();
    let mesh_count = raw.mesh_names.len();

    check_non_empty(EntityKind::Node, node_count)?;
    check_non_empty(EntityKind::Bone, bone_count)?;
    check_non_empty(EntityKind::Mesh, mesh_count)?;

    check_count("NODEPARENT entries", node_count, raw.node_parents.len())?;
    check_count("NODEMATRIX entries", node_count, raw.node_matrices.len())?;
    check_count("NODEMESH entries", node_count, raw.node_meshes.len())?;
    check_count("BONEPARENT entries", bone_count, raw.bone_parents.len())?;
    check_count("BONEMATRIX entries", bone_count, raw.bone_matrices.len())?;
    check_count("MESHBONECOUNT entries", mesh_count, raw.mesh_bone_counts.len())?;
    check_count("MESHVERT chunks", mesh_count, raw.mesh_verts.len())?;
    check_count("MESHINDEX chunks", mesh_count, raw.mesh_indices.len())?;
    check_count("MESHROOTMATRIX entries", mesh_count, raw.mesh_root_matrices.len())?;

    check_names(EntityKind::Node, &raw.node_names)?;
    check_names(EntityKind::Bone, &raw.bone_names)?;
    check_names(EntityKind::Mesh, &raw.mesh_names)?;

    let node_parents = convert_parents(EntityKind::Node, &raw.node_parents)?;
    let bone_parents = convert_parents(EntityKind::Bone, &raw.bone_parents)?;
    check_acyclic(EntityKind::Node, &node_parents)?;
    check_acyclic(EntityKind::Bone, &bone_parents)?;

    let node_meshes = convert_node_meshes(&raw.node_meshes, mesh_count)?;

    let bone_counts = convert_bone_counts(&raw.mesh_bone_counts, bone_count)?;
    let verts = raw.mesh_verts.iter().enumerate()
        .map(|(m, v)| convert_verts(m, v))
        .collect::<ParseResult<Vec<_>>>()?;
    let vertex_counts = verts.iter().map(Vec::len).collect::<Vec<_>>();
    let weights = convert_weights(&raw.weights, &bone_counts, &vertex_counts)?;
    let tris = raw.mesh_indices.iter().enumerate()
        .map(|(m, idx)| convert_tris(m, idx, vertex_counts[m]))
        .collect::<ParseResult<Vec<_>>>()?;

    let nodes = raw.node_names.into_iter()
        .zip(node_parents)
        .zip(raw.node_matrices)
        .zip(node_meshes)
        .map(|(((name, parent), matrix), mesh)| Node { name, parent, matrix, mesh })
        .collect();

    let bones = raw.bone_names.into_iter()
        .zip(bone_parents)
        .zip(raw.bone_matrices)
        .map(|((name, parent), matrix)| Bone { name, parent, matrix })
        .collect();

    let mut meshes = Vec::with_capacity(mesh_count);
    let mut bone_base = 0;
    let parts = raw.mesh_names.into_iter()
        .zip(verts)
        .zip(tris)
        .zip(raw.mesh_root_matrices)
        .zip(weights)
        .zip(bone_counts);
    for (((((name, verts), tris), root_matrix), weights), bone_count) in parts {
        meshes.push(Mesh { name, verts, tris, root_matrix, bone_base, bone_count, weights });
        bone_base += bone_count;
    }

    Ok(Asset { nodes, bones, meshes })
}
