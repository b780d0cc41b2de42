use log::{debug, info, warn};
use nalgebra::Matrix4;
use crate::cursor::Cursor;
use crate::error::{ParseError, ParseResult};
use crate::hierarchy;
use crate::read_from::{self, ReadFrom};
use crate::section::{self, Section};
use crate::validate;


pub const SEC_NODE_NAME: &str = "NODENAME";
pub const SEC_NODE_PARENT: &str = "NODEPARENT";
pub const SEC_NODE_MATRIX: &str = "NODEMATRIX";
pub const SEC_NODE_MESH: &str = "NODEMESH";
pub const SEC_BONE_NAME: &str = "BONENAME";
pub const SEC_BONE_PARENT: &str = "BONEPARENT";
pub const SEC_BONE_MATRIX: &str = "BONEMATRIX";
pub const SEC_MESH_NAME: &str = "MESHNAME";
pub const SEC_MESH_BONE_COUNT: &str = "MESHBONECOUNT";
pub const SEC_MESH_VERT: &str = "MESHVERT";
pub const SEC_MESH_INDEX: &str = "MESHINDEX";
pub const SEC_MESH_ROOT_MATRIX: &str = "MESHROOTMATRIX";
/// Per-mesh, per-bone `(vertex, weight)` lists.
pub const SEC_MESH_BONE_WEIGHT: &str = "MESHBONEWEIGHT";
/// Per-vertex `(bone, weight)` lists.
pub const SEC_MESH_VERT_BONE_WEIGHT: &str = "MESHVERTBONEWEIGHT";

const KNOWN_SECTIONS: &[&str] = &[
    SEC_NODE_NAME, SEC_NODE_PARENT, SEC_NODE_MATRIX, SEC_NODE_MESH,
    SEC_BONE_NAME, SEC_BONE_PARENT, SEC_BONE_MATRIX,
    SEC_MESH_NAME, SEC_MESH_BONE_COUNT, SEC_MESH_VERT, SEC_MESH_INDEX, SEC_MESH_ROOT_MATRIX,
    SEC_MESH_BONE_WEIGHT, SEC_MESH_VERT_BONE_WEIGHT,
];


#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub name: String,
    pub parent: Option<usize>,
    /// Transform relative to the parent node.
    pub matrix: Matrix4<f32>,
    pub mesh: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bone {
    pub name: String,
    pub parent: Option<usize>,
    /// Transform relative to the parent bone.
    pub matrix: Matrix4<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub verts: Vec<[f32; 3]>,
    pub tris: Vec<[u32; 3]>,
    pub root_matrix: Matrix4<f32>,
    /// Index of this mesh's first bone in the asset's bone array.  The mesh owns
    /// bones `bone_base .. bone_base + bone_count`, and bone indices in its
    /// weights are relative to `bone_base`.
    pub bone_base: usize,
    pub bone_count: usize,
    pub weights: SkinWeights,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.verts.len()
    }

    pub fn bone_range(&self) -> std::ops::Range<usize> {
        self.bone_base .. self.bone_base + self.bone_count
    }
}

/// Bone influences as stored in the file.  The two layouts come from the two
/// weight sections the exporter can produce.
#[derive(Clone, Debug, PartialEq)]
pub enum SkinWeights {
    /// One list per mesh bone of `(vertex, weight)` pairs.
    PerBone(Vec<Vec<(u32, f32)>>),
    /// One list per vertex of `(mesh bone, weight)` pairs.
    PerVertex(Vec<Vec<(u32, f32)>>),
}

/// The validated contents of an asset file.
#[derive(Clone, Debug, PartialEq)]
pub struct Asset {
    pub nodes: Vec<Node>,
    pub bones: Vec<Bone>,
    pub meshes: Vec<Mesh>,
}

/// Fields derived from an `Asset` after validation.
#[derive(Clone, Debug, PartialEq)]
pub struct Hierarchy {
    pub node_children: Vec<Vec<usize>>,
    pub bone_children: Vec<Vec<usize>>,
}

impl Hierarchy {
    pub fn build(asset: &Asset) -> Hierarchy {
        let node_parents = asset.nodes.iter().map(|n| n.parent).collect::<Vec<_>>();
        let bone_parents = asset.bones.iter().map(|b| b.parent).collect::<Vec<_>>();
        Hierarchy {
            node_children: hierarchy::build_child_lists(&node_parents),
            bone_children: hierarchy::build_child_lists(&bone_parents),
        }
    }
}

/// A parsed asset together with its derived hierarchy.  Built once by
/// `parse_asset`; there's no way to mutate it afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetModel {
    asset: Asset,
    hierarchy: Hierarchy,
}

impl AssetModel {
    /// Attach derived fields to an asset that has already passed validation.
    pub(crate) fn from_validated(asset: Asset) -> AssetModel {
        let hierarchy = Hierarchy::build(&asset);
        AssetModel { asset, hierarchy }
    }

    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn nodes(&self) -> &[Node] {
        &self.asset.nodes
    }

    pub fn bones(&self) -> &[Bone] {
        &self.asset.bones
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.asset.meshes
    }

    pub fn node_children(&self, node: usize) -> &[usize] {
        &self.hierarchy.node_children[node]
    }

    pub fn bone_children(&self, bone: usize) -> &[usize] {
        &self.hierarchy.bone_children[bone]
    }

    pub fn node_roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.asset.nodes.iter().enumerate().filter(|(_, n)| n.parent.is_none()).map(|(i, _)| i)
    }

    pub fn bone_roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.asset.bones.iter().enumerate().filter(|(_, b)| b.parent.is_none()).map(|(i, _)| i)
    }

    /// The node that owns `mesh`, if any.
    pub fn mesh_owner(&self, mesh: usize) -> Option<usize> {
        self.asset.nodes.iter().position(|n| n.mesh == Some(mesh))
    }
}


/// Section contents after decoding but before any structural checks.  Integers
/// are kept exactly as stored so that validation can report the bad value.
#[derive(Clone, Debug, Default)]
pub struct RawAsset {
    pub node_names: Vec<String>,
    pub node_parents: Vec<i32>,
    pub node_matrices: Vec<Matrix4<f32>>,
    pub node_meshes: Vec<i32>,

    pub bone_names: Vec<String>,
    pub bone_parents: Vec<i32>,
    pub bone_matrices: Vec<Matrix4<f32>>,

    pub mesh_names: Vec<String>,
    pub mesh_bone_counts: Vec<i32>,
    pub mesh_verts: Vec<Vec<f32>>,
    pub mesh_indices: Vec<Vec<i32>>,
    pub mesh_root_matrices: Vec<Matrix4<f32>>,
    pub weights: RawWeights,
}

/// Weight chunks in file order.
#[derive(Clone, Debug, PartialEq)]
pub enum RawWeights {
    /// `sum(mesh_bone_counts)` chunks, grouped by mesh.
    PerBone(Vec<Vec<(i32, f32)>>),
    /// One chunk per vertex, grouped by mesh.
    PerVertex(Vec<Vec<(i32, f32)>>),
}

impl Default for RawWeights {
    fn default() -> RawWeights {
        RawWeights::PerBone(Vec::new())
    }
}

fn read_field<'a, T: ReadFrom<'a>>(sections: &[Section<'a>], name: &'static str) -> ParseResult<Vec<T>> {
    let data = section::require_section(sections, name)?;
    let v = read_from::read_array(data, name)?;
    debug!("{}: {} items", name, v.len());
    Ok(v)
}

fn read_chunked_field<'a, T: ReadFrom<'a>>(
    sections: &[Section<'a>],
    name: &'static str,
) -> ParseResult<Vec<Vec<T>>> {
    let data = section::require_section(sections, name)?;
    let v = read_from::read_chunked(data, name)?;
    debug!("{}: {} chunks", name, v.len());
    Ok(v)
}

impl RawAsset {
    /// Decode every schema field from its named section.
    pub fn from_sections(sections: &[Section]) -> ParseResult<RawAsset> {
        for s in sections {
            if !KNOWN_SECTIONS.iter().any(|k| k.as_bytes() == s.name) {
                warn!(
                    "ignoring unknown section {:?} ({} bytes)",
                    String::from_utf8_lossy(s.name), s.data.len(),
                );
            }
        }

        let weights = if section::find_section(sections, SEC_MESH_BONE_WEIGHT).is_some() {
            RawWeights::PerBone(read_chunked_field(sections, SEC_MESH_BONE_WEIGHT)?)
        } else if section::find_section(sections, SEC_MESH_VERT_BONE_WEIGHT).is_some() {
            RawWeights::PerVertex(read_chunked_field(sections, SEC_MESH_VERT_BONE_WEIGHT)?)
        } else {
            return Err(ParseError::RequiredSectionMissing(SEC_MESH_BONE_WEIGHT));
        };

        Ok(RawAsset {
            node_names: read_field(sections, SEC_NODE_NAME)?,
            node_parents: read_field(sections, SEC_NODE_PARENT)?,
            node_matrices: read_field(sections, SEC_NODE_MATRIX)?,
            node_meshes: read_field(sections, SEC_NODE_MESH)?,

            bone_names: read_field(sections, SEC_BONE_NAME)?,
            bone_parents: read_field(sections, SEC_BONE_PARENT)?,
            bone_matrices: read_field(sections, SEC_BONE_MATRIX)?,

            mesh_names: read_field(sections, SEC_MESH_NAME)?,
            mesh_bone_counts: read_field(sections, SEC_MESH_BONE_COUNT)?,
            mesh_verts: read_chunked_field(sections, SEC_MESH_VERT)?,
            mesh_indices: read_chunked_field(sections, SEC_MESH_INDEX)?,
            mesh_root_matrices: read_field(sections, SEC_MESH_ROOT_MATRIX)?,
            weights,
        })
    }
}


/// Parse and validate a complete asset file held in memory.
pub fn parse_asset(buf: &[u8]) -> ParseResult<AssetModel> {
    let mut c = Cursor::new(buf);
    let sections = section::read_all_sections(&mut c)?;
    let raw = RawAsset::from_sections(&sections)?;
    let model = AssetModel::from_validated(validate::validate(raw)?);
    let asset = model.asset();

    info!(
        "parsed asset: {} nodes, {} bones, {} meshes, {} verts",
        asset.nodes.len(),
        asset.bones.len(),
        asset.meshes.len(),
        asset.meshes.iter().map(Mesh::vertex_count).sum::<usize>(),
    );

    Ok(model)
}
