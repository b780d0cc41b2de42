pub mod error;
pub mod cursor;
pub mod read_from;
pub mod section;

pub mod hierarchy;
pub mod model;
pub mod skin;
pub mod transform;
pub mod validate;

pub use crate::error::{EntityKind, ParseError, ParseResult};
pub use crate::model::{parse_asset, Asset, AssetModel, Bone, Mesh, Node, SkinWeights};
pub use crate::skin::{resolve_vertex_influences, VertexInfluences};
pub use crate::transform::{compute_mesh_to_bone_transforms, compute_world_transforms, WorldTransforms};
