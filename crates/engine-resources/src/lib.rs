//! Binary resource framing and a path-keyed, reference-counted cache on top
//! of it. Three concrete resource types live here: [`mesh::Mesh`],
//! [`material::Material`], and [`shader::Shader`].

pub mod cache;
pub mod framer;
pub mod material;
pub mod mesh;
pub mod primitives;
pub mod resource;
pub mod shader;

pub use cache::{ResourceCache, ResourceHandle};
pub use framer::{FileMode, Framer, LeScalar};
pub use material::{Material, MaterialParameters};
pub use mesh::{Mesh, Vertex};
pub use resource::{load_subresource, save_subresource, FileBacked};
pub use shader::{Shader, ShaderStage};
