//! The mesh resource: a vertex/index buffer pair plus a per-field version
//! counter collectors use to decide whether the GPU copy is stale.
//!
//! Vertex layout (`position`, `normal`, `color`, `uv`) is grounded in
//! `examples/original_source/source/module/graphics/public/primitives.hpp`'s
//! `mesh::vertex` constructor order.

use bytemuck::{Pod, Zeroable};

use engine_common::{EngineResult, VersionId};

use crate::framer::Framer;
use crate::resource::FileBacked;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], color: [f32; 4], uv: [f32; 2]) -> Self {
        Self { position, normal, color, uv }
    }
}

#[derive(Debug, Default)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    version: VersionId,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            version: VersionId::zero(),
        }
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn version(&self) -> VersionId {
        self.version
    }

    /// Replace the geometry in place, bumping the version so collectors
    /// know to re-upload.
    pub fn set_geometry(&mut self, vertices: Vec<Vertex>, indices: Vec<u32>) {
        self.vertices = vertices;
        self.indices = indices;
        self.version.bump();
    }
}

impl FileBacked for Mesh {
    fn write_data(&self, framer: &mut Framer) -> EngineResult<()> {
        framer.write_var(self.vertices.len() as u32)?;
        for v in &self.vertices {
            for c in v.position.iter().chain(v.normal.iter()).chain(v.color.iter()).chain(v.uv.iter()) {
                framer.write_var(*c)?;
            }
        }
        framer.write_buffer(&self.indices)?;
        Ok(())
    }

    fn read_data(&mut self, framer: &mut Framer) -> EngineResult<()> {
        let vertex_count = framer.read_var::<u32>()? as usize;
        let mut vertices = Vec::with_capacity(vertex_count);
        for _ in 0..vertex_count {
            let mut floats = [0f32; 12];
            for slot in floats.iter_mut() {
                *slot = framer.read_var()?;
            }
            vertices.push(Vertex::new(
                [floats[0], floats[1], floats[2]],
                [floats[3], floats[4], floats[5]],
                [floats[6], floats[7], floats[8], floats[9]],
                [floats[10], floats[11]],
            ));
        }
        self.indices = framer.read_buffer()?;
        self.vertices = vertices;
        self.version.bump();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framer::FileMode;

    #[test]
    fn mesh_round_trips_through_a_file() {
        let path = std::env::temp_dir()
            .join(format!("engine-resources-mesh-{}", std::process::id()))
            .to_string_lossy()
            .into_owned();

        let original = Mesh::new(
            vec![
                Vertex::new([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 1.0, 1.0], [0.0, 0.0]),
                Vertex::new([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 1.0, 1.0], [1.0, 0.0]),
            ],
            vec![0, 1],
        );

        {
            let mut w = Framer::open(&path, FileMode::Write);
            original.write_data(&mut w).unwrap();
        }

        let mut loaded = Mesh::default();
        {
            let mut r = Framer::open(&path, FileMode::Read);
            loaded.read_data(&mut r).unwrap();
        }

        assert_eq!(loaded.vertices(), original.vertices());
        assert_eq!(loaded.indices(), original.indices());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn set_geometry_bumps_version() {
        let mut mesh = Mesh::default();
        let v0 = mesh.version();
        mesh.set_geometry(vec![], vec![]);
        assert!(mesh.version() > v0);
    }
}
