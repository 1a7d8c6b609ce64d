//! Procedural mesh generators for built-in test/placeholder geometry.
//!
//! Grounded in `examples/original_source/source/module/graphics/private/
//! primitives.cpp`'s `primitives::cube`: eight corner points combined with
//! six face directions and four shared UV corners into 24 vertices (4 per
//! face, no shared vertices across faces so each can carry its own normal),
//! wound as two triangles per face.

use crate::mesh::{Mesh, Vertex};

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// An axis-aligned cube centered on the origin with the given half-extent.
pub fn cube(radius: f32) -> Mesh {
    let points = [
        [-radius, -radius, -radius], // 0 bottom left back
        [-radius, -radius, radius],  // 1 bottom left front
        [radius, -radius, radius],   // 2 bottom right front
        [radius, -radius, -radius],  // 3 bottom right back
        [-radius, radius, -radius],  // 4 top left back
        [-radius, radius, radius],   // 5 top left front
        [radius, radius, radius],    // 6 top right front
        [radius, radius, -radius],   // 7 top right back
    ];
    let directions = [
        [1.0, 0.0, 0.0],  // 0 right
        [-1.0, 0.0, 0.0], // 1 left
        [0.0, 1.0, 0.0],  // 2 up
        [0.0, -1.0, 0.0], // 3 down
        [0.0, 0.0, 1.0],  // 4 forward
        [0.0, 0.0, -1.0], // 5 back
    ];
    let uvs = [
        [0.0, 0.0], // 0 bottom left
        [0.0, 1.0], // 1 bottom right
        [1.0, 0.0], // 2 top left
        [1.0, 1.0], // 3 top right
    ];

    let face = |a: usize, b: usize, c: usize, d: usize, dir: usize| {
        [
            Vertex::new(points[a], directions[dir], WHITE, uvs[1]),
            Vertex::new(points[b], directions[dir], WHITE, uvs[0]),
            Vertex::new(points[c], directions[dir], WHITE, uvs[3]),
            Vertex::new(points[d], directions[dir], WHITE, uvs[2]),
        ]
    };

    let mut vertices = Vec::with_capacity(24);
    vertices.extend(face(0, 1, 4, 5, 1)); // left
    vertices.extend(face(0, 3, 4, 7, 5)); // back
    vertices.extend(face(4, 7, 5, 6, 2)); // top
    vertices.extend(face(1, 2, 5, 6, 4)); // front
    vertices.extend(face(3, 2, 7, 6, 0)); // right
    vertices.extend(face(3, 1, 2, 0, 3)); // bottom

    let mut indices = Vec::with_capacity(36);
    for face_index in 0..6u32 {
        let base = face_index * 4;
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 1, base + 3, base + 2]);
    }

    Mesh::new(vertices, indices)
}

/// A flat quad on the XZ plane, normal pointing up, with the given
/// half-extent.
pub fn plane(radius: f32) -> Mesh {
    let normal = [0.0, 1.0, 0.0];
    let vertices = vec![
        Vertex::new([-radius, 0.0, -radius], normal, WHITE, [0.0, 0.0]),
        Vertex::new([radius, 0.0, -radius], normal, WHITE, [1.0, 0.0]),
        Vertex::new([-radius, 0.0, radius], normal, WHITE, [0.0, 1.0]),
        Vertex::new([radius, 0.0, radius], normal, WHITE, [1.0, 1.0]),
    ];
    let indices = vec![0, 1, 2, 1, 3, 2];
    Mesh::new(vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_24_vertices_and_36_indices() {
        let mesh = cube(0.5);
        assert_eq!(mesh.vertices().len(), 24);
        assert_eq!(mesh.indices().len(), 36);
        assert!(mesh.indices().iter().all(|&i| (i as usize) < 24));
    }

    #[test]
    fn plane_has_4_vertices_and_6_indices() {
        let mesh = plane(1.0);
        assert_eq!(mesh.vertices().len(), 4);
        assert_eq!(mesh.indices().len(), 6);
    }
}
