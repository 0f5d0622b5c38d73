//! Mesh data structures, primitive generation and glTF import.

use crate::vertex::Vertex;
use glam::{Mat3, Mat4, Vec3};
use std::path::Path;
use wgpu::util::DeviceExt;

#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("failed to import glTF: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("mesh {mesh:?} has a primitive without positions")]
    MissingPositions { mesh: Option<String> },
    #[error("{0} contains no triangle geometry")]
    Empty(String),
}

/// A GPU mesh with vertex and index buffers.
pub struct Mesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_indices: u32,
}

impl Mesh {
    /// Create a mesh from vertex and index data.
    pub fn new(device: &wgpu::Device, vertices: &[Vertex], indices: &[u32]) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            num_indices: indices.len() as u32,
        }
    }

    /// Free the GPU buffers now instead of waiting for the last reference to drop.
    pub fn destroy(&self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
    }
}

/// CPU-side mesh data, uploaded through [`MeshData::upload`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn upload(&self, device: &wgpu::Device) -> Mesh {
        Mesh::new(device, &self.vertices, &self.indices)
    }

    /// Axis-aligned box centered at the origin.
    pub fn cuboid(half_extents: Vec3) -> Self {
        // (normal, u, v) with u × v = normal so every face winds counter-clockwise.
        const FACES: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];

        let mut data = Self::new();
        for (normal, u, v) in FACES {
            let base = data.vertices.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let corner = (normal + u * su + v * sv) * half_extents;
                data.vertices.push(Vertex::new(corner.to_array(), normal.to_array()));
            }
            data.indices
                .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }
        data
    }

    /// Flat square on the XZ plane facing +Y.
    pub fn plane(size: f32) -> Self {
        let h = size * 0.5;
        let up = [0.0, 1.0, 0.0];
        Self {
            vertices: vec![
                Vertex::new([-h, 0.0, h], up),
                Vertex::new([h, 0.0, h], up),
                Vertex::new([h, 0.0, -h], up),
                Vertex::new([-h, 0.0, -h], up),
            ],
            indices: vec![0, 1, 2, 2, 3, 0],
        }
    }

    /// Capsule along Y: two hemispheres of `radius` whose centers sit
    /// `half_height` above and below the origin, joined by a cylinder.
    pub fn capsule(radius: f32, half_height: f32, segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(1);
        let half_pi = std::f32::consts::FRAC_PI_2;

        // Upper hemisphere rows, then lower; the gap between the two
        // equator rows is the cylinder wall.
        let rows: Vec<(f32, f32)> = (0..=rings)
            .map(|r| (half_pi * r as f32 / rings as f32, half_height))
            .chain((0..=rings).map(|r| (half_pi + half_pi * r as f32 / rings as f32, -half_height)))
            .collect();

        let mut data = Self::new();
        for &(phi, offset) in &rows {
            for s in 0..=segments {
                let theta = std::f32::consts::TAU * s as f32 / segments as f32;
                let normal = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
                let position = normal * radius + Vec3::Y * offset;
                data.vertices
                    .push(Vertex::new(position.to_array(), normal.to_array()));
            }
        }

        let stride = segments + 1;
        for row in 0..rows.len() as u32 - 1 {
            for s in 0..segments {
                let current = row * stride + s;
                let next = current + stride;
                data.indices
                    .extend_from_slice(&[current, current + 1, next, current + 1, next + 1, next]);
            }
        }
        data
    }

    pub fn sphere(radius: f32, segments: u32, rings: u32) -> Self {
        Self::capsule(radius, 0.0, segments, (rings / 2).max(1))
    }

    /// Tint every vertex.
    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        for vertex in &mut self.vertices {
            vertex.color = color;
        }
        self
    }

    /// Load every triangle primitive of every mesh in the default scene,
    /// baking node transforms and base color factors into one mesh.
    pub fn from_gltf(path: impl AsRef<Path>) -> Result<Self, MeshError> {
        let path = path.as_ref();
        let (document, buffers, _images) = gltf::import(path)?;

        let mut data = Self::new();
        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next());
        if let Some(scene) = scene {
            for node in scene.nodes() {
                data.append_gltf_node(&node, Mat4::IDENTITY, &buffers)?;
            }
        }

        if data.is_empty() {
            return Err(MeshError::Empty(path.display().to_string()));
        }
        log::debug!(
            "Loaded {}: {} vertices, {} triangles",
            path.display(),
            data.vertices.len(),
            data.indices.len() / 3
        );
        Ok(data)
    }

    fn append_gltf_node(
        &mut self,
        node: &gltf::Node,
        parent: Mat4,
        buffers: &[gltf::buffer::Data],
    ) -> Result<(), MeshError> {
        let transform = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
        let normal_matrix = Mat3::from_mat4(transform).inverse().transpose();

        if let Some(mesh) = node.mesh() {
            for primitive in mesh.primitives() {
                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    continue;
                }
                let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));
                let positions: Vec<Vec3> = reader
                    .read_positions()
                    .ok_or_else(|| MeshError::MissingPositions {
                        mesh: mesh.name().map(str::to_owned),
                    })?
                    .map(Vec3::from)
                    .collect();
                let indices: Vec<u32> = match reader.read_indices() {
                    Some(indices) => indices.into_u32().collect(),
                    None => (0..positions.len() as u32).collect(),
                };
                let normals: Vec<Vec3> = match reader.read_normals() {
                    Some(normals) => normals.map(Vec3::from).collect(),
                    None => smooth_normals(&positions, &indices),
                };
                let color = primitive.material().pbr_metallic_roughness().base_color_factor();

                let base = self.vertices.len() as u32;
                for (position, normal) in positions.iter().zip(normals.iter()) {
                    let p = transform.transform_point3(*position);
                    let n = (normal_matrix * *normal).normalize_or_zero();
                    self.vertices
                        .push(Vertex::with_color(p.to_array(), n.to_array(), color));
                }
                self.indices.extend(indices.iter().map(|i| base + i));
            }
        }

        for child in node.children() {
            self.append_gltf_node(&child, transform, buffers)?;
        }
        Ok(())
    }
}

/// Area-weighted vertex normals for geometry that ships without them.
fn smooth_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    normals
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_normal(data: &MeshData, tri: &[u32]) -> Vec3 {
        let p = |i: u32| Vec3::from(data.vertices[i as usize].position);
        (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]))
    }

    #[test]
    fn cuboid_spans_half_extents_and_faces_outward() {
        let half = Vec3::new(1.0, 2.0, 3.0);
        let data = MeshData::cuboid(half);
        assert_eq!(data.vertices.len(), 24);
        assert_eq!(data.indices.len(), 36);
        for v in &data.vertices {
            let p = Vec3::from(v.position);
            assert!((p.abs() - half).abs().max_element() < 1e-6);
        }
        for tri in data.indices.chunks_exact(3) {
            let n = triangle_normal(&data, tri);
            let stored = Vec3::from(data.vertices[tri[0] as usize].normal);
            assert!(n.dot(stored) > 0.0, "face winds inward");
        }
    }

    #[test]
    fn capsule_height_and_winding() {
        let data = MeshData::capsule(1.0, 1.0, 16, 8);
        let max_y = data.vertices.iter().map(|v| v.position[1]).fold(f32::MIN, f32::max);
        let min_y = data.vertices.iter().map(|v| v.position[1]).fold(f32::MAX, f32::min);
        assert!((max_y - 2.0).abs() < 1e-5);
        assert!((min_y + 2.0).abs() < 1e-5);

        for tri in data.indices.chunks_exact(3) {
            let n = triangle_normal(&data, tri);
            if n.length_squared() < 1e-12 {
                continue; // collapsed at the poles
            }
            let centroid = tri
                .iter()
                .map(|&i| Vec3::from(data.vertices[i as usize].position))
                .sum::<Vec3>()
                / 3.0;
            let axis = Vec3::new(0.0, centroid.y.clamp(-1.0, 1.0), 0.0);
            assert!(n.dot(centroid - axis) > 0.0);
        }
    }

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let data = MeshData::sphere(2.5, 12, 8);
        for v in &data.vertices {
            assert!((Vec3::from(v.position).length() - 2.5).abs() < 1e-4);
        }
    }

    #[test]
    fn plane_faces_up() {
        let data = MeshData::plane(4.0);
        assert!(triangle_normal(&data, &data.indices[0..3]).y > 0.0);
        assert!(triangle_normal(&data, &data.indices[3..6]).y > 0.0);
    }

    #[test]
    fn missing_gltf_is_an_error() {
        assert!(matches!(
            MeshData::from_gltf("does/not/exist.glb"),
            Err(MeshError::Gltf(_))
        ));
    }

    /// One triangle under a translated parent and a scaled child, with an
    /// embedded buffer holding three positions and u16 indices.
    const NESTED_TRIANGLE_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [
            { "translation": [1.0, 2.0, 3.0], "children": [1] },
            { "scale": [2.0, 2.0, 2.0], "mesh": 0 }
        ],
        "meshes": [{
            "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }]
        }],
        "materials": [{
            "pbrMetallicRoughness": { "baseColorFactor": [0.5, 0.25, 1.0, 1.0] }
        }],
        "buffers": [{
            "byteLength": 44,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAABAAIAAAA="
        }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
        ],
        "accessors": [
            {
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
            },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ]
    }"#;

    #[test]
    fn gltf_bakes_node_transforms_and_base_color() {
        let path = std::env::temp_dir().join(format!("chromalock-nested-{}.gltf", std::process::id()));
        std::fs::write(&path, NESTED_TRIANGLE_GLTF).unwrap();
        let data = MeshData::from_gltf(&path);
        let _ = std::fs::remove_file(&path);
        let data = data.unwrap();

        let positions: Vec<[f32; 3]> = data.vertices.iter().map(|v| v.position).collect();
        assert_eq!(positions, vec![[1.0, 2.0, 3.0], [3.0, 2.0, 3.0], [1.0, 4.0, 3.0]]);
        assert_eq!(data.indices, vec![0, 1, 2]);
        for v in &data.vertices {
            assert_eq!(v.color, [0.5, 0.25, 1.0, 1.0]);
            assert!(v.normal[2] > 0.99, "normal should face +Z, got {:?}", v.normal);
        }
    }

    #[test]
    fn smooth_normals_point_away_from_winding() {
        let positions = [Vec3::ZERO, Vec3::X, Vec3::Z];
        let normals = smooth_normals(&positions, &[0, 2, 1]);
        assert!(normals.iter().all(|n| n.y > 0.99));
    }
}
