//! CPU-side scene graph: meshes, nodes that place them, and the queues of
//! GPU work the renderer drains each frame.

use crate::{mesh::MeshData, vertex::InstanceData};
use engine_core::Transform;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("unknown mesh {0:?}")]
    UnknownMesh(MeshId),
}

/// A placed, tinted instance of a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub mesh: MeshId,
    pub transform: Transform,
    pub color: [f32; 4],
    pub visible: bool,
}

#[derive(Debug)]
struct MeshEntry {
    /// Nodes currently drawing this mesh.
    users: usize,
    /// Shared meshes outlive their nodes.
    shared: bool,
}

#[derive(Debug, Default)]
pub struct Scene {
    meshes: HashMap<MeshId, MeshEntry>,
    nodes: BTreeMap<NodeId, SceneNode>,
    pending_uploads: Vec<(MeshId, MeshData)>,
    pending_releases: Vec<MeshId>,
    next_mesh: u32,
    next_node: u32,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mesh owned by its nodes: it is released once the last
    /// node using it is removed.
    pub fn add_mesh(&mut self, data: MeshData) -> MeshId {
        self.insert_mesh(data, false)
    }

    /// Register a mesh meant to be reused; removing nodes never releases it.
    pub fn add_shared_mesh(&mut self, data: MeshData) -> MeshId {
        self.insert_mesh(data, true)
    }

    fn insert_mesh(&mut self, data: MeshData, shared: bool) -> MeshId {
        let id = MeshId(self.next_mesh);
        self.next_mesh += 1;
        self.meshes.insert(id, MeshEntry { users: 0, shared });
        self.pending_uploads.push((id, data));
        id
    }

    pub fn add_node(
        &mut self,
        mesh: MeshId,
        transform: Transform,
        color: [f32; 4],
    ) -> Result<NodeId, SceneError> {
        let entry = self.meshes.get_mut(&mesh).ok_or(SceneError::UnknownMesh(mesh))?;
        entry.users += 1;

        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(
            id,
            SceneNode {
                mesh,
                transform,
                color,
                visible: true,
            },
        );
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn set_transform(&mut self, id: NodeId, transform: Transform) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.transform = transform;
                true
            }
            None => false,
        }
    }

    pub fn set_color(&mut self, id: NodeId, color: [f32; 4]) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.color = color;
                true
            }
            None => false,
        }
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Remove a node. Returns `false` if it was already gone.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.remove(&id) else {
            return false;
        };

        let release = match self.meshes.get_mut(&node.mesh) {
            Some(entry) => {
                entry.users = entry.users.saturating_sub(1);
                entry.users == 0 && !entry.shared
            }
            None => false,
        };
        if release {
            self.release_mesh(node.mesh);
        }
        true
    }

    fn release_mesh(&mut self, mesh: MeshId) {
        self.meshes.remove(&mesh);
        // Never reached the GPU: just drop the pending upload.
        let before = self.pending_uploads.len();
        self.pending_uploads.retain(|(id, _)| *id != mesh);
        if self.pending_uploads.len() == before {
            self.pending_releases.push(mesh);
        }
        log::debug!("Released mesh {mesh:?}");
    }

    /// Meshes registered since the last call, to be uploaded.
    pub fn take_uploads(&mut self) -> Vec<(MeshId, MeshData)> {
        std::mem::take(&mut self.pending_uploads)
    }

    /// Meshes whose GPU buffers should be destroyed.
    pub fn take_releases(&mut self) -> Vec<MeshId> {
        std::mem::take(&mut self.pending_releases)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Visible nodes grouped into one instance list per mesh, ordered by mesh.
    pub fn instances(&self) -> Vec<(MeshId, Vec<InstanceData>)> {
        let mut batches: BTreeMap<MeshId, Vec<InstanceData>> = BTreeMap::new();
        for node in self.nodes.values().filter(|n| n.visible) {
            batches
                .entry(node.mesh)
                .or_default()
                .push(InstanceData::new(node.transform.to_matrix().to_cols_array_2d(), node.color));
        }
        batches.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    const WHITE: [f32; 4] = [1.0; 4];

    fn cube() -> MeshData {
        MeshData::cuboid(Vec3::splat(0.5))
    }

    #[test]
    fn owned_mesh_is_released_with_its_last_node() {
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(cube());
        assert_eq!(scene.take_uploads().len(), 1);

        let a = scene.add_node(mesh, Transform::default(), WHITE).unwrap();
        let b = scene.add_node(mesh, Transform::default(), WHITE).unwrap();
        assert!(scene.remove_node(a));
        assert!(scene.take_releases().is_empty());
        assert!(scene.remove_node(b));
        assert_eq!(scene.take_releases(), vec![mesh]);
        assert_eq!(scene.mesh_count(), 0);
    }

    #[test]
    fn remove_node_is_idempotent() {
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(cube());
        scene.take_uploads();
        let node = scene.add_node(mesh, Transform::default(), WHITE).unwrap();
        assert!(scene.remove_node(node));
        assert!(!scene.remove_node(node));
        assert_eq!(scene.take_releases(), vec![mesh]);
    }

    #[test]
    fn shared_mesh_survives_node_removal() {
        let mut scene = Scene::new();
        let mesh = scene.add_shared_mesh(cube());
        let node = scene.add_node(mesh, Transform::default(), WHITE).unwrap();
        scene.remove_node(node);
        assert!(scene.take_releases().is_empty());
        assert!(scene.add_node(mesh, Transform::default(), WHITE).is_ok());
    }

    #[test]
    fn mesh_released_before_upload_never_reaches_gpu() {
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(cube());
        let node = scene.add_node(mesh, Transform::default(), WHITE).unwrap();
        scene.remove_node(node);
        assert!(scene.take_uploads().is_empty());
        assert!(scene.take_releases().is_empty());
    }

    #[test]
    fn unknown_mesh_is_rejected() {
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(cube());
        let node = scene.add_node(mesh, Transform::default(), WHITE).unwrap();
        scene.remove_node(node);
        assert_eq!(
            scene.add_node(mesh, Transform::default(), WHITE),
            Err(SceneError::UnknownMesh(mesh))
        );
    }

    #[test]
    fn instances_skip_hidden_nodes_and_group_by_mesh() {
        let mut scene = Scene::new();
        let cube_mesh = scene.add_mesh(cube());
        let ball = scene.add_mesh(MeshData::sphere(1.0, 8, 8));
        scene.add_node(cube_mesh, Transform::from_position(Vec3::X), WHITE).unwrap();
        let hidden = scene.add_node(cube_mesh, Transform::default(), WHITE).unwrap();
        scene.add_node(ball, Transform::default(), [1.0, 0.0, 0.0, 1.0]).unwrap();
        scene.set_visible(hidden, false);

        let batches = scene.instances();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].0, cube_mesh);
        assert_eq!(batches[0].1.len(), 1);
        assert_eq!(batches[0].1[0].model[3], [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(batches[1].1[0].color, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn set_transform_on_missing_node_reports_false() {
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(cube());
        let node = scene.add_node(mesh, Transform::default(), WHITE).unwrap();
        assert!(scene.set_transform(node, Transform::from_position(Vec3::Y)));
        assert_eq!(scene.node(node).unwrap().transform.position, Vec3::Y);
        scene.remove_node(node);
        assert!(!scene.set_transform(node, Transform::default()));
    }
}
