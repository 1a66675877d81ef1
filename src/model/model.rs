//! The normalized scene model: node arena, shared meshes, materials.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]; a node only
//! stores child ids, and children are created exclusively through their
//! parent, so the tree is acyclic by construction.

use glam::DMat4;

use super::material::Material;
use super::mesh::Mesh;
use super::property::PropertyGroup;
use crate::geom::Transformation;
use crate::util::BBox3;

/// Index of a node in the model's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// Index of a mesh in the model's mesh table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub usize);

/// Index of a mesh instance in the model's instance table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshInstanceId(pub usize);

/// One placement of a shared mesh in the scene.
#[derive(Clone, Debug)]
pub struct MeshInstance {
    pub mesh: MeshId,
    /// Node owning this instance.
    pub node: NodeId,
    /// World transform composed from the node chain; filled at finalize.
    pub world_transform: Option<DMat4>,
}

/// A scene-graph node.
#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub transform: Transformation,
    children: Vec<NodeId>,
    instances: Vec<MeshInstanceId>,
    pub property_groups: Vec<PropertyGroup>,
}

impl Node {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transformation::IDENTITY,
            children: Vec::new(),
            instances: Vec::new(),
            property_groups: Vec::new(),
        }
    }

    /// Child node ids in order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Mesh instance ids attached to this node, in order.
    pub fn mesh_instances(&self) -> &[MeshInstanceId] {
        &self.instances
    }
}

/// The normalized model every decoder writes into and every encoder reads
/// from.
#[derive(Clone, Debug)]
pub struct Model {
    nodes: Vec<Node>,
    meshes: Vec<Mesh>,
    materials: Vec<Material>,
    instances: Vec<MeshInstance>,
    pub property_groups: Vec<PropertyGroup>,
    /// Cached at finalize; invalidated by any geometry mutation.
    pub(crate) cached_bounds: Option<BBox3>,
}

impl Model {
    /// Create a model holding only an unnamed root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new("")],
            meshes: Vec::new(),
            materials: Vec::new(),
            instances: Vec::new(),
            property_groups: Vec::new(),
            cached_bounds: None,
        }
    }

    /// Id of the root node.
    pub fn root_id(&self) -> NodeId {
        NodeId(0)
    }

    /// Borrow a node.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Borrow a node mutably.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Create a child under `parent` and link it immediately.
    pub fn add_child_node(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(name));
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Add a mesh to the shared mesh table.
    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.cached_bounds = None;
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    /// All meshes.
    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    /// Borrow a mesh.
    pub fn mesh(&self, id: MeshId) -> &Mesh {
        &self.meshes[id.0]
    }

    /// Borrow a mesh mutably.
    pub fn mesh_mut(&mut self, id: MeshId) -> &mut Mesh {
        self.cached_bounds = None;
        &mut self.meshes[id.0]
    }

    /// Add a material to the table.
    pub fn add_material(&mut self, material: Material) -> u32 {
        self.materials.push(material);
        (self.materials.len() - 1) as u32
    }

    /// Find a material by structural equality.
    pub fn find_material(&self, material: &Material) -> Option<u32> {
        self.materials.iter().position(|m| m == material).map(|i| i as u32)
    }

    /// All materials.
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Borrow a material.
    pub fn material(&self, index: u32) -> &Material {
        &self.materials[index as usize]
    }

    /// Instance a mesh on a node.
    pub fn add_mesh_instance(&mut self, node: NodeId, mesh: MeshId) -> MeshInstanceId {
        let id = MeshInstanceId(self.instances.len());
        self.instances.push(MeshInstance { mesh, node, world_transform: None });
        self.nodes[node.0].instances.push(id);
        id
    }

    /// Convenience: add a mesh and instance it on the root node.
    pub fn add_mesh_to_root(&mut self, mesh: Mesh) -> MeshId {
        let id = self.add_mesh(mesh);
        self.add_mesh_instance(self.root_id(), id);
        id
    }

    /// All mesh instances.
    pub fn instances(&self) -> &[MeshInstance] {
        &self.instances
    }

    /// Borrow an instance.
    pub fn instance(&self, id: MeshInstanceId) -> &MeshInstance {
        &self.instances[id.0]
    }

    /// True when no instance references a non-empty mesh.
    pub fn is_empty(&self) -> bool {
        !self
            .instances
            .iter()
            .any(|i| !self.meshes[i.mesh.0].is_empty())
    }

    /// Cached bounding box, present after finalize.
    pub fn bounding_box(&self) -> Option<&BBox3> {
        self.cached_bounds.as_ref()
    }

    /// Walk the node tree depth-first, accumulating world transforms, and
    /// store the result on every instance.
    pub(crate) fn compute_world_transforms(&mut self) {
        let mut stack = vec![(self.root_id(), DMat4::IDENTITY)];
        while let Some((id, parent_world)) = stack.pop() {
            let world = parent_world * self.nodes[id.0].transform.matrix();
            let instance_ids: Vec<MeshInstanceId> = self.nodes[id.0].instances.clone();
            for inst in instance_ids {
                self.instances[inst.0].world_transform = Some(world);
            }
            for &child in self.nodes[id.0].children.iter().rev() {
                stack.push((child, world));
            }
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}
