//! Geometry
//!
//! Meshes and room geometry handed in by the scanning collaborator, and the
//! virtual elements placed into the room by content collaborators.

use serde::{Deserialize, Serialize};

use crate::math::{Aabb, Vec3};

/// Identifier of a virtual or environment element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

impl ElementId {
    /// Get the raw ID value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Renderable element placed in the room
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VirtualElement {
    pub id: ElementId,
    /// World-space position in meters
    pub position: Vec3,
    /// Approximate extent in meters
    pub size: f32,
    /// Render priority in `[0, 1]`
    pub render_priority: f32,
}

impl VirtualElement {
    /// Create a new element
    pub fn new(id: ElementId, position: Vec3, size: f32, render_priority: f32) -> Self {
        Self {
            id,
            position,
            size,
            render_priority: render_priority.clamp(0.0, 1.0),
        }
    }

    /// Distance from a viewer position
    pub fn distance_to(&self, viewer: Vec3) -> f32 {
        self.position.distance(viewer)
    }
}

/// Triangle mesh as vertex positions plus index triples
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// Mesh name
    pub name: String,
    /// Vertex positions
    pub vertices: Vec<Vec3>,
    /// Triangle faces as vertex indices
    pub faces: Vec<[u32; 3]>,
}

impl Mesh {
    /// Create a mesh from vertices and faces
    pub fn new(name: impl Into<String>, vertices: Vec<Vec3>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            name: name.into(),
            vertices,
            faces,
        }
    }

    /// Axis-aligned box mesh spanning `bounds`, eight corners and twelve triangles
    pub fn cuboid(name: impl Into<String>, bounds: Aabb) -> Self {
        let (lo, hi) = (bounds.min, bounds.max);
        let vertices = vec![
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
        ];
        let faces = vec![
            [0, 1, 2], [0, 2, 3],
            [4, 6, 5], [4, 7, 6],
            [0, 4, 5], [0, 5, 1],
            [3, 2, 6], [3, 6, 7],
            [0, 3, 7], [0, 7, 4],
            [1, 5, 6], [1, 6, 2],
        ];
        Self::new(name, vertices, faces)
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Bounding box of all vertices, `Aabb::EMPTY` for an empty mesh
    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_points(&self.vertices)
    }
}

/// Scanned room, replaced wholesale whenever the scanner refines it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomGeometry {
    pub walls: Vec<Mesh>,
    pub floors: Vec<Mesh>,
    pub furniture: Vec<Mesh>,
    /// Bounds of the whole room
    pub bounding_box: Aabb,
}

impl RoomGeometry {
    /// Build room geometry, deriving the bounding box from every mesh
    pub fn new(walls: Vec<Mesh>, floors: Vec<Mesh>, furniture: Vec<Mesh>) -> Self {
        let bounding_box = walls
            .iter()
            .chain(floors.iter())
            .chain(furniture.iter())
            .map(Mesh::bounding_box)
            .fold(Aabb::EMPTY, |acc, b| acc.merge(&b));

        Self {
            walls,
            floors,
            furniture,
            bounding_box,
        }
    }

    /// Override the bounding box reported by the scanner
    pub fn with_bounding_box(mut self, bounding_box: Aabb) -> Self {
        self.bounding_box = bounding_box;
        self
    }

    /// Total number of meshes
    pub fn mesh_count(&self) -> usize {
        self.walls.len() + self.floors.len() + self.furniture.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_default() {
        let mesh = Mesh::default();
        assert_eq!(mesh.vertex_count(), 0);
        assert!(mesh.bounding_box().is_empty());
    }

    #[test]
    fn test_cuboid_bounds() {
        let bounds = Aabb::new(Vec3::new(1.0, 0.0, 1.0), Vec3::new(2.0, 1.0, 3.0));
        let mesh = Mesh::cuboid("table", bounds);
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.face_count(), 12);
        assert_eq!(mesh.bounding_box(), bounds);
    }

    #[test]
    fn test_room_bounds_cover_all_meshes() {
        let floor = Mesh::cuboid("floor", Aabb::new(Vec3::new(0.0, -0.1, 0.0), Vec3::new(5.0, 0.0, 5.0)));
        let wall = Mesh::cuboid("wall", Aabb::new(Vec3::ZERO, Vec3::new(5.0, 3.0, 0.1)));
        let sofa = Mesh::cuboid("sofa", Aabb::new(Vec3::new(1.0, 0.0, 1.0), Vec3::new(3.0, 1.0, 2.0)));

        let room = RoomGeometry::new(vec![wall], vec![floor], vec![sofa]);
        assert_eq!(room.mesh_count(), 3);
        assert_eq!(room.bounding_box.min, Vec3::new(0.0, -0.1, 0.0));
        assert_eq!(room.bounding_box.max, Vec3::new(5.0, 3.0, 5.0));
    }

    #[test]
    fn test_element_priority_clamped() {
        let element = VirtualElement::new(ElementId(1), Vec3::ZERO, 1.0, 4.0);
        assert_eq!(element.render_priority, 1.0);
        assert_eq!(element.distance_to(Vec3::new(3.0, 4.0, 0.0)), 5.0);
    }
}
