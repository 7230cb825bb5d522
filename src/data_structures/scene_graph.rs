//! Scene graph: a flat, passive container for everything that gets drawn.
//!
//! Geometry and material descriptors are stored once and referenced by id so
//! that entities with the same appearance (the two terrain tiles) share them.
//! Nothing is removed after start-up; the per-frame controllers only mutate
//! entity transforms and material load states.

use crate::data_structures::{
    instance::Instance,
    light::SceneLights,
    material::{MapKind, MapState, MaterialDescriptor},
    mesh::Geometry,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub name: String,
    pub instance: Instance,
    pub mesh: MeshId,
    pub material: MaterialId,
}

#[derive(Debug, Clone)]
pub struct SceneGraph {
    meshes: Vec<Geometry>,
    materials: Vec<MaterialDescriptor>,
    entities: Vec<Entity>,
    pub lights: SceneLights,
}

impl SceneGraph {
    pub fn new(lights: SceneLights) -> Self {
        Self {
            meshes: Vec::new(),
            materials: Vec::new(),
            entities: Vec::new(),
            lights,
        }
    }

    pub fn add_mesh(&mut self, geometry: Geometry) -> MeshId {
        self.meshes.push(geometry);
        MeshId(self.meshes.len() - 1)
    }

    pub fn add_material(&mut self, material: MaterialDescriptor) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn spawn(
        &mut self,
        name: impl Into<String>,
        mesh: MeshId,
        material: MaterialId,
        instance: Instance,
    ) -> EntityId {
        self.entities.push(Entity {
            name: name.into(),
            instance,
            mesh,
            material,
        });
        EntityId(self.entities.len() - 1)
    }

    pub fn meshes(&self) -> &[Geometry] {
        &self.meshes
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Geometry> {
        self.meshes.get(id.0)
    }

    pub fn materials(&self) -> &[MaterialDescriptor] {
        &self.materials
    }

    pub fn material(&self, id: MaterialId) -> Option<&MaterialDescriptor> {
        self.materials.get(id.0)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.0)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id.0)
    }

    /// Record the outcome of an asset load for one material slot.
    ///
    /// Returns `false` when the material does not exist.
    pub fn mark_map(&mut self, material: MaterialId, kind: MapKind, state: MapState) -> bool {
        match self.materials.get_mut(material.0) {
            Some(descriptor) => {
                descriptor.slot_mut(kind).state = state;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CorridorConfig, Rgb};

    fn scene() -> SceneGraph {
        SceneGraph::new(SceneLights::from(&CorridorConfig::default()))
    }

    #[test]
    fn entities_share_mesh_and_material() {
        let mut scene = scene();
        let mesh = scene.add_mesh(Geometry::plane(1.0, 2.0, 1, 1));
        let material = scene.add_material(MaterialDescriptor::flat("terrain", Rgb::WHITE));
        let a = scene.spawn("tile a", mesh, material, Instance::new());
        let b = scene.spawn("tile b", mesh, material, Instance::new());

        assert_ne!(a, b);
        assert_eq!(scene.meshes().len(), 1);
        assert_eq!(scene.entity(a).unwrap().mesh, scene.entity(b).unwrap().mesh);
        assert_eq!(
            scene.entity(a).unwrap().material,
            scene.entity(b).unwrap().material
        );
    }

    #[test]
    fn marking_a_map_updates_the_shared_descriptor() {
        let mut scene = scene();
        let material = scene.add_material(
            MaterialDescriptor::flat("terrain", Rgb::WHITE)
                .with_displacement_map(Some("d.png".to_string()), 0.4),
        );
        assert!(scene.mark_map(material, MapKind::Displacement, MapState::Failed));
        assert_eq!(
            scene.material(material).unwrap().displacement_map.state,
            MapState::Failed
        );
        assert!(!scene.mark_map(MaterialId(7), MapKind::Color, MapState::Loaded));
    }

    #[test]
    fn entity_transforms_are_mutable_in_place() {
        let mut scene = scene();
        let mesh = scene.add_mesh(Geometry::cone(0.04, 0.12, 8));
        let material = scene.add_material(MaterialDescriptor::flat("cone", Rgb::WHITE));
        let id = scene.spawn("obstacle", mesh, material, Instance::new());

        scene.entity_mut(id).unwrap().instance.position.z = 1.5;
        assert_eq!(scene.entity(id).unwrap().instance.position.z, 1.5);
        assert!(scene.entity(EntityId(3)).is_none());
    }
}
