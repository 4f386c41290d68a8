use egui::Context as EguiContext;
use glam::Vec3;
use meshscene_assets::{MeshCache, MeshLoader, ObjLoader};
use meshscene_common::EntityId;
use meshscene_ecs::{ComponentKind, RenderComponent, TransformComponent, World};
use meshscene_render::FrameStats;

/// Everything the event loop owns apart from the GPU.
pub struct Scene<L = ObjLoader> {
    pub world: World,
    pub cache: MeshCache<L>,
    mesh_path: String,
    pub selected: Option<EntityId>,
    pub show_inspector: bool,
    pub spin: bool,
    pub last_stats: FrameStats,
}

impl Scene<ObjLoader> {
    pub fn new(mesh_path: &str) -> Self {
        Self::with_cache(MeshCache::new(), mesh_path)
    }
}

impl<L: MeshLoader> Scene<L> {
    /// Populate the world: a placed mesh, a transform-only entity, and a
    /// second placed copy sharing the cached mesh.
    pub fn with_cache(mut cache: MeshCache<L>, mesh_path: &str) -> Self {
        let mut world = World::new();

        let mesh = cache.get_mesh(mesh_path);
        let origin = world.spawn(RenderComponent::from(mesh));
        world.add_component(
            origin,
            TransformComponent {
                position: Vec3::new(-0.4, 0.0, 0.5),
                rotation: Vec3::new(0.5, 0.6, 0.0),
                scale: Vec3::splat(0.4),
            },
        );

        world.spawn(TransformComponent::from_position(Vec3::new(3.0, 0.0, 0.5)));

        // Same key: served from the cache, same `Rc`.
        let shared = cache.get_mesh(mesh_path);
        let copy = world.spawn(RenderComponent::from(shared));
        world.add_component(
            copy,
            TransformComponent {
                position: Vec3::new(0.5, 0.3, 0.5),
                rotation: Vec3::new(-0.3, 0.8, 0.0),
                scale: Vec3::splat(0.25),
            },
        );

        tracing::info!(
            entities = world.entity_count(),
            meshes = cache.len(),
            "scene populated"
        );

        Self {
            world,
            cache,
            mesh_path: mesh_path.to_string(),
            selected: None,
            show_inspector: true,
            spin: true,
            last_stats: FrameStats::default(),
        }
    }

    pub fn update(&mut self, dt: f32) {
        if !self.spin {
            return;
        }
        let entities: Vec<EntityId> = self.world.get_all_entities().iter().copied().collect();
        for entity in entities {
            if let Ok(record) = self.world.get_component_mut(entity) {
                if let Some(transform) = record.transform.as_mut() {
                    transform.rotation.y += dt * 0.8;
                }
            }
        }
    }

    /// Attach or detach a component slot from the inspector.
    pub fn set_slot(&mut self, entity: EntityId, kind: ComponentKind, present: bool) {
        match (kind, present) {
            (ComponentKind::Render, true) => {
                let mesh = self.cache.get_mesh(&self.mesh_path);
                self.world.add_component(entity, RenderComponent::from(mesh));
            }
            (ComponentKind::Transform, true) => {
                self.world.add_component(entity, TransformComponent::default());
            }
            (ComponentKind::Render, false) => {
                self.world.delete_component::<RenderComponent>(entity);
            }
            (ComponentKind::Transform, false) => {
                self.world.delete_component::<TransformComponent>(entity);
            }
        }
        tracing::debug!(%entity, ?kind, present, "component slot toggled");
    }

    fn spawn_at_origin(&mut self) -> EntityId {
        let mesh = self.cache.get_mesh(&self.mesh_path);
        let id = self.world.spawn(RenderComponent::from(mesh));
        self.world.add_component(
            id,
            TransformComponent {
                position: Vec3::new(0.0, 0.0, 0.5),
                scale: Vec3::splat(0.3),
                ..TransformComponent::default()
            },
        );
        tracing::info!(entity = %id, "spawned entity");
        id
    }

    pub fn draw_ui(&mut self, ctx: &EguiContext, uploaded_meshes: usize) {
        if !self.show_inspector {
            return;
        }

        egui::SidePanel::left("inspector")
            .default_width(280.0)
            .show(ctx, |ui| {
                ui.heading("meshscene");
                ui.separator();
                ui.label(format!("Entities: {}", self.world.entity_count()));
                ui.label(format!(
                    "Frame: drawn {}  skipped {}  uploaded {}",
                    self.last_stats.drawn, self.last_stats.skipped, self.last_stats.uploaded
                ));
                ui.label(format!("Meshes on GPU: {uploaded_meshes}"));
                ui.checkbox(&mut self.spin, "Spin");
                if ui.button("Spawn Entity").clicked() {
                    self.selected = Some(self.spawn_at_origin());
                }

                ui.separator();
                ui.heading("Mesh Cache");
                for (source, mesh) in self.cache.iter() {
                    let s = mesh.summary();
                    ui.label(format!(
                        "{source}: {} verts, {} tris",
                        s.vertex_count, s.triangle_count
                    ));
                }

                ui.separator();
                ui.heading("Entities");
                let ids: Vec<EntityId> = self.world.get_all_entities().iter().copied().collect();
                for id in &ids {
                    let mut kinds = Vec::new();
                    if self.world.has_component::<RenderComponent>(*id) {
                        kinds.push("render");
                    }
                    if self.world.has_component::<TransformComponent>(*id) {
                        kinds.push("transform");
                    }
                    let is_selected = self.selected == Some(*id);
                    let label = format!("{id} [{}]", kinds.join(", "));
                    if ui.selectable_label(is_selected, label).clicked() {
                        self.selected = Some(*id);
                    }
                }

                if let Some(id) = self.selected {
                    ui.separator();
                    ui.heading(format!("Inspector {id}"));
                    self.component_editor(ui, id);
                }

                ui.separator();
                ui.small("F1: Toggle Inspector | Space: Spin | Esc: Deselect");
            });
    }

    fn component_editor(&mut self, ui: &mut egui::Ui, id: EntityId) {
        for (kind, name) in [
            (ComponentKind::Render, "Render"),
            (ComponentKind::Transform, "Transform"),
        ] {
            let had = match kind {
                ComponentKind::Render => self.world.has_component::<RenderComponent>(id),
                ComponentKind::Transform => self.world.has_component::<TransformComponent>(id),
            };
            let mut has = had;
            ui.checkbox(&mut has, name);
            if has != had {
                self.set_slot(id, kind, has);
            }
        }

        let Ok(record) = self.world.get_component_mut(id) else {
            ui.label("no components");
            return;
        };
        if let Some(render) = &record.render {
            match &render.mesh {
                Some(mesh) => ui.label(format!("Mesh: {} ({})", mesh.source(), mesh.id())),
                None => ui.label("Mesh: none"),
            };
        }
        if let Some(transform) = record.transform.as_mut() {
            vec3_editor(ui, "Position:", &mut transform.position, 0.05);
            vec3_editor(ui, "Rotation:", &mut transform.rotation, 0.05);
            vec3_editor(ui, "Scale:", &mut transform.scale, 0.05);
        }
    }
}

fn vec3_editor(ui: &mut egui::Ui, label: &str, value: &mut Vec3, speed: f64) {
    ui.label(label);
    ui.horizontal(|ui| {
        ui.add(egui::DragValue::new(&mut value.x).prefix("X: ").speed(speed));
        ui.add(egui::DragValue::new(&mut value.y).prefix("Y: ").speed(speed));
        ui.add(egui::DragValue::new(&mut value.z).prefix("Z: ").speed(speed));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshscene_assets::{AssetError, MeshData, Vertex};
    use std::cell::Cell;
    use std::rc::Rc;

    fn quad_cache() -> MeshCache<impl MeshLoader> {
        MeshCache::with_loader(|_: &str| -> Result<MeshData, AssetError> {
            Ok(MeshData {
                vertices: vec![
                    Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0]),
                    Vertex::new([1.0, 0.0, 0.0], [1.0, 0.0]),
                    Vertex::new([1.0, 1.0, 0.0], [1.0, 1.0]),
                ],
                indices: vec![0, 1, 2],
            })
        })
    }

    #[test]
    fn scene_shares_one_cached_mesh() {
        let scene = Scene::with_cache(quad_cache(), "quad.obj");
        assert_eq!(scene.world.entity_count(), 3);
        assert_eq!(scene.cache.len(), 1);

        let a = scene.world.get_component(EntityId(0)).unwrap();
        let c = scene.world.get_component(EntityId(2)).unwrap();
        let (Some(a), Some(c)) = (&a.render, &c.render) else {
            panic!("render components missing");
        };
        assert!(Rc::ptr_eq(a.mesh.as_ref().unwrap(), c.mesh.as_ref().unwrap()));

        assert!(!scene.world.has_component::<RenderComponent>(EntityId(1)));
        assert!(scene.world.has_component::<TransformComponent>(EntityId(1)));
    }

    #[test]
    fn failed_mesh_load_leaves_null_mesh() {
        let calls = Cell::new(0);
        let cache = MeshCache::with_loader(|source: &str| -> Result<MeshData, AssetError> {
            calls.set(calls.get() + 1);
            Err(AssetError::MissingAttribute {
                path: source.to_string(),
                attribute: "texcoord",
            })
        });
        let scene = Scene::with_cache(cache, "broken.obj");
        let record = scene.world.get_component(EntityId(0)).unwrap();
        assert!(record.render.as_ref().unwrap().mesh.is_none());
        assert!(scene.cache.is_empty());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn toggling_slots_adds_and_removes() {
        let mut scene = Scene::with_cache(quad_cache(), "quad.obj");
        let id = EntityId(1);
        scene.set_slot(id, ComponentKind::Render, true);
        assert!(scene.world.has_component::<RenderComponent>(id));
        scene.set_slot(id, ComponentKind::Transform, false);
        assert!(!scene.world.has_component::<TransformComponent>(id));
        scene.set_slot(id, ComponentKind::Transform, true);
        assert_eq!(
            scene.world.get_component(id).unwrap().transform,
            Some(TransformComponent::default())
        );
    }

    #[test]
    fn scene_entities_carry_placed_transforms() {
        let scene = Scene::with_cache(quad_cache(), "quad.obj");
        for id in [EntityId(0), EntityId(2)] {
            let record = scene.world.get_component(id).unwrap();
            assert!(record.render.is_some());
            assert_ne!(record.transform, Some(TransformComponent::default()));
        }
    }

    #[test]
    fn toggling_unlisted_entity_records_without_listing() {
        let mut scene = Scene::with_cache(quad_cache(), "quad.obj");
        let stray = EntityId(40);
        scene.set_slot(stray, ComponentKind::Transform, true);
        assert!(scene.world.has_component::<TransformComponent>(stray));
        assert!(!scene.world.get_all_entities().contains(&stray));
        assert_eq!(scene.world.entity_count(), 3);
    }

    #[test]
    fn update_spins_only_when_enabled() {
        let mut scene = Scene::with_cache(quad_cache(), "quad.obj");
        let before = scene.world.get_component(EntityId(1)).unwrap().transform.unwrap();
        scene.spin = false;
        scene.update(1.0);
        assert_eq!(
            scene.world.get_component(EntityId(1)).unwrap().transform.unwrap(),
            before
        );
        scene.spin = true;
        scene.update(1.0);
        let after = scene.world.get_component(EntityId(1)).unwrap().transform.unwrap();
        assert!(after.rotation.y > before.rotation.y);
    }
}
