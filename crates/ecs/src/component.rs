use glam::{EulerRot, Mat4, Quat, Vec3};
use meshscene_assets::Mesh;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Render component: a shared reference to a cached mesh.
///
/// `mesh` is `None` when the cache lookup that produced it failed; the
/// renderer skips such entities.
#[derive(Debug, Clone, Default)]
pub struct RenderComponent {
    pub mesh: Option<Rc<Mesh>>,
}

impl RenderComponent {
    pub fn new(mesh: Rc<Mesh>) -> Self {
        Self { mesh: Some(mesh) }
    }
}

impl From<Option<Rc<Mesh>>> for RenderComponent {
    fn from(mesh: Option<Rc<Mesh>>) -> Self {
        Self { mesh }
    }
}

/// Spatial transform: position, Euler rotation (XYZ, radians), scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformComponent {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl TransformComponent {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Model matrix: translate * rotate * scale.
    pub fn model_matrix(&self) -> Mat4 {
        let r = self.rotation;
        Mat4::from_scale_rotation_translation(
            self.scale,
            Quat::from_euler(EulerRot::XYZ, r.x, r.y, r.z),
            self.position,
        )
    }
}

/// The closed set of component kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Render,
    Transform,
}

/// A component value of either kind.
#[derive(Debug, Clone)]
pub enum Component {
    Render(RenderComponent),
    Transform(TransformComponent),
}

impl Component {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::Render(_) => ComponentKind::Render,
            Component::Transform(_) => ComponentKind::Transform,
        }
    }
}

impl From<RenderComponent> for Component {
    fn from(c: RenderComponent) -> Self {
        Component::Render(c)
    }
}

impl From<TransformComponent> for Component {
    fn from(c: TransformComponent) -> Self {
        Component::Transform(c)
    }
}

/// Per-entity record: at most one component of each kind.
#[derive(Debug, Clone, Default)]
pub struct EntityRecord {
    pub render: Option<RenderComponent>,
    pub transform: Option<TransformComponent>,
}

impl EntityRecord {
    /// Store `component` in its slot, returning whatever it replaced.
    pub fn insert(&mut self, component: Component) -> Option<Component> {
        match component {
            Component::Render(c) => self.render.replace(c).map(Component::Render),
            Component::Transform(c) => self.transform.replace(c).map(Component::Transform),
        }
    }

    pub fn has(&self, kind: ComponentKind) -> bool {
        match kind {
            ComponentKind::Render => self.render.is_some(),
            ComponentKind::Transform => self.transform.is_some(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.render.is_none() && self.transform.is_none()
    }
}

/// Typed access to one slot of an [`EntityRecord`].
///
/// Lets registry queries be written as `has_component::<TransformComponent>(e)`.
pub trait ComponentSlot: Sized + Into<Component> {
    const KIND: ComponentKind;

    fn slot(record: &EntityRecord) -> &Option<Self>;

    fn slot_mut(record: &mut EntityRecord) -> &mut Option<Self>;
}

impl ComponentSlot for RenderComponent {
    const KIND: ComponentKind = ComponentKind::Render;

    fn slot(record: &EntityRecord) -> &Option<Self> {
        &record.render
    }

    fn slot_mut(record: &mut EntityRecord) -> &mut Option<Self> {
        &mut record.render
    }
}

impl ComponentSlot for TransformComponent {
    const KIND: ComponentKind = ComponentKind::Transform;

    fn slot(record: &EntityRecord) -> &Option<Self> {
        &record.transform
    }

    fn slot_mut(record: &mut EntityRecord) -> &mut Option<Self> {
        &mut record.transform
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_default_is_identity() {
        let t = TransformComponent::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Vec3::ZERO);
        assert_eq!(t.scale, Vec3::ONE);
        assert_eq!(t.model_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn model_matrix_applies_scale_then_translation() {
        let t = TransformComponent {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Vec3::ZERO,
            scale: Vec3::splat(2.0),
        };
        let p = t.model_matrix().transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert!((p - Vec3::new(3.0, 2.0, 3.0)).length() < 1e-6);
    }

    #[test]
    fn insert_replaces_same_kind_only() {
        let mut record = EntityRecord::default();
        assert!(record.is_empty());
        assert!(record.insert(TransformComponent::default().into()).is_none());
        assert!(record.insert(RenderComponent::default().into()).is_none());

        let moved = TransformComponent::from_position(Vec3::X);
        let old = record.insert(moved.into());
        assert!(matches!(old, Some(Component::Transform(_))));
        assert_eq!(record.transform, Some(moved));
        assert!(record.has(ComponentKind::Render));
    }

    #[test]
    fn component_kind_matches_slot() {
        let c: Component = RenderComponent::default().into();
        assert_eq!(c.kind(), RenderComponent::KIND);
        let c: Component = TransformComponent::default().into();
        assert_eq!(c.kind(), TransformComponent::KIND);
    }
}
