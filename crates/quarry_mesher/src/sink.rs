use std::sync::Arc;

use glam::Vec3;

use crate::buffers::MeshBuffers;

/// Render and collision representations must receive identical buffers.
pub trait MeshSink {
    fn apply(&mut self, mesh: &MeshBuffers);
    fn set_visible(&mut self, visible: bool);
    fn set_origin(&mut self, origin: Vec3);
    fn clear(&mut self);
}

impl<S: MeshSink + ?Sized> MeshSink for Box<S> {
    fn apply(&mut self, mesh: &MeshBuffers) {
        (**self).apply(mesh);
    }

    fn set_visible(&mut self, visible: bool) {
        (**self).set_visible(visible);
    }

    fn set_origin(&mut self, origin: Vec3) {
        (**self).set_origin(origin);
    }

    fn clear(&mut self) {
        (**self).clear();
    }
}

#[derive(Debug, Clone, Default)]
pub struct SharedMesh {
    mesh: Arc<MeshBuffers>,
    visible: bool,
    origin: Vec3,
    uploads: u64,
}

impl SharedMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&self) -> Arc<MeshBuffers> {
        Arc::clone(&self.mesh)
    }

    pub fn collision(&self) -> Arc<MeshBuffers> {
        Arc::clone(&self.mesh)
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn uploads(&self) -> u64 {
        self.uploads
    }
}

impl MeshSink for SharedMesh {
    fn apply(&mut self, mesh: &MeshBuffers) {
        match Arc::get_mut(&mut self.mesh) {
            Some(current) => current.clone_from(mesh),
            None => self.mesh = Arc::new(mesh.clone()),
        }
        self.uploads += 1;
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn set_origin(&mut self, origin: Vec3) {
        self.origin = origin;
    }

    fn clear(&mut self) {
        if let Some(mesh) = Arc::get_mut(&mut self.mesh) {
            mesh.clear();
        } else {
            self.mesh = Arc::new(MeshBuffers::default());
        }
    }
}
