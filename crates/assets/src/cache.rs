use crate::AssetError;
use crate::loader::{MeshLoader, ObjLoader};
use crate::mesh::Mesh;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Source-keyed mesh cache.
///
/// Owns the authoritative `Rc<Mesh>` for every source that loaded
/// successfully. Entries live as long as the cache; there is no eviction.
pub struct MeshCache<L = ObjLoader> {
    loader: L,
    meshes: BTreeMap<String, Rc<Mesh>>,
}

impl MeshCache<ObjLoader> {
    pub fn new() -> Self {
        Self::with_loader(ObjLoader::new())
    }
}

impl Default for MeshCache<ObjLoader> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: MeshLoader> MeshCache<L> {
    pub fn with_loader(loader: L) -> Self {
        Self {
            loader,
            meshes: BTreeMap::new(),
        }
    }

    /// Return the mesh for `source`, loading it on first request.
    ///
    /// A failed load is logged and yields `None`; nothing is cached, so a
    /// later call retries the load.
    pub fn get_mesh(&mut self, source: &str) -> Option<Rc<Mesh>> {
        match self.try_get_mesh(source) {
            Ok(mesh) => Some(mesh),
            Err(e) => {
                tracing::warn!(source, "mesh load failed: {e}");
                None
            }
        }
    }

    /// Like [`get_mesh`](Self::get_mesh), but hands the load error back.
    pub fn try_get_mesh(&mut self, source: &str) -> Result<Rc<Mesh>, AssetError> {
        if let Some(mesh) = self.meshes.get(source) {
            tracing::debug!(source, "mesh cache hit");
            return Ok(Rc::clone(mesh));
        }

        let data = self.loader.load(source)?;
        let mesh = Rc::new(Mesh::new(source, data)?);
        self.meshes.insert(source.to_string(), Rc::clone(&mesh));
        Ok(mesh)
    }

    pub fn contains(&self, source: &str) -> bool {
        self.meshes.contains_key(source)
    }

    /// Number of cached meshes.
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Cached meshes in source order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rc<Mesh>)> {
        self.meshes.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{MeshData, Vertex};
    use std::cell::Cell;
    use std::io::Write;

    fn triangle() -> MeshData {
        MeshData {
            vertices: vec![
                Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0]),
                Vertex::new([1.0, 0.0, 0.0], [1.0, 0.0]),
                Vertex::new([0.0, 1.0, 0.0], [0.0, 1.0]),
            ],
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn repeated_requests_share_one_mesh() {
        let calls = Cell::new(0);
        let mut cache = MeshCache::with_loader(|_: &str| -> Result<MeshData, AssetError> {
            calls.set(calls.get() + 1);
            Ok(triangle())
        });

        let first = cache.get_mesh("cube.obj").unwrap();
        for _ in 0..5 {
            let again = cache.get_mesh("cube.obj").unwrap();
            assert!(Rc::ptr_eq(&first, &again));
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_keys_load_separately() {
        let calls = Cell::new(0);
        let mut cache = MeshCache::with_loader(|_: &str| -> Result<MeshData, AssetError> {
            calls.set(calls.get() + 1);
            Ok(triangle())
        });

        let a = cache.get_mesh("a.obj").unwrap();
        let b = cache.get_mesh("b.obj").unwrap();
        assert!(!Rc::ptr_eq(&a, &b));
        assert_ne!(a.id(), b.id());
        assert_eq!(calls.get(), 2);
        let sources: Vec<&str> = cache.iter().map(|(k, _)| k).collect();
        assert_eq!(sources, vec!["a.obj", "b.obj"]);
    }

    #[test]
    fn failed_load_is_not_cached() {
        let fail = Cell::new(true);
        let calls = Cell::new(0);
        let mut cache = MeshCache::with_loader(|source: &str| -> Result<MeshData, AssetError> {
            calls.set(calls.get() + 1);
            if fail.get() {
                Err(AssetError::MissingAttribute {
                    path: source.to_string(),
                    attribute: "texcoord",
                })
            } else {
                Ok(triangle())
            }
        });

        assert!(cache.get_mesh("broken.obj").is_none());
        assert!(!cache.contains("broken.obj"));
        assert!(cache.is_empty());

        fail.set(false);
        let mesh = cache.get_mesh("broken.obj");
        assert!(mesh.is_some());
        assert_eq!(calls.get(), 2);
        assert!(cache.contains("broken.obj"));
    }

    #[test]
    fn invalid_loader_output_is_not_cached() {
        let mut cache = MeshCache::with_loader(|_: &str| -> Result<MeshData, AssetError> {
            Ok(MeshData {
                vertices: vec![],
                indices: vec![0],
            })
        });
        let err = cache.try_get_mesh("dangling").unwrap_err();
        assert!(matches!(err, AssetError::IndexOutOfRange { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn fixing_file_on_disk_makes_retry_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mesh.obj");
        let key = path.to_str().unwrap().to_string();

        std::fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        let mut cache = MeshCache::new();
        assert!(cache.get_mesh(&key).is_none());

        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nf 1/1 2/2 3/3\n")
            .unwrap();
        drop(file);

        let mesh = cache.get_mesh(&key).unwrap();
        assert_eq!(mesh.vertices().len(), 3);
        assert_eq!(mesh.source(), key);
    }
}
