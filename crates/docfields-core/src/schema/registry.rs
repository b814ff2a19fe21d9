//! Schema registry with read-copy-on-reload semantics.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use super::DocumentSchema;
use crate::error::SchemaError;

type SchemaMap = BTreeMap<String, Arc<DocumentSchema>>;

/// Registry of document schemas keyed by document type.
///
/// Readers take a snapshot (`Arc`) of the current map; a reload builds a new
/// map and swaps it in, so a snapshot never changes under its holder.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: RwLock<Arc<SchemaMap>>,
    source_dir: Option<PathBuf>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from in-memory schemas.
    pub fn from_schemas(schemas: impl IntoIterator<Item = DocumentSchema>) -> Self {
        let map: SchemaMap = schemas
            .into_iter()
            .map(|s| (s.doc_type.clone(), Arc::new(s)))
            .collect();
        Self {
            schemas: RwLock::new(Arc::new(map)),
            source_dir: None,
        }
    }

    /// Load every `*.json` schema document in `dir`.
    ///
    /// Any invalid document fails the whole load.
    pub fn load_dir(dir: &Path) -> Result<Self, SchemaError> {
        let map = read_dir(dir)?;
        info!("Loaded {} schema(s) from {}", map.len(), dir.display());
        Ok(Self {
            schemas: RwLock::new(Arc::new(map)),
            source_dir: Some(dir.to_path_buf()),
        })
    }

    /// Re-read the source directory and replace the map wholesale.
    ///
    /// On failure the current map stays in place.
    pub fn reload(&self) -> Result<usize, SchemaError> {
        let Some(dir) = &self.source_dir else {
            debug!("Registry has no source directory; nothing to reload");
            return Ok(self.len());
        };
        let map = read_dir(dir)?;
        let count = map.len();
        self.swap(map);
        info!("Reloaded {count} schema(s) from {}", dir.display());
        Ok(count)
    }

    /// Register or replace one schema (copy-on-write under the write lock).
    pub fn insert(&self, schema: DocumentSchema) {
        let mut guard = match self.schemas.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut map = (**guard).clone();
        map.insert(schema.doc_type.clone(), Arc::new(schema));
        *guard = Arc::new(map);
    }

    /// Look up the schema for a document type.
    pub fn get(&self, doc_type: &str) -> Result<Arc<DocumentSchema>, SchemaError> {
        self.snapshot()
            .get(doc_type)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownDocumentType(doc_type.to_string()))
    }

    pub fn contains(&self, doc_type: &str) -> bool {
        self.snapshot().contains_key(doc_type)
    }

    /// Registered document types, sorted.
    pub fn doc_types(&self) -> Vec<String> {
        self.snapshot().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The current map; stays valid across reloads.
    pub fn snapshot(&self) -> Arc<SchemaMap> {
        match self.schemas.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    fn swap(&self, map: SchemaMap) {
        let map = Arc::new(map);
        match self.schemas.write() {
            Ok(mut guard) => *guard = map,
            Err(poisoned) => *poisoned.into_inner() = map,
        }
    }
}

fn read_dir(dir: &Path) -> Result<SchemaMap, SchemaError> {
    let io_error = |source| SchemaError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(io_error)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut map = SchemaMap::new();
    for path in paths {
        let schema = DocumentSchema::from_file(&path)?;
        debug!(
            "Schema {} ({} fields) from {}",
            schema.doc_type,
            schema.fields().len(),
            path.display()
        );
        map.insert(schema.doc_type.clone(), Arc::new(schema));
    }
    Ok(map)
}
