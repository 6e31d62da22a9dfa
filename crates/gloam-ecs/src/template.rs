//! Named entity templates.
//!
//! An [`EntityFactory`] turns a template name into a fresh [`ComponentSet`].
//! [`TemplateLibrary`] is the JSON-backed implementation: each template is a
//! JSON object in the [`ComponentSet`] shape, e.g.
//!
//! ```json
//! {
//!   "physics": { "bounds": { "offset": { "x": 4, "y": 20 }, "size": { "x": 24, "y": 12 } } },
//!   "sprite":  { "texture": "lantern", "animated": true,
//!                "animator": { "frame_count": 4, "frame_duration": 0.15 } },
//!   "light":   { "radius": 8 }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use crate::component::ComponentSet;
use crate::EcsError;

/// Source of entity templates.
pub trait EntityFactory {
    /// Build the components for a new entity of the named template.
    ///
    /// # Errors
    ///
    /// [`EcsError::ResourceNotFound`] if no template has that name.
    fn create_entity(&self, template: &str) -> Result<ComponentSet, EcsError>;
}

/// In-memory collection of parsed templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: BTreeMap<String, ComponentSet>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already-built template, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, components: ComponentSet) {
        self.templates.insert(name.into(), components);
    }

    /// Parse and register a template from JSON text.
    ///
    /// # Errors
    ///
    /// [`EcsError::TemplateParse`] if the JSON does not describe a
    /// [`ComponentSet`].
    pub fn insert_json(&mut self, name: &str, json: &str) -> Result<(), EcsError> {
        let components: ComponentSet =
            serde_json::from_str(json).map_err(|e| EcsError::TemplateParse {
                template: name.to_owned(),
                details: e.to_string(),
            })?;
        self.insert(name, components);
        Ok(())
    }

    /// Load every `*.json` file in `dir`; the file name (with extension) is
    /// the template name, matching how templates are referenced in game data
    /// (`"Player.json"`).
    ///
    /// # Errors
    ///
    /// [`EcsError::Io`] if the directory or a file cannot be read,
    /// [`EcsError::TemplateParse`] on the first malformed template.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, EcsError> {
        let dir = dir.as_ref();
        let io_err = |e: std::io::Error| EcsError::Io {
            path: dir.display().to_string(),
            details: e.to_string(),
        };
        let mut library = Self::new();
        let mut paths: Vec<_> = std::fs::read_dir(dir)
            .map_err(io_err)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();
        for path in paths {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let text = std::fs::read_to_string(&path).map_err(|e| EcsError::Io {
                path: path.display().to_string(),
                details: e.to_string(),
            })?;
            library.insert_json(name, &text)?;
        }
        tracing::debug!(dir = %dir.display(), count = library.len(), "templates loaded");
        Ok(library)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }
}

impl EntityFactory for TemplateLibrary {
    fn create_entity(&self, template: &str) -> Result<ComponentSet, EcsError> {
        self.templates
            .get(template)
            .cloned()
            .ok_or_else(|| EcsError::ResourceNotFound {
                template: template.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
