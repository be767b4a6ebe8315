use serde::{Deserialize, Serialize};

/// A flavor or texture descriptor shared by dishes and wines.
///
/// Tags are global: every tenant pairs against the same catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: String,
    pub name: String,
    /// Grouping label such as "Flavor" or "Texture"
    pub category: String,
}

impl Tag {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
        }
    }
}

/// Display ordering for the catalog: category, then name.
pub fn sort_catalog(tags: &mut [Tag]) {
    tags.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.name.cmp(&b.name)));
}
