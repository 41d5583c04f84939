#![forbid(unsafe_code)]

//! Read-only project catalog.

use std::collections::HashSet;
use std::fmt;

use crate::project::Project;

/// How many projects a featured strip shows by default.
pub const FEATURED_COUNT: usize = 3;

const BUILTIN_JSON: &str = include_str!("../data/projects.json");

/// Failure to load a catalog.
#[derive(Debug)]
pub enum CatalogError {
    /// Malformed JSON or a record that does not match [`Project`].
    Json(serde_json::Error),
    /// Two projects share a slug.
    DuplicateSlug(String),
    /// Two projects share an id.
    DuplicateId(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(err) => write!(f, "invalid catalog: {err}"),
            Self::DuplicateSlug(slug) => write!(f, "duplicate project slug `{slug}`"),
            Self::DuplicateId(id) => write!(f, "duplicate project id `{id}`"),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

/// All known projects, drafts included. Queries only ever return
/// published ones.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    projects: Vec<Project>,
}

impl Catalog {
    /// Wrap `projects`, rejecting duplicate ids or slugs.
    pub fn new(projects: Vec<Project>) -> Result<Self, CatalogError> {
        let mut ids = HashSet::new();
        let mut slugs = HashSet::new();
        for project in &projects {
            if !ids.insert(project.id.as_str()) {
                return Err(CatalogError::DuplicateId(project.id.clone()));
            }
            if !slugs.insert(project.slug.as_str()) {
                return Err(CatalogError::DuplicateSlug(project.slug.clone()));
            }
        }
        Ok(Self { projects })
    }

    /// Parse a JSON array of projects.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Self::new(serde_json::from_str(json)?)
    }

    /// The catalog shipped with the site.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_JSON)
    }

    /// Every record, drafts included, in source order.
    #[must_use]
    pub fn all(&self) -> &[Project] {
        &self.projects
    }

    /// Published projects in source order.
    #[must_use]
    pub fn published(&self) -> Vec<&Project> {
        self.projects.iter().filter(|p| p.is_published()).collect()
    }

    /// A published project by route slug.
    #[must_use]
    pub fn by_slug(&self, slug: &str) -> Option<&Project> {
        self.projects
            .iter()
            .find(|p| p.slug == slug && p.is_published())
    }

    /// Up to `n` published projects: sticky first, then newest first.
    /// Ties keep source order.
    #[must_use]
    pub fn featured(&self, n: usize) -> Vec<&Project> {
        let mut featured = self.published();
        featured.sort_by(|a, b| b.sticky.cmp(&a.sticky).then(b.date.cmp(&a.date)));
        featured.truncate(n);
        featured
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}
