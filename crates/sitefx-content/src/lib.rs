#![forbid(unsafe_code)]

//! Project catalog behind the filterable portfolio grid.
//!
//! [`Project`] implements [`sitefx_core::Categorized`], so a catalog's
//! published list feeds straight into [`sitefx_core::paginate`].

pub mod catalog;
pub mod project;

pub use catalog::{Catalog, CatalogError, FEATURED_COUNT};
pub use project::{
    InvalidDate, Project, ProjectCategory, ProjectDate, ProjectStatus, UnknownCategory,
};
