//! Application menu core: catalog loading, category trees and ranked search
//! over installed applications.

pub mod catalog;
pub mod category;
pub mod config;
pub mod error;
pub mod executor;
pub mod launcher;
pub mod model;
pub mod query;
pub mod run_action;
pub mod search;
pub mod search_action;
pub mod shell;
pub mod sources;

pub use catalog::{CatalogBuild, CatalogOptions, LoadOutcome, LoadRequest, LoadStatus, MenuCatalog};
pub use category::{Category, CategoryEntry, Row};
pub use launcher::{DesktopAction, Launcher};
pub use model::{Item, LauncherId};
pub use query::{Query, NO_MATCH};
pub use search::{MatchKind, SearchEngine, SearchMatch};
