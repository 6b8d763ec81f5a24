pub mod algorithms;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod invariants;
pub mod models;
pub mod service;
pub mod store;

pub mod prelude {
    pub use crate::algorithms::RelationshipSet;
    #[cfg(feature = "sqlx")]
    pub use crate::db::{
        PgStyleStore, create_style, create_style_tables, get_style, list_styles, update_style,
    };
    pub use crate::error::{ErrorKind, LibError, Result};
    pub use crate::invariants::ensure_acyclic_replacement;
    pub use crate::models::{
        CreateStylePayload, Style, StyleId, StyleRelationship, StyleWithParentIds,
        StyleWithRelations, UpdateStylePayload,
    };
    pub use crate::store::{MemoryStyleStore, StyleStore};
}
