use anyhow::anyhow;
use async_trait::async_trait;

use crate::error::{LibError, Result};
use crate::models::{
    Style, StyleId, StyleRelationship, StyleWithParentIds, StyleWithRelations,
};

/// Storage port for the style taxonomy. A handle is one transaction-scoped
/// unit of work: the engine issues every read and write of a single call
/// against one handle, and the edge list read after `lock_styles` must
/// reflect all writes committed under those locks.
#[async_trait]
pub trait StyleStore: Send {
    /// Take a write lock on every id in `ids` that exists and return those
    /// ids. Callers detect dangling references by set membership.
    async fn lock_styles(&mut self, ids: &[StyleId]) -> Result<Vec<StyleId>>;

    /// Insert a style row. The id is pre-assigned by the caller.
    async fn insert_style(&mut self, style: &Style) -> Result<()>;

    async fn update_style(&mut self, id: StyleId, name: &str) -> Result<Style>;

    async fn insert_relationships(&mut self, relationships: &[StyleRelationship]) -> Result<()>;

    async fn delete_relationships_by_child(&mut self, child_id: StyleId) -> Result<()>;

    async fn list_relationships(&mut self) -> Result<Vec<StyleRelationship>>;

    async fn find_style_with_relations(
        &mut self,
        id: StyleId,
    ) -> Result<Option<StyleWithRelations>>;

    async fn list_styles_with_parents(&mut self) -> Result<Vec<StyleWithParentIds>>;
}

/// In-process storage port for embedding and tests. Styles keep creation
/// order and relationships keep insertion order, matching the Postgres
/// port, and the same row constraints apply (unique edges, existing
/// endpoints).
#[derive(Debug, Clone, Default)]
pub struct MemoryStyleStore {
    styles: Vec<Style>,
    relationships: Vec<StyleRelationship>,
}

impl MemoryStyleStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn style_by_id(&self, id: StyleId) -> Option<&Style> {
        self.styles.iter().find(|style| style.id == id)
    }
}

#[async_trait]
impl StyleStore for MemoryStyleStore {
    async fn lock_styles(&mut self, ids: &[StyleId]) -> Result<Vec<StyleId>> {
        // Nothing to lock in-process; this is the existence filter only.
        Ok(ids
            .iter()
            .filter(|id| self.style_by_id(**id).is_some())
            .copied()
            .collect())
    }

    async fn insert_style(&mut self, style: &Style) -> Result<()> {
        if self.style_by_id(style.id).is_some() {
            return Err(LibError::database(
                "Style id already exists",
                anyhow!("duplicate style id {}", style.id),
            ));
        }
        self.styles.push(style.clone());
        Ok(())
    }

    async fn update_style(&mut self, id: StyleId, name: &str) -> Result<Style> {
        let style = self
            .styles
            .iter_mut()
            .find(|style| style.id == id)
            .ok_or_else(|| {
                LibError::not_found("Style not found", anyhow!("style {} not found", id))
            })?;
        style.name = name.to_string();
        Ok(style.clone())
    }

    async fn insert_relationships(&mut self, relationships: &[StyleRelationship]) -> Result<()> {
        for relationship in relationships {
            if self.style_by_id(relationship.parent_id).is_none()
                || self.style_by_id(relationship.child_id).is_none()
            {
                return Err(LibError::database(
                    "Style relationship references a missing style",
                    anyhow!(
                        "dangling relationship {} -> {}",
                        relationship.parent_id,
                        relationship.child_id
                    ),
                ));
            }
            if self.relationships.contains(relationship) {
                return Err(LibError::database(
                    "Style relationship already exists",
                    anyhow!(
                        "duplicate relationship {} -> {}",
                        relationship.parent_id,
                        relationship.child_id
                    ),
                ));
            }
            self.relationships.push(*relationship);
        }
        Ok(())
    }

    async fn delete_relationships_by_child(&mut self, child_id: StyleId) -> Result<()> {
        self.relationships
            .retain(|relationship| relationship.child_id != child_id);
        Ok(())
    }

    async fn list_relationships(&mut self) -> Result<Vec<StyleRelationship>> {
        Ok(self.relationships.clone())
    }

    async fn find_style_with_relations(
        &mut self,
        id: StyleId,
    ) -> Result<Option<StyleWithRelations>> {
        let Some(style) = self.style_by_id(id) else {
            return Ok(None);
        };

        let parents = self
            .relationships
            .iter()
            .filter(|relationship| relationship.child_id == id)
            .filter_map(|relationship| self.style_by_id(relationship.parent_id).cloned())
            .collect();
        let children = self
            .relationships
            .iter()
            .filter(|relationship| relationship.parent_id == id)
            .filter_map(|relationship| self.style_by_id(relationship.child_id).cloned())
            .collect();

        Ok(Some(StyleWithRelations {
            id: style.id,
            name: style.name.clone(),
            parents,
            children,
        }))
    }

    async fn list_styles_with_parents(&mut self) -> Result<Vec<StyleWithParentIds>> {
        Ok(self
            .styles
            .iter()
            .map(|style| StyleWithParentIds {
                id: style.id,
                name: style.name.clone(),
                parents: self
                    .relationships
                    .iter()
                    .filter(|relationship| relationship.child_id == style.id)
                    .map(|relationship| relationship.parent_id)
                    .collect(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{MemoryStyleStore, StyleStore};
    use crate::models::{Style, StyleId, StyleRelationship};

    fn style(name: &str) -> Style {
        Style {
            id: StyleId(Uuid::new_v4()),
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn lock_returns_only_the_ids_that_exist() {
        let mut store = MemoryStyleStore::new();
        let ale = style("Ale");
        store.insert_style(&ale).await.expect("insert should pass");

        let ghost = StyleId(Uuid::new_v4());
        let locked = store
            .lock_styles(&[ale.id, ghost])
            .await
            .expect("lock should pass");
        assert_eq!(locked, vec![ale.id]);
    }

    #[tokio::test]
    async fn duplicate_relationships_are_rejected() {
        let mut store = MemoryStyleStore::new();
        let ale = style("Ale");
        let ipa = style("IPA");
        store.insert_style(&ale).await.expect("insert should pass");
        store.insert_style(&ipa).await.expect("insert should pass");

        let edge = StyleRelationship {
            parent_id: ale.id,
            child_id: ipa.id,
        };
        store
            .insert_relationships(&[edge])
            .await
            .expect("first insert should pass");
        let err = store
            .insert_relationships(&[edge])
            .await
            .expect_err("second insert should fail");
        assert_eq!(err.public, "Style relationship already exists");
    }

    #[tokio::test]
    async fn dangling_relationships_are_rejected() {
        let mut store = MemoryStyleStore::new();
        let ale = style("Ale");
        store.insert_style(&ale).await.expect("insert should pass");

        let err = store
            .insert_relationships(&[StyleRelationship {
                parent_id: ale.id,
                child_id: StyleId(Uuid::new_v4()),
            }])
            .await
            .expect_err("dangling child should fail");
        assert_eq!(err.public, "Style relationship references a missing style");
    }

    #[tokio::test]
    async fn neighbors_resolve_in_insertion_order() {
        let mut store = MemoryStyleStore::new();
        let ale = style("Ale");
        let imperial = style("Imperial");
        let ipa = style("IPA");
        for s in [&ale, &imperial, &ipa] {
            store.insert_style(s).await.expect("insert should pass");
        }
        store
            .insert_relationships(&[
                StyleRelationship {
                    parent_id: imperial.id,
                    child_id: ipa.id,
                },
                StyleRelationship {
                    parent_id: ale.id,
                    child_id: ipa.id,
                },
            ])
            .await
            .expect("insert should pass");

        let found = store
            .find_style_with_relations(ipa.id)
            .await
            .expect("find should pass")
            .expect("style should exist");
        assert_eq!(found.parents, vec![imperial.clone(), ale.clone()]);
        assert!(found.children.is_empty());

        let listed = store
            .list_styles_with_parents()
            .await
            .expect("list should pass");
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[2].parents, vec![imperial.id, ale.id]);
    }

    #[tokio::test]
    async fn deleting_by_child_leaves_other_edges_alone() {
        let mut store = MemoryStyleStore::new();
        let ale = style("Ale");
        let ipa = style("IPA");
        let stout = style("Stout");
        for s in [&ale, &ipa, &stout] {
            store.insert_style(s).await.expect("insert should pass");
        }
        store
            .insert_relationships(&[
                StyleRelationship {
                    parent_id: ale.id,
                    child_id: ipa.id,
                },
                StyleRelationship {
                    parent_id: ale.id,
                    child_id: stout.id,
                },
            ])
            .await
            .expect("insert should pass");

        store
            .delete_relationships_by_child(ipa.id)
            .await
            .expect("delete should pass");

        let remaining = store
            .list_relationships()
            .await
            .expect("list should pass");
        assert_eq!(
            remaining,
            vec![StyleRelationship {
                parent_id: ale.id,
                child_id: stout.id,
            }]
        );
    }
}
