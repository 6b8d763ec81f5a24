use std::collections::HashSet;

use anyhow::anyhow;
use uuid::Uuid;

use crate::error::{LibError, Result};
use crate::invariants::ensure_acyclic_replacement;
use crate::models::{
    CreateStylePayload, Style, StyleId, StyleRelationship, StyleWithParentIds,
    StyleWithRelations, UpdateStylePayload,
};
use crate::store::StyleStore;

/// Create a style under the given parents. Writes happen only after the
/// parents are locked and the replacement is proven acyclic against the
/// edge set read under those locks, so a rejected request leaves no
/// partial state behind.
pub async fn create_style<S>(
    store: &mut S,
    payload: CreateStylePayload,
) -> Result<StyleWithParentIds>
where
    S: StyleStore + ?Sized,
{
    let definition = payload.normalize()?;
    let id = StyleId(Uuid::new_v4());

    let locked = lock_existing(store, &definition.parents).await?;
    ensure_parents_locked(&definition.parents, &locked)?;

    let edges = store.list_relationships().await?;
    ensure_acyclic_replacement(&edges, id, &definition.parents)?;

    store
        .insert_style(&Style {
            id,
            name: definition.name.clone(),
        })
        .await?;
    store
        .insert_relationships(&parent_relationships(id, &definition.parents))
        .await?;
    tracing::debug!(style_id = %id, parents = definition.parents.len(), "created style");

    Ok(StyleWithParentIds {
        id,
        name: definition.name,
        parents: definition.parents,
    })
}

/// Rename a style and replace its entire parent set with the supplied
/// one. The style is locked alongside the new parents, which serializes
/// competing updates of the same style.
pub async fn update_style<S>(
    store: &mut S,
    id: StyleId,
    payload: UpdateStylePayload,
) -> Result<StyleWithParentIds>
where
    S: StyleStore + ?Sized,
{
    let definition = payload.normalize()?;

    let mut lock_ids = definition.parents.clone();
    if !lock_ids.contains(&id) {
        lock_ids.push(id);
    }
    let locked = lock_existing(store, &lock_ids).await?;
    if !locked.contains(&id) {
        return Err(LibError::not_found(
            "Style not found",
            anyhow!("style {} not found", id),
        ));
    }
    ensure_parents_locked(&definition.parents, &locked)?;

    let edges = store.list_relationships().await?;
    ensure_acyclic_replacement(&edges, id, &definition.parents)?;

    let style = store.update_style(id, &definition.name).await?;
    store.delete_relationships_by_child(id).await?;
    store
        .insert_relationships(&parent_relationships(id, &definition.parents))
        .await?;
    tracing::debug!(style_id = %id, parents = definition.parents.len(), "replaced style parents");

    Ok(StyleWithParentIds {
        id: style.id,
        name: style.name,
        parents: definition.parents,
    })
}

pub async fn find_style<S>(store: &mut S, id: StyleId) -> Result<StyleWithRelations>
where
    S: StyleStore + ?Sized,
{
    store
        .find_style_with_relations(id)
        .await?
        .ok_or_else(|| LibError::not_found("Style not found", anyhow!("style {} not found", id)))
}

pub async fn list_styles<S>(store: &mut S) -> Result<Vec<StyleWithParentIds>>
where
    S: StyleStore + ?Sized,
{
    store.list_styles_with_parents().await
}

fn parent_relationships(child_id: StyleId, parents: &[StyleId]) -> Vec<StyleRelationship> {
    parents
        .iter()
        .map(|parent_id| StyleRelationship {
            parent_id: *parent_id,
            child_id,
        })
        .collect()
}

async fn lock_existing<S>(store: &mut S, ids: &[StyleId]) -> Result<HashSet<StyleId>>
where
    S: StyleStore + ?Sized,
{
    Ok(store.lock_styles(ids).await?.into_iter().collect())
}

fn ensure_parents_locked(parents: &[StyleId], locked: &HashSet<StyleId>) -> Result<()> {
    let missing: Vec<StyleId> = parents
        .iter()
        .filter(|parent_id| !locked.contains(*parent_id))
        .copied()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(LibError::parent_styles_not_found(anyhow!(
            "parent styles {:?} could not be locked",
            missing
        )))
    }
}
