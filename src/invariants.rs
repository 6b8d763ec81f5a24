use anyhow::anyhow;

use crate::algorithms::RelationshipSet;
use crate::error::{LibError, Result};
use crate::models::{StyleId, StyleRelationship};

/// Rejects a parent replacement for `style_id` that would leave the
/// taxonomy cyclic. `edges` must be the full pre-write relationship list.
pub fn ensure_acyclic_replacement(
    edges: &[StyleRelationship],
    style_id: StyleId,
    parents: &[StyleId],
) -> Result<()> {
    // Shedding edges cannot introduce a cycle; skip the walk entirely.
    if parents.is_empty() {
        return Ok(());
    }

    let proposed = RelationshipSet::from_edges(edges).with_replaced_parents(style_id, parents);
    if proposed.has_cycle() {
        return Err(LibError::cyclic_relationship(anyhow!(
            "style {} with parents {:?} would make the taxonomy cyclic",
            style_id,
            parents
        )));
    }

    Ok(())
}
