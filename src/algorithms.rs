use std::collections::{HashMap, HashSet};

use crate::models::{StyleId, StyleRelationship};

#[derive(Debug, Clone, Default)]
pub struct RelationshipSet {
    parents: HashMap<StyleId, Vec<StyleId>>,
}

impl RelationshipSet {
    pub fn from_edges(edges: &[StyleRelationship]) -> Self {
        let mut parents: HashMap<StyleId, Vec<StyleId>> = HashMap::with_capacity(edges.len());
        for edge in edges {
            parents.entry(edge.child_id).or_default().push(edge.parent_id);
            parents.entry(edge.parent_id).or_default();
        }
        Self { parents }
    }

    pub fn with_replaced_parents(&self, style_id: StyleId, new_parents: &[StyleId]) -> Self {
        let mut parents = self.parents.clone();
        parents.insert(style_id, new_parents.to_vec());
        for parent in new_parents {
            parents.entry(*parent).or_default();
        }
        Self { parents }
    }

    pub fn parents_of(&self, style_id: StyleId) -> &[StyleId] {
        self.parents
            .get(&style_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn style_ids(&self) -> impl Iterator<Item = StyleId> + '_ {
        self.parents.keys().copied()
    }

    pub fn has_cycle(&self) -> bool {
        // A walk re-reaching its own start is a cycle; shared ancestors
        // reached twice along different paths are not.
        self.style_ids().any(|start| self.reaches_itself(start))
    }

    fn reaches_itself(&self, start: StyleId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = self.parents_of(start).to_vec();
        while let Some(current) = stack.pop() {
            if current == start {
                return true;
            }
            if visited.insert(current) {
                stack.extend_from_slice(self.parents_of(current));
            }
        }
        false
    }
}
