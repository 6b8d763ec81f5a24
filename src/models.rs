use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LibError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct StyleId(pub Uuid);

impl fmt::Display for StyleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StyleId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self)
    }
}

impl From<Uuid> for StyleId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    pub id: StyleId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleRelationship {
    pub parent_id: StyleId,
    pub child_id: StyleId,
}

/// A style with the ids of its direct parents, in the order supplied at
/// the most recent write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleWithParentIds {
    pub id: StyleId,
    pub name: String,
    pub parents: Vec<StyleId>,
}

/// A style with its direct parents and children resolved. Neighbors only,
/// never the transitive closure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleWithRelations {
    pub id: StyleId,
    pub name: String,
    pub parents: Vec<Style>,
    pub children: Vec<Style>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStylePayload {
    pub name: String,
    #[serde(default)]
    pub parents: Vec<StyleId>,
}

/// `parents` replaces the style's entire parent set; omitting it or
/// sending an empty list detaches the style from all current parents.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStylePayload {
    pub name: String,
    #[serde(default)]
    pub parents: Vec<StyleId>,
}

#[derive(Debug, Clone)]
pub struct StyleDefinition {
    pub name: String,
    pub parents: Vec<StyleId>,
}

impl CreateStylePayload {
    pub fn normalize(self) -> Result<StyleDefinition> {
        normalize_style_definition(self.name, self.parents)
    }
}

impl UpdateStylePayload {
    pub fn normalize(self) -> Result<StyleDefinition> {
        normalize_style_definition(self.name, self.parents)
    }
}

fn normalize_style_definition(name: String, parents: Vec<StyleId>) -> Result<StyleDefinition> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(LibError::invalid(
            "Style name is required",
            anyhow!("empty style name"),
        ));
    }

    let mut seen = HashSet::with_capacity(parents.len());
    let mut output_parents = Vec::with_capacity(parents.len());
    for parent in parents {
        if seen.insert(parent) {
            output_parents.push(parent);
        }
    }

    Ok(StyleDefinition {
        name,
        parents: output_parents,
    })
}
