use anyhow::anyhow;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use sqlx::migrate::{MigrateError, Migrator};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{LibError, Result};
use crate::models::{
    CreateStylePayload, Style, StyleId, StyleRelationship, StyleWithParentIds,
    StyleWithRelations, UpdateStylePayload,
};
use crate::service;
use crate::store::StyleStore;

pub static MIGRATOR: Lazy<Migrator> = Lazy::new(|| {
    let mut migrator = sqlx::migrate!("./migrations");
    migrator.set_ignore_missing(true);
    migrator
});

pub async fn create_style_tables(pool: &PgPool) -> std::result::Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[derive(Debug, Clone, FromRow)]
struct StyleRow {
    id: Uuid,
    name: String,
}

#[derive(Debug, Clone, FromRow)]
struct RelationshipRow {
    parent_id: Uuid,
    child_id: Uuid,
}

#[derive(Debug, Clone, FromRow)]
struct StyleParentRow {
    id: Uuid,
    name: String,
    parent_id: Option<Uuid>,
}

impl From<StyleRow> for Style {
    fn from(value: StyleRow) -> Self {
        Self {
            id: StyleId(value.id),
            name: value.name,
        }
    }
}

impl From<RelationshipRow> for StyleRelationship {
    fn from(value: RelationshipRow) -> Self {
        Self {
            parent_id: StyleId(value.parent_id),
            child_id: StyleId(value.child_id),
        }
    }
}

// Rows arrive ordered by style, so parents group into consecutive runs.
fn fold_styles_with_parents(rows: Vec<StyleParentRow>) -> Vec<StyleWithParentIds> {
    let mut styles: Vec<StyleWithParentIds> = Vec::new();
    for row in rows {
        match styles.last_mut() {
            Some(last) if last.id.0 == row.id => {
                if let Some(parent_id) = row.parent_id {
                    last.parents.push(StyleId(parent_id));
                }
            }
            _ => styles.push(StyleWithParentIds {
                id: StyleId(row.id),
                name: row.name,
                parents: row.parent_id.map(StyleId).into_iter().collect(),
            }),
        }
    }
    styles
}

fn db_err(public: &'static str, err: sqlx::Error) -> LibError {
    LibError::database(public, anyhow!(err))
}

/// Postgres-backed [`StyleStore`] over one open transaction. Dropping the
/// handle without calling [`commit`](Self::commit) rolls back.
pub struct PgStyleStore<'c> {
    tx: sqlx::Transaction<'c, sqlx::Postgres>,
}

impl PgStyleStore<'static> {
    pub async fn begin(pool: &PgPool) -> Result<Self> {
        let tx = pool
            .begin()
            .await
            .map_err(|err| db_err("Failed to start transaction", err))?;
        Ok(Self { tx })
    }
}

impl<'c> PgStyleStore<'c> {
    pub fn new(tx: sqlx::Transaction<'c, sqlx::Postgres>) -> Self {
        Self { tx }
    }

    pub async fn commit(self) -> Result<()> {
        self.tx
            .commit()
            .await
            .map_err(|err| db_err("Failed to commit transaction", err))
    }
}

#[async_trait]
impl StyleStore for PgStyleStore<'_> {
    async fn lock_styles(&mut self, ids: &[StyleId]) -> Result<Vec<StyleId>> {
        let ids: Vec<Uuid> = ids.iter().map(|id| id.0).collect();
        // Ordered locking keeps concurrent writers from deadlocking on
        // overlapping parent sets.
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id
            FROM taxonomy.styles
            WHERE id = ANY($1)
            ORDER BY id ASC
            FOR UPDATE
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|err| db_err("Failed to lock styles", err))?;

        Ok(rows.into_iter().map(|(id,)| StyleId(id)).collect())
    }

    async fn insert_style(&mut self, style: &Style) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO taxonomy.styles (id, name)
            VALUES ($1, $2)
            "#,
        )
        .bind(style.id.0)
        .bind(&style.name)
        .execute(&mut *self.tx)
        .await
        .map_err(|err| db_err("Failed to create style", err))?;

        Ok(())
    }

    async fn update_style(&mut self, id: StyleId, name: &str) -> Result<Style> {
        let row = sqlx::query_as::<_, StyleRow>(
            r#"
            UPDATE taxonomy.styles
            SET name = $1,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
            RETURNING id, name
            "#,
        )
        .bind(name)
        .bind(id.0)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|err| db_err("Failed to update style", err))?;

        if let Some(row) = row {
            Ok(row.into())
        } else {
            Err(LibError::not_found(
                "Style not found",
                anyhow!("style {} not found", id),
            ))
        }
    }

    async fn insert_relationships(&mut self, relationships: &[StyleRelationship]) -> Result<()> {
        for relationship in relationships {
            sqlx::query(
                r#"
                INSERT INTO taxonomy.style_relationships (parent_id, child_id)
                VALUES ($1, $2)
                "#,
            )
            .bind(relationship.parent_id.0)
            .bind(relationship.child_id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(|err| db_err("Failed to write style relationships", err))?;
        }

        Ok(())
    }

    async fn delete_relationships_by_child(&mut self, child_id: StyleId) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM taxonomy.style_relationships
            WHERE child_id = $1
            "#,
        )
        .bind(child_id.0)
        .execute(&mut *self.tx)
        .await
        .map_err(|err| db_err("Failed to replace style relationships", err))?;

        Ok(())
    }

    async fn list_relationships(&mut self) -> Result<Vec<StyleRelationship>> {
        let rows = sqlx::query_as::<_, RelationshipRow>(
            r#"
            SELECT parent_id, child_id
            FROM taxonomy.style_relationships
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|err| db_err("Failed to query style relationships", err))?;

        Ok(rows.into_iter().map(StyleRelationship::from).collect())
    }

    async fn find_style_with_relations(
        &mut self,
        id: StyleId,
    ) -> Result<Option<StyleWithRelations>> {
        let style = sqlx::query_as::<_, StyleRow>(
            r#"
            SELECT id, name
            FROM taxonomy.styles
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|err| db_err("Failed to query style", err))?;

        let Some(style) = style else {
            return Ok(None);
        };

        let parents = sqlx::query_as::<_, StyleRow>(
            r#"
            SELECT s.id, s.name
            FROM taxonomy.style_relationships r
            JOIN taxonomy.styles s
            ON s.id = r.parent_id
            WHERE r.child_id = $1
            ORDER BY r.id ASC
            "#,
        )
        .bind(id.0)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|err| db_err("Failed to query style parents", err))?;

        let children = sqlx::query_as::<_, StyleRow>(
            r#"
            SELECT s.id, s.name
            FROM taxonomy.style_relationships r
            JOIN taxonomy.styles s
            ON s.id = r.child_id
            WHERE r.parent_id = $1
            ORDER BY r.id ASC
            "#,
        )
        .bind(id.0)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|err| db_err("Failed to query style children", err))?;

        Ok(Some(StyleWithRelations {
            id: StyleId(style.id),
            name: style.name,
            parents: parents.into_iter().map(Style::from).collect(),
            children: children.into_iter().map(Style::from).collect(),
        }))
    }

    async fn list_styles_with_parents(&mut self) -> Result<Vec<StyleWithParentIds>> {
        let rows = sqlx::query_as::<_, StyleParentRow>(
            r#"
            SELECT s.id, s.name, r.parent_id
            FROM taxonomy.styles s
            LEFT JOIN taxonomy.style_relationships r
            ON r.child_id = s.id
            ORDER BY s.created_at ASC, s.id ASC, r.id ASC
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|err| db_err("Failed to list styles", err))?;

        Ok(fold_styles_with_parents(rows))
    }
}

pub async fn create_style(
    pool: &PgPool,
    payload: CreateStylePayload,
) -> Result<StyleWithParentIds> {
    let mut store = PgStyleStore::begin(pool).await?;
    let created = service::create_style(&mut store, payload).await?;
    store.commit().await?;
    Ok(created)
}

pub async fn update_style(
    pool: &PgPool,
    style_id: StyleId,
    payload: UpdateStylePayload,
) -> Result<StyleWithParentIds> {
    let mut store = PgStyleStore::begin(pool).await?;
    let updated = service::update_style(&mut store, style_id, payload).await?;
    store.commit().await?;
    Ok(updated)
}

pub async fn get_style(pool: &PgPool, style_id: StyleId) -> Result<StyleWithRelations> {
    let mut store = PgStyleStore::begin(pool).await?;
    let style = service::find_style(&mut store, style_id).await?;
    store.commit().await?;
    Ok(style)
}

pub async fn list_styles(pool: &PgPool) -> Result<Vec<StyleWithParentIds>> {
    let mut store = PgStyleStore::begin(pool).await?;
    let styles = service::list_styles(&mut store).await?;
    store.commit().await?;
    Ok(styles)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{StyleParentRow, fold_styles_with_parents};
    use crate::models::StyleId;

    #[test]
    fn folding_groups_consecutive_rows_by_style() {
        let ale = Uuid::new_v4();
        let ipa = Uuid::new_v4();
        let imperial = Uuid::new_v4();
        let rows = vec![
            StyleParentRow {
                id: ale,
                name: "Ale".to_string(),
                parent_id: None,
            },
            StyleParentRow {
                id: imperial,
                name: "Imperial IPA".to_string(),
                parent_id: Some(ale),
            },
            StyleParentRow {
                id: imperial,
                name: "Imperial IPA".to_string(),
                parent_id: Some(ipa),
            },
        ];

        let styles = fold_styles_with_parents(rows);
        assert_eq!(styles.len(), 2);
        assert!(styles[0].parents.is_empty());
        assert_eq!(styles[1].parents, vec![StyleId(ale), StyleId(ipa)]);
    }
}
