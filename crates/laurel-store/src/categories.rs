//! CRUD operations for [`BadgeCategory`] records.

use laurel_shared::slug::{slugify, with_suffix};
use laurel_shared::{BadgeCategory, CategoryDraft, CategoryId};
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::rows::{encode_ts, now, ts_at, uuid_at};

const SELECT_CATEGORY: &str = "SELECT id, name, slug, description, created_at FROM badge_categories";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new category with a slug derived from its name.
    pub fn create_category(&self, draft: &CategoryDraft) -> Result<BadgeCategory> {
        draft.validate()?;

        let category = BadgeCategory {
            id: CategoryId::new(),
            name: draft.name.trim().to_string(),
            slug: self.unique_slug(&draft.name, None)?,
            description: draft.description.clone(),
            created_at: now(),
        };

        self.conn()
            .execute(
                "INSERT INTO badge_categories (id, name, slug, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    category.id.to_string(),
                    category.name,
                    category.slug,
                    category.description,
                    encode_ts(&category.created_at),
                ],
            )
            .map_err(StoreError::from_write)?;

        tracing::debug!(id = %category.id, slug = %category.slug, "category created");
        Ok(category)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_category(&self, id: CategoryId) -> Result<BadgeCategory> {
        self.conn()
            .query_row(
                &format!("{SELECT_CATEGORY} WHERE id = ?1"),
                params![id.to_string()],
                row_to_category,
            )
            .map_err(StoreError::from_lookup)
    }

    /// List all categories ordered by name.
    pub fn list_categories(&self) -> Result<Vec<BadgeCategory>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("{SELECT_CATEGORY} ORDER BY name ASC"))?;
        let rows = stmt.query_map([], row_to_category)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Rename / re-describe a category. The slug follows the new name.
    pub fn update_category(&self, id: CategoryId, draft: &CategoryDraft) -> Result<BadgeCategory> {
        draft.validate()?;
        let slug = self.unique_slug(&draft.name, Some(id))?;

        let affected = self
            .conn()
            .execute(
                "UPDATE badge_categories SET name = ?1, slug = ?2, description = ?3 WHERE id = ?4",
                params![draft.name.trim(), slug, draft.description, id.to_string()],
            )
            .map_err(StoreError::from_write)?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_category(id)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a category. Its badges stay, uncategorised.
    pub fn delete_category(&self, id: CategoryId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM badge_categories WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(affected > 0)
    }

    /// First free slug for `name`, appending `-2`, `-3`, … on collision.
    /// `owner` is ignored when checking, so renaming keeps its own slug.
    fn unique_slug(&self, name: &str, owner: Option<CategoryId>) -> Result<String> {
        let base = slugify(name);
        let owner = owner.map(|id| id.to_string());
        let mut candidate = base.clone();
        let mut n = 2;

        loop {
            let holder: Option<String> = self
                .conn()
                .query_row(
                    "SELECT id FROM badge_categories WHERE slug = ?1",
                    params![candidate],
                    |row| row.get(0),
                )
                .optional()?;

            match holder {
                None => return Ok(candidate),
                Some(id) if Some(&id) == owner.as_ref() => return Ok(candidate),
                Some(_) => {
                    candidate = with_suffix(&base, n);
                    n += 1;
                }
            }
        }
    }
}

fn row_to_category(row: &rusqlite::Row<'_>) -> rusqlite::Result<BadgeCategory> {
    Ok(BadgeCategory {
        id: CategoryId(uuid_at(row, 0)?),
        name: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        created_at: ts_at(row, 4)?,
    })
}
