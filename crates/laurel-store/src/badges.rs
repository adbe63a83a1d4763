//! CRUD operations for [`Badge`] rule descriptors, plus the catalog query
//! the awarding engine runs on every trigger.

use laurel_shared::{Badge, BadgeDraft, BadgeId, CategoryId, TriggerType};
use rusqlite::params;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::rows::{encode_ts, now, opt_uuid_at, parsed_at, ts_at, uuid_at};

const SELECT_BADGE: &str = "SELECT id, name, description, icon, category_id, rarity, points,
        trigger_type, requirement_count, specific_entity_id, is_hidden, created_at
     FROM badges";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    pub fn create_badge(&self, draft: &BadgeDraft) -> Result<Badge> {
        draft.validate()?;

        let badge = Badge {
            id: BadgeId::new(),
            name: draft.name.trim().to_string(),
            description: draft.description.clone(),
            icon: draft.icon.clone(),
            category_id: draft.category_id,
            rarity: draft.rarity,
            points: draft.points,
            trigger_type: draft.trigger_type.clone(),
            requirement_count: draft.requirement_count,
            specific_entity_id: draft.specific_entity_id.clone(),
            is_hidden: draft.is_hidden,
            created_at: now(),
        };

        self.conn()
            .execute(
                "INSERT INTO badges (id, name, description, icon, category_id, rarity, points,
                     trigger_type, requirement_count, specific_entity_id, is_hidden, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    badge.id.to_string(),
                    badge.name,
                    badge.description,
                    badge.icon,
                    badge.category_id.map(|c| c.to_string()),
                    badge.rarity.as_str(),
                    badge.points,
                    badge.trigger_type.as_str(),
                    badge.requirement_count,
                    badge.specific_entity_id,
                    badge.is_hidden,
                    encode_ts(&badge.created_at),
                ],
            )
            .map_err(StoreError::from_write)?;

        tracing::debug!(
            id = %badge.id,
            trigger = %badge.trigger_type,
            "badge created"
        );
        Ok(badge)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_badge(&self, id: BadgeId) -> Result<Badge> {
        self.conn()
            .query_row(
                &format!("{SELECT_BADGE} WHERE id = ?1"),
                params![id.to_string()],
                row_to_badge,
            )
            .map_err(StoreError::from_lookup)
    }

    /// Every badge in creation order.
    pub fn list_badges(&self) -> Result<Vec<Badge>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("{SELECT_BADGE} ORDER BY created_at ASC, rowid ASC"))?;
        let rows = stmt.query_map([], row_to_badge)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    pub fn list_badges_in_category(&self, category: CategoryId) -> Result<Vec<Badge>> {
        let mut stmt = self.conn().prepare(&format!(
            "{SELECT_BADGE} WHERE category_id = ?1 ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map(params![category.to_string()], row_to_badge)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Badges the engine evaluates for `trigger`, in creation order.
    ///
    /// Hidden badges are only included when `include_hidden` is set.
    pub fn candidates_for(&self, trigger: &TriggerType, include_hidden: bool) -> Result<Vec<Badge>> {
        let mut stmt = self.conn().prepare(&format!(
            "{SELECT_BADGE}
             WHERE trigger_type = ?1 AND (?2 OR is_hidden = 0)
             ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map(params![trigger.as_str(), include_hidden], row_to_badge)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Replace every editable field of a badge. Existing awards are kept.
    pub fn update_badge(&self, id: BadgeId, draft: &BadgeDraft) -> Result<Badge> {
        draft.validate()?;

        let affected = self
            .conn()
            .execute(
                "UPDATE badges SET name = ?1, description = ?2, icon = ?3, category_id = ?4,
                     rarity = ?5, points = ?6, trigger_type = ?7, requirement_count = ?8,
                     specific_entity_id = ?9, is_hidden = ?10
                 WHERE id = ?11",
                params![
                    draft.name.trim(),
                    draft.description,
                    draft.icon,
                    draft.category_id.map(|c| c.to_string()),
                    draft.rarity.as_str(),
                    draft.points,
                    draft.trigger_type.as_str(),
                    draft.requirement_count,
                    draft.specific_entity_id,
                    draft.is_hidden,
                    id.to_string(),
                ],
            )
            .map_err(StoreError::from_write)?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_badge(id)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a badge. ON DELETE CASCADE removes its award records.
    pub fn delete_badge(&self, id: BadgeId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM badges WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

fn row_to_badge(row: &rusqlite::Row<'_>) -> rusqlite::Result<Badge> {
    let trigger: String = row.get(7)?;

    Ok(Badge {
        id: BadgeId(uuid_at(row, 0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        icon: row.get(3)?,
        category_id: opt_uuid_at(row, 4)?.map(CategoryId),
        rarity: parsed_at(row, 5)?,
        points: row.get(6)?,
        trigger_type: TriggerType::from(trigger),
        requirement_count: row.get(8)?,
        specific_entity_id: row.get(9)?,
        is_hidden: row.get(10)?,
        created_at: ts_at(row, 11)?,
    })
}
