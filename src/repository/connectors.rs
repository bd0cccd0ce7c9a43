//! Connectors and override-hierarchy repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        connector::{
            CategoryOverride, Connector, CreateConnector, EventOverride,
            UpsertCategoryOverride, UpsertEventOverride,
        },
        enums::{Channel, EventCategory},
    },
};

const CONNECTOR_COLUMNS: &str = "id, name, channel, structure_id, is_default";
const CATEGORY_COLUMNS: &str =
    "id, structure_id, category, email_connector_id, sms_connector_id";
const EVENT_COLUMNS: &str =
    "id, structure_id, event_code, email_connector_id, sms_connector_id";

#[derive(Clone)]
pub struct ConnectorsRepository {
    pool: Pool<Postgres>,
}

impl ConnectorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get connector by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Connector> {
        sqlx::query_as::<_, Connector>(&format!(
            "SELECT {} FROM connectors WHERE id = $1",
            CONNECTOR_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Connector with id {} not found", id)))
    }

    /// List all connectors
    pub async fn list(&self) -> AppResult<Vec<Connector>> {
        let rows = sqlx::query_as::<_, Connector>(&format!(
            "SELECT {} FROM connectors ORDER BY channel, structure_id NULLS FIRST, name",
            CONNECTOR_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Create a connector; a new default displaces the previous one in scope
    pub async fn create(&self, req: &CreateConnector) -> AppResult<Connector> {
        let mut tx = self.pool.begin().await?;

        if req.is_default {
            sqlx::query(
                "UPDATE connectors SET is_default = FALSE \
                 WHERE channel = $1 AND structure_id IS NOT DISTINCT FROM $2 AND is_default",
            )
            .bind(req.channel)
            .bind(req.structure_id)
            .execute(&mut *tx)
            .await?;
        }

        let row = sqlx::query_as::<_, Connector>(&format!(
            "INSERT INTO connectors (name, channel, structure_id, is_default) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            CONNECTOR_COLUMNS
        ))
        .bind(&req.name)
        .bind(req.channel)
        .bind(req.structure_id)
        .bind(req.is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    /// Event-level override for (structure, event code), if any
    pub async fn get_event_override(
        &self,
        structure_id: i32,
        event_code: &str,
    ) -> AppResult<Option<EventOverride>> {
        let row = sqlx::query_as::<_, EventOverride>(&format!(
            "SELECT {} FROM connector_event_overrides \
             WHERE structure_id = $1 AND event_code = $2",
            EVENT_COLUMNS
        ))
        .bind(structure_id)
        .bind(event_code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Category-level override for (structure, category), if any
    pub async fn get_category_override(
        &self,
        structure_id: i32,
        category: EventCategory,
    ) -> AppResult<Option<CategoryOverride>> {
        let row = sqlx::query_as::<_, CategoryOverride>(&format!(
            "SELECT {} FROM connector_category_overrides \
             WHERE structure_id = $1 AND category = $2",
            CATEGORY_COLUMNS
        ))
        .bind(structure_id)
        .bind(category)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// The structure's own default connector for the channel, if any
    pub async fn get_structure_default(
        &self,
        structure_id: i32,
        channel: Channel,
    ) -> AppResult<Option<Connector>> {
        let row = sqlx::query_as::<_, Connector>(&format!(
            "SELECT {} FROM connectors \
             WHERE structure_id = $1 AND channel = $2 AND is_default",
            CONNECTOR_COLUMNS
        ))
        .bind(structure_id)
        .bind(channel)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// The single global connector flagged as default for the channel, if any
    pub async fn get_global_default(&self, channel: Channel) -> AppResult<Option<Connector>> {
        let row = sqlx::query_as::<_, Connector>(&format!(
            "SELECT {} FROM connectors \
             WHERE structure_id IS NULL AND channel = $1 AND is_default",
            CONNECTOR_COLUMNS
        ))
        .bind(channel)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Upsert a category override row
    pub async fn upsert_category_override(
        &self,
        req: &UpsertCategoryOverride,
    ) -> AppResult<CategoryOverride> {
        let row = sqlx::query_as::<_, CategoryOverride>(&format!(
            "INSERT INTO connector_category_overrides \
             (structure_id, category, email_connector_id, sms_connector_id) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (structure_id, category) DO UPDATE \
             SET email_connector_id = EXCLUDED.email_connector_id, \
                 sms_connector_id = EXCLUDED.sms_connector_id \
             RETURNING {}",
            CATEGORY_COLUMNS
        ))
        .bind(req.structure_id)
        .bind(req.category)
        .bind(req.email_connector_id)
        .bind(req.sms_connector_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Upsert an event override row
    pub async fn upsert_event_override(
        &self,
        req: &UpsertEventOverride,
    ) -> AppResult<EventOverride> {
        let row = sqlx::query_as::<_, EventOverride>(&format!(
            "INSERT INTO connector_event_overrides \
             (structure_id, event_code, email_connector_id, sms_connector_id) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (structure_id, event_code) DO UPDATE \
             SET email_connector_id = EXCLUDED.email_connector_id, \
                 sms_connector_id = EXCLUDED.sms_connector_id \
             RETURNING {}",
            EVENT_COLUMNS
        ))
        .bind(req.structure_id)
        .bind(&req.event_code)
        .bind(req.email_connector_id)
        .bind(req.sms_connector_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Remove a category override; resolution falls through to the next layer
    pub async fn clear_category_override(
        &self,
        structure_id: i32,
        category: EventCategory,
    ) -> AppResult<()> {
        sqlx::query(
            "DELETE FROM connector_category_overrides WHERE structure_id = $1 AND category = $2",
        )
        .bind(structure_id)
        .bind(category)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Remove an event override
    pub async fn clear_event_override(
        &self,
        structure_id: i32,
        event_code: &str,
    ) -> AppResult<()> {
        sqlx::query(
            "DELETE FROM connector_event_overrides WHERE structure_id = $1 AND event_code = $2",
        )
        .bind(structure_id)
        .bind(event_code)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
