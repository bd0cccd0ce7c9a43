//! Notification connectors and their override hierarchy

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::enums::{Channel, EventCategory};

/// Configured outbound notification connector.
///
/// `structure_id = None` with `is_default` marks the single global default
/// for its channel; a structure's own default carries its structure id.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Connector {
    pub id: i32,
    pub name: String,
    pub channel: Channel,
    pub structure_id: Option<i32>,
    pub is_default: bool,
}

/// Category-level override: one row per (structure, event category)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CategoryOverride {
    pub id: i32,
    pub structure_id: i32,
    pub category: EventCategory,
    pub email_connector_id: Option<i32>,
    pub sms_connector_id: Option<i32>,
}

/// Event-level override: one row per (structure, event code)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct EventOverride {
    pub id: i32,
    pub structure_id: i32,
    pub event_code: String,
    pub email_connector_id: Option<i32>,
    pub sms_connector_id: Option<i32>,
}

impl CategoryOverride {
    pub fn connector_for(&self, channel: Channel) -> Option<i32> {
        match channel {
            Channel::Email => self.email_connector_id,
            Channel::Sms => self.sms_connector_id,
        }
    }
}

impl EventOverride {
    pub fn connector_for(&self, channel: Channel) -> Option<i32> {
        match channel {
            Channel::Email => self.email_connector_id,
            Channel::Sms => self.sms_connector_id,
        }
    }
}

/// Upsert category override request
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpsertCategoryOverride {
    pub structure_id: i32,
    pub category: EventCategory,
    pub email_connector_id: Option<i32>,
    pub sms_connector_id: Option<i32>,
}

/// Upsert event override request
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpsertEventOverride {
    pub structure_id: i32,
    #[validate(length(min = 1, max = 64))]
    pub event_code: String,
    pub email_connector_id: Option<i32>,
    pub sms_connector_id: Option<i32>,
}

/// Create connector request
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateConnector {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    pub channel: Channel,
    pub structure_id: Option<i32>,
    pub is_default: bool,
}
