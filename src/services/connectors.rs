//! Connector resolution service.
//!
//! Resolution walks a fixed priority chain and returns the first defined
//! connector: event override, category override, structure default, global
//! default. Read-only and side-effect free; with at most four indexed
//! lookups no cache is kept, so there is nothing to invalidate on override
//! writes.

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{
        connector::{
            CategoryOverride, Connector, CreateConnector, EventOverride,
            UpsertCategoryOverride, UpsertEventOverride,
        },
        enums::{Channel, EventCategory},
    },
    repository::Repository,
};

/// Layer of the hierarchy that supplied the connector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionLayer {
    Event,
    Category,
    StructureDefault,
    GlobalDefault,
}

/// First defined connector id across the override layers, with its source.
/// The structure/global defaults arrive as whole connectors, already
/// channel-filtered by the caller.
pub fn first_defined(
    event_ref: Option<i32>,
    category_ref: Option<i32>,
    structure_default: Option<i32>,
    global_default: Option<i32>,
) -> Option<(ResolutionLayer, i32)> {
    event_ref
        .map(|id| (ResolutionLayer::Event, id))
        .or_else(|| category_ref.map(|id| (ResolutionLayer::Category, id)))
        .or_else(|| structure_default.map(|id| (ResolutionLayer::StructureDefault, id)))
        .or_else(|| global_default.map(|id| (ResolutionLayer::GlobalDefault, id)))
}

/// A resolved connector and the layer it came from
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResolvedConnector {
    pub connector: Connector,
    pub layer: ResolutionLayer,
}

#[derive(Clone)]
pub struct ConnectorsService {
    repository: Repository,
}

impl ConnectorsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Resolve the connector for (structure, event, category, channel).
    ///
    /// Layers are probed in priority order and the first defined value wins;
    /// an exhausted chain is `NoConnectorAvailable`.
    pub async fn resolve(
        &self,
        structure_id: i32,
        event_code: &str,
        category: EventCategory,
        channel: Channel,
    ) -> AppResult<ResolvedConnector> {
        let connectors = &self.repository.connectors;

        if let Some(id) = connectors
            .get_event_override(structure_id, event_code)
            .await?
            .and_then(|o| o.connector_for(channel))
        {
            let connector = connectors.get_by_id(id).await?;
            return Ok(ResolvedConnector {
                connector,
                layer: ResolutionLayer::Event,
            });
        }

        if let Some(id) = connectors
            .get_category_override(structure_id, category)
            .await?
            .and_then(|o| o.connector_for(channel))
        {
            let connector = connectors.get_by_id(id).await?;
            return Ok(ResolvedConnector {
                connector,
                layer: ResolutionLayer::Category,
            });
        }

        if let Some(connector) = connectors
            .get_structure_default(structure_id, channel)
            .await?
        {
            return Ok(ResolvedConnector {
                connector,
                layer: ResolutionLayer::StructureDefault,
            });
        }

        if let Some(connector) = connectors.get_global_default(channel).await? {
            return Ok(ResolvedConnector {
                connector,
                layer: ResolutionLayer::GlobalDefault,
            });
        }

        Err(AppError::NoConnectorAvailable(format!(
            "no {} connector for structure {} event {}",
            channel, structure_id, event_code
        )))
    }

    pub async fn list(&self) -> AppResult<Vec<Connector>> {
        self.repository.connectors.list().await
    }

    pub async fn create(&self, req: CreateConnector) -> AppResult<Connector> {
        self.repository.connectors.create(&req).await
    }

    pub async fn upsert_category_override(
        &self,
        req: UpsertCategoryOverride,
    ) -> AppResult<CategoryOverride> {
        self.repository
            .connectors
            .upsert_category_override(&req)
            .await
    }

    pub async fn upsert_event_override(
        &self,
        req: UpsertEventOverride,
    ) -> AppResult<EventOverride> {
        self.repository.connectors.upsert_event_override(&req).await
    }

    pub async fn clear_category_override(
        &self,
        structure_id: i32,
        category: EventCategory,
    ) -> AppResult<()> {
        self.repository
            .connectors
            .clear_category_override(structure_id, category)
            .await
    }

    pub async fn clear_event_override(
        &self,
        structure_id: i32,
        event_code: &str,
    ) -> AppResult<()> {
        self.repository
            .connectors
            .clear_event_override(structure_id, event_code)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_layer_wins() {
        let got = first_defined(Some(1), Some(2), Some(3), Some(4));
        assert_eq!(got, Some((ResolutionLayer::Event, 1)));
    }

    #[test]
    fn category_beats_structure_default() {
        // event override unset, category = A, structure default = B
        let got = first_defined(None, Some(10), Some(20), None);
        assert_eq!(got, Some((ResolutionLayer::Category, 10)));
    }

    #[test]
    fn clearing_category_falls_through_to_structure_default() {
        let got = first_defined(None, None, Some(20), None);
        assert_eq!(got, Some((ResolutionLayer::StructureDefault, 20)));
    }

    #[test]
    fn global_default_is_last_resort() {
        let got = first_defined(None, None, None, Some(7));
        assert_eq!(got, Some((ResolutionLayer::GlobalDefault, 7)));
    }

    #[test]
    fn exhausted_chain_is_none() {
        assert_eq!(first_defined(None, None, None, None), None);
    }
}
