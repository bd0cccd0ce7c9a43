//! Barcode lot management service

use crate::{
    error::AppResult,
    models::barcode_lot::{BarcodeLot, IssueLot},
    repository::{barcode_lots::NamespaceScope, Repository},
};

#[derive(Clone)]
pub struct LotsService {
    repository: Repository,
    scope: NamespaceScope,
}

impl LotsService {
    pub fn new(repository: Repository, scope: NamespaceScope) -> Self {
        Self { repository, scope }
    }

    /// Issue a new lot: a contiguous code range unique within the configured
    /// namespace scope
    pub async fn issue(&self, req: IssueLot, creator_id: i32) -> AppResult<BarcodeLot> {
        self.repository
            .barcode_lots
            .issue(&req, self.scope, creator_id)
            .await
    }

    /// Draw the next unused code from a lot
    pub async fn assign_next(&self, lot_id: i32) -> AppResult<String> {
        self.repository.barcode_lots.assign_next(lot_id).await
    }

    /// Cancel an active lot, voiding its unused remainder
    pub async fn cancel(&self, lot_id: i32) -> AppResult<BarcodeLot> {
        self.repository.barcode_lots.cancel(lot_id).await
    }

    /// Get lot by ID
    pub async fn get(&self, lot_id: i32) -> AppResult<BarcodeLot> {
        self.repository.barcode_lots.get_by_id(lot_id).await
    }

    /// List lots, newest first
    pub async fn list(&self) -> AppResult<Vec<BarcodeLot>> {
        self.repository.barcode_lots.list().await
    }
}
