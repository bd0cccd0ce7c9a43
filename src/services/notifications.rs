//! Post-commit notification dispatch.
//!
//! Dispatch is fire-and-forget: it runs strictly after the circulation
//! transaction commits, and resolution or transport failure degrades to a
//! logged skip. Transport itself lives behind `NotificationDispatcher`; the
//! default implementation just traces the payload.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    error::AppResult,
    models::{
        connector::Connector,
        enums::{category_of, Channel},
    },
};

use super::connectors::ConnectorsService;

/// Payload handed to the transport
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPayload {
    pub event_code: String,
    pub structure_id: i32,
    pub user_id: i32,
    pub message: String,
}

/// Transport seam; implementations deliver through a resolved connector
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, connector: &Connector, payload: &NotificationPayload)
        -> AppResult<()>;
}

/// Default dispatcher: logs the delivery instead of sending it
pub struct TracingDispatcher;

#[async_trait]
impl NotificationDispatcher for TracingDispatcher {
    async fn dispatch(
        &self,
        connector: &Connector,
        payload: &NotificationPayload,
    ) -> AppResult<()> {
        tracing::info!(
            connector = %connector.name,
            channel = %connector.channel,
            event = %payload.event_code,
            user_id = payload.user_id,
            "notification dispatched"
        );
        Ok(())
    }
}

/// Dispatch through the given transport, swallowing failures with a log line
pub async fn dispatch_or_log(
    dispatcher: &dyn NotificationDispatcher,
    connector: &Connector,
    payload: &NotificationPayload,
) {
    if let Err(e) = dispatcher.dispatch(connector, payload).await {
        tracing::warn!(
            event = %payload.event_code,
            connector = %connector.name,
            "notification dispatch failed, skipping: {}",
            e
        );
    }
}

#[derive(Clone)]
pub struct NotificationsService {
    connectors: ConnectorsService,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl NotificationsService {
    pub fn new(connectors: ConnectorsService, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self {
            connectors,
            dispatcher,
        }
    }

    /// Fire-and-forget notification for a committed transition. Never blocks
    /// or fails the calling operation.
    pub fn notify(
        &self,
        structure_id: i32,
        user_id: i32,
        event_code: &'static str,
        message: String,
    ) {
        let service = self.clone();
        tokio::spawn(async move {
            service
                .send(structure_id, user_id, event_code, message)
                .await;
        });
    }

    async fn send(&self, structure_id: i32, user_id: i32, event_code: &str, message: String) {
        let category = category_of(event_code);
        let payload = NotificationPayload {
            event_code: event_code.to_string(),
            structure_id,
            user_id,
            message,
        };

        // Email is the primary channel; fall back to SMS when no email
        // connector resolves for the structure.
        for channel in [Channel::Email, Channel::Sms] {
            match self
                .connectors
                .resolve(structure_id, event_code, category, channel)
                .await
            {
                Ok(resolved) => {
                    dispatch_or_log(self.dispatcher.as_ref(), &resolved.connector, &payload).await;
                    return;
                }
                Err(e) => {
                    tracing::debug!(
                        event = %payload.event_code,
                        %channel,
                        "connector resolution failed: {}",
                        e
                    );
                }
            }
        }

        tracing::warn!(
            event = %payload.event_code,
            structure_id,
            "no connector resolved on any channel, notification skipped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::enums::Channel;

    fn connector() -> Connector {
        Connector {
            id: 1,
            name: "smtp-main".into(),
            channel: Channel::Email,
            structure_id: None,
            is_default: true,
        }
    }

    fn payload() -> NotificationPayload {
        NotificationPayload {
            event_code: "loan.checkout".into(),
            structure_id: 1,
            user_id: 9,
            message: "copy 4 checked out".into(),
        }
    }

    #[tokio::test]
    async fn dispatch_failure_is_swallowed() {
        let mut mock = MockNotificationDispatcher::new();
        mock.expect_dispatch()
            .times(1)
            .returning(|_, _| Err(AppError::Internal("smtp down".into())));

        // Must not panic or propagate
        dispatch_or_log(&mock, &connector(), &payload()).await;
    }

    #[tokio::test]
    async fn dispatch_success_reaches_transport() {
        let mut mock = MockNotificationDispatcher::new();
        mock.expect_dispatch().times(1).returning(|_, _| Ok(()));

        dispatch_or_log(&mock, &connector(), &payload()).await;
    }
}
