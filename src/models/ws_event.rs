//! WebSocket event types for real-time dashboard refreshes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::RealTimeUpdate;

/// WebSocket event sent to connected clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
#[serde(rename_all = "snake_case")]
pub enum WsEvent {
    /// A new update was submitted.
    UpdateCreated(UpdateCreatedPayload),
    /// A report PDF was generated for an update.
    UpdatePdfReady(UpdatePdfReadyPayload),
    /// The report PDF of an update was deleted.
    UpdatePdfRemoved(UpdateRefPayload),
    /// An update was marked as sent to the client.
    UpdateSentToClient(UpdateRefPayload),
    /// An update was hidden from the feed.
    UpdateHidden(UpdateRefPayload),
}

/// Payload for update_created event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCreatedPayload {
    pub update_id: Uuid,
    pub update_code: String,
    pub project_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csr_partner_id: Option<Uuid>,
    pub update_no: String,
    pub photo_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Payload for update_pdf_ready event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePdfReadyPayload {
    pub update_id: Uuid,
    pub pdf_url: String,
}

/// Payload naming the affected update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRefPayload {
    pub update_id: Uuid,
}

/// Wrapper that includes timestamp with every event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsEventMessage {
    #[serde(flatten)]
    pub event: WsEvent,
    pub timestamp: DateTime<Utc>,
}

impl WsEventMessage {
    /// Create a new event message with the current timestamp.
    pub fn new(event: WsEvent) -> Self {
        Self {
            event,
            timestamp: Utc::now(),
        }
    }
}

impl WsEvent {
    pub fn update_created(update: &RealTimeUpdate) -> Self {
        WsEvent::UpdateCreated(UpdateCreatedPayload {
            update_id: update.id,
            update_code: update.update_code.clone(),
            project_id: update.project_id,
            csr_partner_id: update.csr_partner_id,
            update_no: update.update_no.clone(),
            photo_count: update.photos.len(),
            created_at: update.created_at,
        })
    }

    pub fn update_pdf_ready(update_id: Uuid, pdf_url: String) -> Self {
        WsEvent::UpdatePdfReady(UpdatePdfReadyPayload { update_id, pdf_url })
    }

    pub fn update_pdf_removed(update_id: Uuid) -> Self {
        WsEvent::UpdatePdfRemoved(UpdateRefPayload { update_id })
    }

    pub fn update_sent_to_client(update_id: Uuid) -> Self {
        WsEvent::UpdateSentToClient(UpdateRefPayload { update_id })
    }

    pub fn update_hidden(update_id: Uuid) -> Self {
        WsEvent::UpdateHidden(UpdateRefPayload { update_id })
    }
}
