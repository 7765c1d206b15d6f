//! Oracle event publication.
//!
//! Publishing never blocks and never fails the caller. The channel sink is
//! bounded and rejects the newest event when full, counting the drop; an
//! [`EventRecorder`] task drains the channel into the `events` table.

use aura_core::types::WalletAddress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::OracleError;
use crate::storage::{BadgeRecord, Storage};

/// Kind of oracle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A passport's risk score moved by more than the significance threshold.
    PassportUpdated,
    /// A proof-of-humanity badge was issued.
    BadgeIssued,
    /// An API key was revoked.
    ApiKeyRevoked,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PassportUpdated => "passport_updated",
            EventType::BadgeIssued => "badge_issued",
            EventType::ApiKeyRevoked => "api_key_revoked",
        }
    }
}

impl FromStr for EventType {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passport_updated" => Ok(EventType::PassportUpdated),
            "badge_issued" => Ok(EventType::BadgeIssued),
            "api_key_revoked" => Ok(EventType::ApiKeyRevoked),
            other => Err(OracleError::InvalidInput(format!("Unknown event type: {}", other))),
        }
    }
}

/// An event emitted by the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleEvent {
    pub event_type: EventType,
    /// Subject wallet, absent for key events.
    pub wallet_address: Option<WalletAddress>,
    pub payload: Value,
    pub emitted_at: DateTime<Utc>,
}

impl OracleEvent {
    /// Significant risk score change.
    pub fn passport_updated(
        wallet: WalletAddress,
        old_score: f64,
        new_score: f64,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_type: EventType::PassportUpdated,
            wallet_address: Some(wallet),
            payload: json!({
                "old_score": old_score,
                "new_score": new_score,
                "change": new_score - old_score,
            }),
            emitted_at: at,
        }
    }

    /// New badge.
    pub fn badge_issued(badge: &BadgeRecord) -> Self {
        Self {
            event_type: EventType::BadgeIssued,
            wallet_address: Some(badge.wallet_address),
            payload: json!({
                "badge_id": badge.id,
                "token_id": badge.token_id,
                "score": badge.score,
                "verification_level": badge.verification_level,
            }),
            emitted_at: badge.issued_at,
        }
    }

    /// Key revocation. The key itself is never written to the payload.
    pub fn api_key_revoked(user_id: &str, at: DateTime<Utc>) -> Self {
        Self {
            event_type: EventType::ApiKeyRevoked,
            wallet_address: None,
            payload: json!({ "user_id": user_id }),
            emitted_at: at,
        }
    }
}

/// Destination for oracle events.
pub trait EventSink: Send + Sync {
    /// Publish an event. Must not block.
    fn publish(&self, event: OracleEvent);

    /// Events rejected so far.
    fn dropped(&self) -> u64 {
        0
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn publish(&self, event: OracleEvent) {
        debug!(event_type = event.event_type.as_str(), "Event discarded (events disabled)");
    }
}

/// Bounded channel sink. A full channel rejects the new event.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    tx: mpsc::Sender<OracleEvent>,
    dropped: Arc<AtomicU64>,
}

impl ChannelEventSink {
    /// Create a sink and the receiver that drains it.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<OracleEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }
}

impl EventSink for ChannelEventSink {
    fn publish(&self, event: OracleEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    event_type = event.event_type.as_str(),
                    dropped_total = total,
                    "Event channel full, dropping event"
                );
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(
                    event_type = event.event_type.as_str(),
                    "Event channel closed, dropping event"
                );
            }
        }
    }

    fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Drains the event channel into storage.
pub struct EventRecorder {
    rx: mpsc::Receiver<OracleEvent>,
    storage: Storage,
}

impl EventRecorder {
    pub fn new(rx: mpsc::Receiver<OracleEvent>, storage: Storage) -> Self {
        Self { rx, storage }
    }

    /// Run until every sender is dropped. Returns the number of events stored.
    pub async fn run(mut self) -> u64 {
        info!("Event recorder started");
        let mut recorded = 0u64;

        while let Some(event) = self.rx.recv().await {
            match self.storage.insert_event(&event).await {
                Ok(_) => recorded += 1,
                Err(e) => error!(
                    event_type = event.event_type.as_str(),
                    "Failed to record event: {:#}", e
                ),
            }
        }

        info!(recorded, "Event recorder stopped");
        recorded
    }
}
