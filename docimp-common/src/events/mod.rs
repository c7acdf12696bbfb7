//! Event types for the DocImport event system
//!
//! Provides shared event definitions and the EventBus used to hand results
//! to the presentation layer and to downstream processing collaborators.

mod import_types;

pub use import_types::{DuplicateCounts, WizardPosition};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// DocImport event types
///
/// Events are broadcast via EventBus and can be serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ImportEvent {
    /// Import session created
    ///
    /// Triggers:
    /// - SSE: Open the wizard for the session
    ImportSessionStarted {
        /// Session UUID
        session_id: Uuid,
        /// Location the files will be imported into
        target_location: String,
        /// When session started
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Wizard state changed (step, review flags or accumulated data)
    ///
    /// Triggers:
    /// - SSE: Update step indicator
    WizardStateChanged {
        /// Session UUID
        session_id: Uuid,
        /// New wizard position
        position: WizardPosition,
        /// When state changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Duplicate detection finished for an intake batch
    ///
    /// Triggers:
    /// - SSE: Show duplicate resolution choices
    /// - UI: Single summary notification for the batch
    DuplicatesDetected {
        /// Session UUID
        session_id: Uuid,
        /// Classification counts
        counts: DuplicateCounts,
        /// When detection finished
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A content analysis pass committed its results
    ///
    /// Stale (superseded) passes never produce this event.
    ContentAnalysisCompleted {
        /// Session UUID (nil when the scheduler runs outside a session)
        session_id: Uuid,
        /// Number of files analysed
        analyzed_files: usize,
        /// Number of files that will use OCR
        ocr_files: usize,
        /// When the pass committed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Finalized import job handed to the processing collaborator
    ///
    /// Fire-and-forget: the engine does not track the outcome.
    ImportJobFinalized {
        /// Session UUID
        session_id: Uuid,
        /// Whether the job was produced by quick-finish
        quick_mode: bool,
        /// Full finalized job payload
        job: serde_json::Value,
        /// When the job was emitted
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Session discarded without emitting a job
    ImportSessionAbandoned {
        /// Session UUID
        session_id: Uuid,
        /// When session was abandoned
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl ImportEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            ImportEvent::ImportSessionStarted { .. } => "ImportSessionStarted",
            ImportEvent::WizardStateChanged { .. } => "WizardStateChanged",
            ImportEvent::DuplicatesDetected { .. } => "DuplicatesDetected",
            ImportEvent::ContentAnalysisCompleted { .. } => "ContentAnalysisCompleted",
            ImportEvent::ImportJobFinalized { .. } => "ImportJobFinalized",
            ImportEvent::ImportSessionAbandoned { .. } => "ImportSessionAbandoned",
        }
    }

    /// Session this event belongs to
    pub fn session_id(&self) -> Uuid {
        match self {
            ImportEvent::ImportSessionStarted { session_id, .. }
            | ImportEvent::WizardStateChanged { session_id, .. }
            | ImportEvent::DuplicatesDetected { session_id, .. }
            | ImportEvent::ContentAnalysisCompleted { session_id, .. }
            | ImportEvent::ImportJobFinalized { session_id, .. }
            | ImportEvent::ImportSessionAbandoned { session_id, .. } => *session_id,
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use docimp_common::events::{EventBus, ImportEvent};
/// use uuid::Uuid;
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit(ImportEvent::ImportSessionAbandoned {
///     session_id: Uuid::new_v4(),
///     timestamp: chrono::Utc::now(),
/// }).ok();
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ImportEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ImportEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ImportEvent,
    ) -> Result<usize, broadcast::error::SendError<ImportEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ImportEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
