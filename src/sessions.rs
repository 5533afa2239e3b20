//! Session registry: one independently owned intake session per key.
//!
//! Sessions live only in memory. They disappear when ended, when they sit idle
//! longer than the registry's TTL, or when the process exits. Each session
//! sits behind its own lock, so a slow model call in one session never blocks
//! another, while two requests for the same session are handled strictly one
//! after the other.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::booking::BookingConfirmation;
use crate::error::{BookingError, IntakeError, RenderError};
use crate::intake::{IntakeController, IntakeSession, SessionView, TurnOutcome};
use crate::summary::{SummaryDocument, SummaryRenderer};

/// Errors from registry operations that target a specific session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Idle time after which a session is dropped.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// In-memory map of live sessions plus the shared, stateless services that
/// act on them.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<IntakeSession>>>>,
    controller: IntakeController,
    renderer: SummaryRenderer,
    idle_ttl: Duration,
}

impl SessionRegistry {
    pub fn new(controller: IntakeController, renderer: SummaryRenderer) -> Arc<Self> {
        Self::with_idle_ttl(controller, renderer, DEFAULT_SESSION_TTL)
    }

    pub fn with_idle_ttl(
        controller: IntakeController,
        renderer: SummaryRenderer,
        idle_ttl: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            controller,
            renderer,
            idle_ttl,
        })
    }

    pub fn controller(&self) -> &IntakeController {
        &self.controller
    }

    /// Start a new session and return its initial view.
    pub async fn create(&self) -> SessionView {
        let session = IntakeSession::new();
        let view = session.view();
        self.sessions
            .write()
            .await
            .insert(session.id, Arc::new(Mutex::new(session)));
        info!(session_id = %view.id, "Session created");
        view
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn get(&self, id: Uuid) -> Result<Arc<Mutex<IntakeSession>>, SessionError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound(id))
    }

    pub async fn view(&self, id: Uuid) -> Result<SessionView, SessionError> {
        let session = self.get(id).await?;
        let guard = session.lock().await;
        Ok(guard.view())
    }

    /// End a session, dropping all of its state. Returns false if it did not
    /// exist.
    pub async fn end(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!(session_id = %id, "Session ended");
        }
        removed
    }

    /// Drop every session whose last update is older than the idle TTL.
    /// Sessions locked by an in-flight request are busy, not idle, and are
    /// kept. Returns the number of sessions removed.
    pub async fn expire_idle(&self) -> usize {
        let ttl = chrono::Duration::from_std(self.idle_ttl)
            .unwrap_or_else(|_| chrono::Duration::weeks(52));
        let cutoff = Utc::now() - ttl;

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, session| match session.try_lock() {
            Ok(guard) => {
                let keep = guard.updated_at >= cutoff;
                if !keep {
                    debug!(session_id = %id, "Session expired");
                }
                keep
            }
            Err(_) => true,
        });
        let expired = before - sessions.len();

        if expired > 0 {
            info!(count = expired, remaining = sessions.len(), "Expired idle sessions");
        }
        expired
    }

    /// Run one intake turn. The session stays locked for the whole model call.
    pub async fn send_message(
        &self,
        id: Uuid,
        content: &str,
    ) -> Result<(TurnOutcome, SessionView), SessionError> {
        let session = self.get(id).await?;
        let mut guard = session.lock().await;
        let outcome = self.controller.handle_user_turn(&mut guard, content).await?;
        Ok((outcome, guard.view()))
    }

    /// Render the session's classification as a document.
    pub async fn summary(&self, id: Uuid) -> Result<SummaryDocument, SessionError> {
        let session = self.get(id).await?;
        let text = {
            let guard = session.lock().await;
            guard
                .final_classification()
                .map(String::from)
                .ok_or(RenderError::NothingToRender)?
        };
        let doc = self.renderer.render(&text)?;
        info!(session_id = %id, pages = doc.page_count, "Summary document rendered");
        Ok(doc)
    }

    pub async fn start_booking(&self, id: Uuid) -> Result<SessionView, SessionError> {
        let session = self.get(id).await?;
        let mut guard = session.lock().await;
        guard.start_booking()?;
        Ok(guard.view())
    }

    pub async fn select_slot(&self, id: Uuid, slot: &str) -> Result<SessionView, SessionError> {
        let session = self.get(id).await?;
        let mut guard = session.lock().await;
        guard.select_slot(slot)?;
        info!(session_id = %id, slot = %slot, "Booking slot selected");
        Ok(guard.view())
    }

    pub async fn confirm_booking(
        &self,
        id: Uuid,
    ) -> Result<(BookingConfirmation, SessionView), SessionError> {
        let session = self.get(id).await?;
        let mut guard = session.lock().await;
        let confirmation = guard.confirm_booking()?;
        Ok((confirmation, guard.view()))
    }
}

/// Spawn a background task that expires idle sessions every `every`.
pub fn spawn_expiry_task(
    registry: Arc<SessionRegistry>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            registry.expire_idle().await;
        }
    })
}
