//! One chat round-trip: remote when possible, canned reply otherwise.

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, warn};

use crate::backend::{ChatBackend, ChatRequest};
use crate::fallback::fallback_reply;
use crate::state::{BusinessProfile, FallbackMode, HistoryEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Side-channel message for the user (a toast), separate from the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, text: text.into() }
    }
}

pub const REMOTE_UNAVAILABLE_NOTICE: &str =
    "Assistant service is unavailable. Switched to offline suggestions.";

/// Result of one send. There is always a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub reply: String,
    pub notice: Option<Notice>,
}

#[derive(Clone)]
pub struct ExchangeClient {
    backend: Arc<dyn ChatBackend>,
    rng: Arc<Mutex<StdRng>>,
}

impl ExchangeClient {
    /// `seed` makes template selection reproducible; `None` seeds from the OS.
    pub fn new(backend: Arc<dyn ChatBackend>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            backend,
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    /// Send `user_text` (non-blank) with prior `history` and the profile.
    ///
    /// Any backend failure engages `fallback` for good and the same message is
    /// answered from the templates instead.
    pub async fn send(
        &self,
        user_text: &str,
        history: Vec<HistoryEntry>,
        profile: &BusinessProfile,
        fallback: &mut FallbackMode,
    ) -> Exchange {
        if fallback.is_engaged() {
            return Exchange {
                reply: self.canned(profile),
                notice: None,
            };
        }

        let request = ChatRequest {
            message: user_text.to_string(),
            history,
            profile: profile.clone(),
        };

        match self.backend.chat(&request).await {
            Ok(reply) => {
                debug!(chars = reply.len(), "backend replied");
                Exchange { reply, notice: None }
            }
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "chat request failed, engaging fallback");
                fallback.engage();
                Exchange {
                    reply: self.canned(profile),
                    notice: Some(Notice::error(REMOTE_UNAVAILABLE_NOTICE)),
                }
            }
        }
    }

    /// Liveness check at session start. Failure engages `fallback` before the
    /// user sends anything.
    pub async fn probe_health(&self, fallback: &mut FallbackMode) -> Option<Notice> {
        if fallback.is_engaged() {
            return None;
        }
        match self.backend.health().await {
            Ok(()) => {
                debug!("backend health check passed");
                None
            }
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "health check failed, engaging fallback");
                fallback.engage();
                Some(Notice::error(REMOTE_UNAVAILABLE_NOTICE))
            }
        }
    }

    fn canned(&self, profile: &BusinessProfile) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        fallback_reply(&mut *rng, profile)
    }
}
