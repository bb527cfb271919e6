//! UI-agnostic session state
//!
//! This module owns everything a chat session remembers: the transcript, the
//! text being typed, the in-flight flag, the business profile and the sticky
//! fallback latch. Front-ends (TUI today) mutate it only through the methods
//! below.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::storage::ProfileStore;

/// Identifier of a message within one session, in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    User,
    Assistant,
}

impl Origin {
    /// Role name the chat backend expects in `history`.
    pub fn wire_role(&self) -> &'static str {
        match self {
            Origin::User => "user",
            Origin::Assistant => "model",
        }
    }
}

/// A single chat bubble. Fields are private so a message cannot change after
/// it has been appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    text: String,
    origin: Origin,
    timestamp: DateTime<Local>,
}

impl Message {
    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }
}

/// One prior turn as sent to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub text: String,
}

/// Five free-text fields describing the user's business.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusinessProfile {
    pub product: String,
    pub target_customer: String,
    pub geographic_market: String,
    pub pricing_strategy: String,
    pub main_channels: String,
}

impl BusinessProfile {
    /// Keys used on the wire, in storage and as template placeholders.
    pub const FIELD_KEYS: [&'static str; 5] = [
        "product",
        "targetCustomer",
        "geographicMarket",
        "pricingStrategy",
        "mainChannels",
    ];

    /// Look a field up by its camelCase key.
    pub fn field(&self, key: &str) -> Option<&str> {
        match key {
            "product" => Some(&self.product),
            "targetCustomer" => Some(&self.target_customer),
            "geographicMarket" => Some(&self.geographic_market),
            "pricingStrategy" => Some(&self.pricing_strategy),
            "mainChannels" => Some(&self.main_channels),
            _ => None,
        }
    }

    pub fn field_mut(&mut self, key: &str) -> Option<&mut String> {
        match key {
            "product" => Some(&mut self.product),
            "targetCustomer" => Some(&mut self.target_customer),
            "geographicMarket" => Some(&mut self.geographic_market),
            "pricingStrategy" => Some(&mut self.pricing_strategy),
            "mainChannels" => Some(&mut self.main_channels),
            _ => None,
        }
    }

    /// True when every field has non-blank content
    pub fn is_complete(&self) -> bool {
        Self::FIELD_KEYS
            .iter()
            .all(|key| self.field(key).is_some_and(|v| !v.trim().is_empty()))
    }
}

/// Latch that switches the session to locally generated replies.
///
/// Once engaged it stays engaged: there is deliberately no way to release it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FallbackMode {
    engaged: bool,
}

impl FallbackMode {
    pub fn engaged() -> Self {
        Self { engaged: true }
    }

    pub fn engage(&mut self) {
        self.engaged = true;
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    /// Fold another snapshot into this one. An engaged side wins.
    pub fn merge(&mut self, other: FallbackMode) {
        self.engaged |= other.engaged;
    }
}

#[derive(Debug, Default)]
pub struct SessionState {
    messages: Vec<Message>,
    next_id: u64,
    pending_input: String,
    in_flight: bool,
    profile: BusinessProfile,
    profile_submitted: bool,
    fallback: FallbackMode,
    welcome_id: Option<MessageId>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    /// Editing stays available while a reply is pending.
    pub fn input_mut(&mut self) -> &mut String {
        &mut self.pending_input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.pending_input = text.into();
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn profile(&self) -> &BusinessProfile {
        &self.profile
    }

    pub fn is_profile_submitted(&self) -> bool {
        self.profile_submitted
    }

    pub fn fallback_mode(&self) -> FallbackMode {
        self.fallback
    }

    pub fn engage_fallback(&mut self) {
        if !self.fallback.is_engaged() {
            warn!("remote unavailable, switching session to fallback replies");
        }
        self.fallback.engage();
    }

    /// Apply a fallback snapshot coming back from an exchange task.
    pub fn merge_fallback(&mut self, other: FallbackMode) {
        if other.is_engaged() {
            self.engage_fallback();
        }
    }

    fn push(&mut self, text: String, origin: Origin) -> MessageId {
        let id = MessageId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        self.messages.push(Message {
            id,
            text,
            origin,
            timestamp: Local::now(),
        });
        id
    }

    /// Append what the user typed. Blank text is ignored and leaves the session
    /// untouched. Surrounding whitespace is trimmed before storing.
    pub fn append_user_message(&mut self, text: &str) -> Option<MessageId> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        let id = self.push(trimmed.to_string(), Origin::User);
        self.pending_input.clear();
        self.in_flight = true;
        Some(id)
    }

    pub fn append_assistant_message(&mut self, text: impl Into<String>) -> MessageId {
        let id = self.push(text.into(), Origin::Assistant);
        self.in_flight = false;
        id
    }

    /// Greet the user once the profile is known. The greeting never goes to the
    /// backend as history.
    pub fn post_welcome(&mut self) -> MessageId {
        let text = if self.profile.product.trim().is_empty() {
            "Hi! I'm your business assistant. Ask me anything about growing your business.".to_string()
        } else {
            format!(
                "Hi! I'm your business assistant. I've read about your {} business. \
                 What would you like to work on today?",
                self.profile.product.trim()
            )
        };
        let id = self.push(text, Origin::Assistant);
        self.welcome_id = Some(id);
        id
    }

    pub fn welcome_id(&self) -> Option<MessageId> {
        self.welcome_id
    }

    /// Transcript as backend history, without the synthetic greeting.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.messages
            .iter()
            .filter(|m| Some(m.id) != self.welcome_id)
            .map(|m| HistoryEntry {
                role: m.origin.wire_role().to_string(),
                text: m.text.clone(),
            })
            .collect()
    }

    /// History for the message just appended: everything before it.
    pub fn history_before_last(&self) -> Vec<HistoryEntry> {
        let mut history = self.history();
        if self.messages.last().is_some_and(|m| Some(m.id) != self.welcome_id) {
            history.pop();
        }
        history
    }

    /// Replace the profile and write it to both storage tiers.
    pub fn set_business_profile(
        &mut self,
        profile: BusinessProfile,
        stores: &[&dyn ProfileStore],
    ) -> anyhow::Result<()> {
        self.profile = profile;
        self.profile_submitted = true;
        // Every tier gets the write even if an earlier one fails.
        let mut first_error = None;
        for store in stores {
            if let Err(e) = store.save(&self.profile) {
                warn!(error = %e, "failed to write business profile to a store");
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e.into());
        }
        info!(product = %self.profile.product, "business profile saved");
        Ok(())
    }

    /// Adopt a previously saved profile if the store has one.
    pub fn load_persisted_profile(&mut self, store: &dyn ProfileStore) -> bool {
        match store.load() {
            Ok(Some(profile)) => {
                info!(product = %profile.product, "loaded persisted business profile");
                self.profile = profile;
                self.profile_submitted = true;
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "could not read persisted business profile");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::storage::SessionStore;

    struct BrokenStore;

    impl ProfileStore for BrokenStore {
        fn load(&self) -> Result<Option<BusinessProfile>, StorageError> {
            Ok(None)
        }
        fn save(&self, _profile: &BusinessProfile) -> Result<(), StorageError> {
            Err(StorageError::NoDataDir)
        }
        fn clear(&self) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn coffee() -> BusinessProfile {
        BusinessProfile {
            product: "coffee".into(),
            target_customer: "students".into(),
            geographic_market: "local".into(),
            pricing_strategy: "low-cost".into(),
            main_channels: "social media".into(),
        }
    }

    #[test]
    fn test_append_user_message_adds_one() {
        let mut state = SessionState::new();
        state.set_input("  hello there ");
        let id = state.append_user_message("  hello there ");

        assert!(id.is_some());
        assert_eq!(state.messages().len(), 1);
        let msg = &state.messages()[0];
        assert_eq!(msg.origin(), Origin::User);
        assert_eq!(msg.text(), "hello there");
        assert!(state.pending_input().is_empty());
        assert!(state.is_in_flight());
    }

    #[test]
    fn test_append_blank_user_message_is_noop() {
        let mut state = SessionState::new();
        state.set_input("   \n\t");
        assert!(state.append_user_message("   \n\t").is_none());
        assert!(state.append_user_message("").is_none());

        assert!(state.messages().is_empty());
        assert!(!state.is_in_flight());
        assert_eq!(state.pending_input(), "   \n\t");
    }

    #[test]
    fn test_assistant_message_clears_in_flight() {
        let mut state = SessionState::new();
        state.append_user_message("hi");
        state.append_assistant_message("hello");

        assert!(!state.is_in_flight());
        assert_eq!(state.messages()[1].origin(), Origin::Assistant);
    }

    #[test]
    fn test_ids_increase_in_arrival_order() {
        let mut state = SessionState::new();
        state.post_welcome();
        state.append_user_message("one");
        state.append_assistant_message("two");
        state.append_user_message("three");

        let ids: Vec<u64> = state.messages().iter().map(|m| m.id().0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_history_skips_welcome_and_maps_roles() {
        let mut state = SessionState::new();
        state.post_welcome();
        state.append_user_message("hi");
        state.append_assistant_message("hello");

        let history = state.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, "user");
        assert_eq!(history[1].role, "model");
        assert_eq!(history[1].text, "hello");
    }

    #[test]
    fn test_history_before_last_excludes_current_message() {
        let mut state = SessionState::new();
        state.post_welcome();
        state.append_user_message("first");
        state.append_assistant_message("reply");
        state.append_user_message("second");

        let history = state.history_before_last();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].text, "first");
    }

    #[test]
    fn test_fallback_is_sticky() {
        let mut state = SessionState::new();
        assert!(!state.fallback_mode().is_engaged());
        state.engage_fallback();
        state.merge_fallback(FallbackMode::default());
        assert!(state.fallback_mode().is_engaged());
    }

    #[test]
    fn test_profile_round_trip_through_store() {
        let session = SessionStore::new();
        let mut state = SessionState::new();
        state.set_business_profile(coffee(), &[&session]).unwrap();
        assert!(state.is_profile_submitted());

        let mut next = SessionState::new();
        assert!(next.load_persisted_profile(&session));
        assert!(next.is_profile_submitted());
        assert_eq!(next.profile(), &coffee());
    }

    #[test]
    fn test_failed_store_does_not_skip_the_next() {
        let session = SessionStore::new();
        let mut state = SessionState::new();

        let result = state.set_business_profile(coffee(), &[&BrokenStore, &session]);

        assert!(result.is_err());
        assert!(state.is_profile_submitted());
        assert_eq!(session.load().unwrap(), Some(coffee()));
    }

    #[test]
    fn test_load_persisted_profile_when_empty() {
        let session = SessionStore::new();
        let mut state = SessionState::new();
        assert!(!state.load_persisted_profile(&session));
        assert!(!state.is_profile_submitted());
    }

    #[test]
    fn test_profile_serializes_camel_case() {
        let json = serde_json::to_value(coffee()).unwrap();
        assert_eq!(json["targetCustomer"], "students");
        assert_eq!(json["mainChannels"], "social media");
    }

    #[test]
    fn test_profile_is_complete() {
        assert!(coffee().is_complete());
        let mut partial = coffee();
        partial.pricing_strategy = "  ".into();
        assert!(!partial.is_complete());
    }
}
