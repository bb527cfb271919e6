use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use arboard::Clipboard;
use ratatui::layout::Rect;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use bizchat_core::{
    render_transcript, BusinessProfile, Config, Exchange, ExchangeClient, FallbackMode, FileStore,
    HttpBackend, Notice, Origin, ProfileStore, SessionState, SessionStore, APOLOGY_REPLY,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Landing,
    Intake,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// How many ticks a toast stays on screen (~4s at 300ms).
const TOAST_TICKS: u8 = 14;

#[derive(Debug, Clone)]
pub struct Toast {
    pub notice: Notice,
    ticks_left: u8,
}

/// The five-question intake form
#[derive(Debug, Clone, Default)]
pub struct IntakeForm {
    pub values: [String; 5],
    pub focused: usize,
    pub error: Option<String>,
}

impl IntakeForm {
    pub const LABELS: [&'static str; 5] = [
        "What product or service do you offer?",
        "Who is your target customer?",
        "Which geographic market do you serve?",
        "What is your pricing strategy?",
        "What are your main customer channels?",
    ];

    pub fn from_profile(profile: &BusinessProfile) -> Self {
        let values = BusinessProfile::FIELD_KEYS
            .map(|key| profile.field(key).unwrap_or_default().to_string());
        Self { values, focused: 0, error: None }
    }

    pub fn to_profile(&self) -> BusinessProfile {
        let mut profile = BusinessProfile::default();
        for (key, value) in BusinessProfile::FIELD_KEYS.iter().zip(&self.values) {
            if let Some(field) = profile.field_mut(key) {
                *field = value.trim().to_string();
            }
        }
        profile
    }

    pub fn focused_value_mut(&mut self) -> &mut String {
        &mut self.values[self.focused]
    }

    pub fn is_last_field(&self) -> bool {
        self.focused + 1 == self.values.len()
    }

    pub fn next_field(&mut self) {
        self.focused = (self.focused + 1) % self.values.len();
    }

    pub fn prev_field(&mut self) {
        self.focused = (self.focused + self.values.len() - 1) % self.values.len();
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub session: SessionState,

    // Collaborators
    client: ExchangeClient,
    durable: Box<dyn ProfileStore>,
    session_store: SessionStore,
    export_dir: PathBuf,

    // Intake form state
    pub form: IntakeForm,

    // Chat state
    pub input_cursor: usize,
    pub selected_message: Option<usize>,
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub follow_bottom: bool,
    pub chat_area: Option<Rect>,
    clipboard: Option<Clipboard>,
    exchange_task: Option<JoinHandle<(Exchange, FallbackMode)>>,
    health_task: Option<JoinHandle<(Option<Notice>, FallbackMode)>>,

    // Animation and notifications
    pub animation_frame: u8,
    pub toasts: Vec<Toast>,
}

impl App {
    pub fn new(config: &Config, reset_profile: bool) -> Result<Self> {
        let backend = HttpBackend::new(&config.backend_url, config.request_timeout())?;
        let client = ExchangeClient::new(Arc::new(backend), config.rng_seed);

        let durable = FileStore::default_location()?;
        if reset_profile {
            durable.clear()?;
            info!("cleared saved business profile");
        }
        let export_dir = durable
            .path()
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut app = Self::with_parts(client, Box::new(durable), export_dir);
        app.start(config);
        Ok(app)
    }

    pub fn with_parts(
        client: ExchangeClient,
        durable: Box<dyn ProfileStore>,
        export_dir: PathBuf,
    ) -> Self {
        Self {
            should_quit: false,
            screen: Screen::Landing,
            input_mode: InputMode::Normal,
            session: SessionState::new(),

            client,
            durable,
            session_store: SessionStore::new(),
            export_dir,

            form: IntakeForm::default(),

            input_cursor: 0,
            selected_message: None,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            follow_bottom: true,
            chat_area: None,
            clipboard: None,
            exchange_task: None,
            health_task: None,

            animation_frame: 0,
            toasts: Vec::new(),
        }
    }

    /// Session start: adopt a saved profile and kick off the health probe.
    pub fn start(&mut self, config: &Config) {
        if config.force_fallback {
            self.session.engage_fallback();
        }

        let restored = self.session.load_persisted_profile(&self.session_store)
            || self.session.load_persisted_profile(self.durable.as_ref());
        if restored {
            if let Err(e) = self.session_store.save(self.session.profile()) {
                warn!(error = %e, "could not mirror profile into session storage");
            }
            self.open_chat();
        }

        if config.health_probe && !self.session.fallback_mode().is_engaged() {
            let client = self.client.clone();
            let mut fallback = self.session.fallback_mode();
            self.health_task = Some(tokio::spawn(async move {
                let notice = client.probe_health(&mut fallback).await;
                (notice, fallback)
            }));
        }
    }

    fn open_chat(&mut self) {
        if self.session.messages().is_empty() {
            self.session.post_welcome();
        }
        self.screen = Screen::Chat;
        self.input_mode = InputMode::Editing;
        self.input_cursor = self.session.pending_input().chars().count();
        self.follow_bottom = true;
    }

    /// Landing page "get started"
    pub fn get_started(&mut self) {
        if self.session.is_profile_submitted() {
            self.open_chat();
        } else {
            self.screen = Screen::Intake;
        }
    }

    pub fn edit_profile(&mut self) {
        self.form = IntakeForm::from_profile(self.session.profile());
        self.screen = Screen::Intake;
    }

    /// Validate the form and store the profile in both tiers.
    pub fn submit_form(&mut self) -> bool {
        let profile = self.form.to_profile();
        if !profile.is_complete() {
            self.form.error = Some("Please answer every question before continuing.".to_string());
            return false;
        }
        self.form.error = None;

        let updating = self.session.is_profile_submitted();
        let stores: [&dyn ProfileStore; 2] = [self.durable.as_ref(), &self.session_store];
        if let Err(e) = self.session.set_business_profile(profile, &stores) {
            error!(error = %e, "failed to persist business profile");
            self.push_toast(Notice::error("Could not save your business details."));
        } else if updating {
            self.push_toast(Notice::info("Business details updated."));
        }

        self.open_chat();
        true
    }

    pub fn is_waiting(&self) -> bool {
        self.exchange_task.is_some() || self.session.is_in_flight()
    }

    /// Send the pending input. Refused while a reply is outstanding.
    pub fn send_message(&mut self) -> bool {
        if self.is_waiting() {
            self.push_toast(Notice::info("Please wait for the current reply."));
            return false;
        }
        let input = self.session.pending_input().to_string();
        if self.session.append_user_message(&input).is_none() {
            return false;
        }
        self.input_cursor = 0;
        self.selected_message = None;
        self.follow_bottom = true;

        let text = self
            .session
            .messages()
            .last()
            .map(|m| m.text().to_string())
            .unwrap_or_default();
        let history = self.session.history_before_last();
        let profile = self.session.profile().clone();
        let mut fallback = self.session.fallback_mode();
        let client = self.client.clone();

        self.exchange_task = Some(tokio::spawn(async move {
            let exchange = client.send(&text, history, &profile, &mut fallback).await;
            (exchange, fallback)
        }));
        true
    }

    /// Collect finished background work. Called once per loop iteration.
    pub async fn poll_tasks(&mut self) {
        if self.health_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.health_task.take() {
                match task.await {
                    Ok((notice, fallback)) => {
                        self.session.merge_fallback(fallback);
                        if let Some(notice) = notice {
                            self.push_toast(notice);
                        }
                    }
                    Err(e) => warn!(error = %e, "health probe task failed"),
                }
            }
        }

        if self.exchange_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.exchange_task.take() {
                self.finish_exchange(task.await.map_err(|e| e.to_string()));
            }
        }
    }

    /// Wait for any outstanding reply. Only tests need to block like this.
    #[cfg(test)]
    pub async fn wait_for_reply(&mut self) {
        if let Some(task) = self.exchange_task.take() {
            self.finish_exchange(task.await.map_err(|e| e.to_string()));
        }
    }

    fn finish_exchange(&mut self, outcome: std::result::Result<(Exchange, FallbackMode), String>) {
        match outcome {
            Ok((exchange, fallback)) => {
                self.session.merge_fallback(fallback);
                self.session.append_assistant_message(exchange.reply);
                if let Some(notice) = exchange.notice {
                    self.push_toast(notice);
                }
            }
            Err(e) => {
                error!(error = %e, "exchange task failed");
                self.session.append_assistant_message(APOLOGY_REPLY);
                self.push_toast(Notice::error("Something went wrong. Please try again."));
            }
        }
        self.follow_bottom = true;
    }

    pub fn push_toast(&mut self, notice: Notice) {
        self.toasts.push(Toast { notice, ticks_left: TOAST_TICKS });
    }

    pub fn tick(&mut self) {
        if self.is_waiting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        for toast in &mut self.toasts {
            toast.ticks_left = toast.ticks_left.saturating_sub(1);
        }
        self.toasts.retain(|t| t.ticks_left > 0);
    }

    pub fn select_prev_message(&mut self) {
        let len = self.session.messages().len();
        if len == 0 {
            return;
        }
        self.selected_message = Some(match self.selected_message {
            Some(i) => i.saturating_sub(1),
            None => len - 1,
        });
    }

    pub fn select_next_message(&mut self) {
        let len = self.session.messages().len();
        if let Some(i) = self.selected_message {
            self.selected_message = if i + 1 < len { Some(i + 1) } else { None };
        }
    }

    /// Raw text to copy: the selected message, or the latest reply. Only
    /// assistant messages can be copied.
    pub fn copy_target(&self) -> Option<&str> {
        let messages = self.session.messages();
        let message = match self.selected_message {
            Some(i) => messages.get(i)?,
            None => messages.iter().rev().find(|m| m.origin() == Origin::Assistant)?,
        };
        (message.origin() == Origin::Assistant).then(|| message.text())
    }

    /// Put the copy target on the system clipboard. `Ok(false)` means there
    /// was nothing to copy.
    pub fn copy_to_clipboard(&mut self) -> Result<bool> {
        let Some(text) = self.copy_target().map(str::to_string) else {
            return Ok(false);
        };
        // Held open for the session; on X11 the text lives as long as the handle.
        if self.clipboard.is_none() {
            self.clipboard = Some(Clipboard::new()?);
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            clipboard.set_text(text)?;
        }
        Ok(true)
    }

    pub fn export_transcript(&self) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.export_dir)?;
        let path = self.export_dir.join("transcript.html");
        std::fs::write(&path, render_transcript(self.session.messages()))?;
        info!(path = %path.display(), "exported transcript");
        Ok(path)
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_bottom = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    /// Session end: the session tier does not outlive the process.
    pub fn shutdown(&mut self) {
        if let Err(e) = self.session_store.clear() {
            warn!(error = %e, "could not clear session storage");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use bizchat_core::fallback::{fill_template, TEMPLATES};
    use bizchat_core::{ChatBackend, ChatRequest, ExchangeError};
    use tempfile::TempDir;

    /// Backend that is always down
    pub(crate) struct Unreachable;

    #[async_trait::async_trait]
    impl ChatBackend for Unreachable {
        async fn chat(&self, _request: &ChatRequest) -> std::result::Result<String, ExchangeError> {
            Err(ExchangeError::Malformed("offline".into()))
        }

        async fn health(&self) -> std::result::Result<(), ExchangeError> {
            Err(ExchangeError::Malformed("offline".into()))
        }
    }

    pub(crate) fn profile() -> BusinessProfile {
        BusinessProfile {
            product: "coffee".into(),
            target_customer: "students".into(),
            geographic_market: "local".into(),
            pricing_strategy: "low-cost".into(),
            main_channels: "social media".into(),
        }
    }

    pub(crate) fn test_app(dir: &TempDir) -> App {
        let client = ExchangeClient::new(Arc::new(Unreachable), Some(1));
        App::with_parts(
            client,
            Box::new(FileStore::new(dir.path())),
            dir.path().to_path_buf(),
        )
    }

    fn fill_form(app: &mut App) {
        app.form = IntakeForm::from_profile(&profile());
    }

    #[tokio::test]
    async fn test_submit_form_requires_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.screen = Screen::Intake;
        app.form.values[0] = "coffee".into();

        assert!(!app.submit_form());
        assert!(app.form.error.is_some());
        assert_eq!(app.screen, Screen::Intake);
        assert!(!app.session.is_profile_submitted());
    }

    #[tokio::test]
    async fn test_submit_form_persists_and_welcomes() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        fill_form(&mut app);

        assert!(app.submit_form());
        assert_eq!(app.screen, Screen::Chat);
        assert_eq!(app.session.messages().len(), 1);
        assert!(app.session.welcome_id().is_some());

        let saved = FileStore::new(dir.path()).load().unwrap();
        assert_eq!(saved, Some(profile()));
    }

    #[tokio::test]
    async fn test_saved_profile_skips_intake() {
        let dir = tempfile::tempdir().unwrap();
        FileStore::new(dir.path()).save(&profile()).unwrap();

        let mut app = test_app(&dir);
        let mut config = Config::new();
        config.health_probe = false;
        app.start(&config);

        assert_eq!(app.screen, Screen::Chat);
        assert_eq!(app.session.profile(), &profile());
    }

    #[tokio::test]
    async fn test_send_blocked_while_waiting() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        fill_form(&mut app);
        app.submit_form();

        app.session.set_input("first");
        assert!(app.send_message());
        app.session.set_input("second");
        assert!(!app.send_message());
        // typing is still allowed while waiting
        assert_eq!(app.session.pending_input(), "second");

        app.wait_for_reply().await;
        assert!(!app.is_waiting());
        assert_eq!(app.session.messages().len(), 3);
    }

    #[tokio::test]
    async fn test_blank_send_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        fill_form(&mut app);
        app.submit_form();

        app.session.set_input("   ");
        assert!(!app.send_message());
        assert_eq!(app.session.messages().len(), 1);
        assert!(!app.is_waiting());
    }

    #[tokio::test]
    async fn test_offline_reply_uses_template_and_toasts() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        fill_form(&mut app);
        app.submit_form();

        app.session.set_input("hi");
        app.send_message();
        app.wait_for_reply().await;

        assert!(app.session.fallback_mode().is_engaged());
        let reply = app.session.messages().last().unwrap().text().to_string();
        assert!(TEMPLATES.iter().any(|t| fill_template(t, &profile()) == reply));
        assert_eq!(app.toasts.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_task_appends_apology() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        fill_form(&mut app);
        app.submit_form();
        app.session.append_user_message("hi");

        app.finish_exchange(Err("task panicked".into()));

        assert_eq!(app.session.messages().last().unwrap().text(), APOLOGY_REPLY);
        assert!(!app.session.is_in_flight());
    }

    #[tokio::test]
    async fn test_copy_target_only_assistant() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        fill_form(&mut app);
        app.submit_form();
        app.session.append_user_message("mine");

        app.selected_message = Some(1);
        assert!(app.copy_target().is_none());

        app.selected_message = None;
        let welcome = app.session.messages()[0].text().to_string();
        assert_eq!(app.copy_target(), Some(welcome.as_str()));
    }

    #[tokio::test]
    async fn test_copy_without_assistant_message_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.session.append_user_message("mine");
        app.selected_message = Some(0);

        assert!(!app.copy_to_clipboard().unwrap());
        assert!(app.clipboard.is_none());
    }

    #[tokio::test]
    async fn test_toasts_expire() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.push_toast(Notice::info("hello"));
        for _ in 0..TOAST_TICKS {
            app.tick();
        }
        assert!(app.toasts.is_empty());
    }

    #[tokio::test]
    async fn test_export_transcript_writes_html() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        fill_form(&mut app);
        app.submit_form();

        let path = app.export_transcript().unwrap();
        let html = std::fs::read_to_string(path).unwrap();
        assert!(html.contains("chat-bubble-bot"));
    }
}
