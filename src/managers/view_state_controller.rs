//! Runtime around [`ViewState`].
//!
//! The controller executes the commands the reducer returns: remote calls
//! run as spawned tokio tasks and post their result back as an event, and
//! collaborator callbacks (session changes, change notifications) post into
//! the same inbox. State is only touched from `dispatch`, on the caller's
//! task, so no locking is involved.
//!
//! Must be driven from within a tokio runtime.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::managers::view_state::{Command, Event, ViewState};
use crate::services::auth::{AuthService, SessionCallback, SessionSubscription};
use crate::services::change_feed::{ChangeCallback, ChangeFeed, ChannelHandle};
use crate::services::data_store::DataStore;
use crate::services::notifier::Notifier;
use crate::types::bookmark::{Bookmark, BookmarkId, BookmarkQuery};
use crate::types::change::{ChangeEvent, ChangeFilter, EventMask};
use crate::types::errors::SyncError;
use crate::types::session::{AuthProvider, Session, UserId};
use crate::types::settings::SyncSettings;
use crate::types::view::Panel;

/// The external services the controller talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub auth: Arc<dyn AuthService>,
    pub store: Arc<dyn DataStore>,
    pub feed: Arc<dyn ChangeFeed>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerOptions {
    pub table: String,
    pub refetch_debounce: Duration,
}

impl ControllerOptions {
    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self {
            table: settings.backend.table.clone(),
            refetch_debounce: Duration::from_millis(settings.sync.refetch_debounce_ms),
        }
    }
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self::from_settings(&SyncSettings::default())
    }
}

enum Inbound {
    /// Collaborator callback.
    External(Event),
    /// Result of a spawned task.
    Completed(Event),
    /// A spawned task finished, with or without a result.
    TaskEnded,
}

/// Sends `TaskEnded` when dropped, so a panicking task still counts as done.
struct TaskGuard(UnboundedSender<Inbound>);

impl Drop for TaskGuard {
    fn drop(&mut self) {
        let _ = self.0.send(Inbound::TaskEnded);
    }
}

/// Owns the view state and every subscription made on its behalf.
pub struct ViewStateController {
    state: ViewState,
    collaborators: Collaborators,
    options: ControllerOptions,
    inbox_tx: UnboundedSender<Inbound>,
    inbox_rx: UnboundedReceiver<Inbound>,
    in_flight: usize,
    session_listener: Option<SessionSubscription>,
    channel: Option<ChannelHandle>,
}

impl ViewStateController {
    pub fn new(collaborators: Collaborators, options: ControllerOptions) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            state: ViewState::new(),
            collaborators,
            options,
            inbox_tx,
            inbox_rx,
            in_flight: 0,
            session_listener: None,
            channel: None,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Number of spawned tasks that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// True while a change channel is held.
    pub fn is_subscribed(&self) -> bool {
        self.channel.is_some()
    }

    // ─── Operations ───

    /// Looks up the current session once and starts listening for changes.
    pub fn initialize_session(&mut self) {
        self.dispatch(Event::Started);
    }

    pub fn refetch_bookmarks(&mut self) {
        self.dispatch(Event::RefetchRequested);
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.dispatch(Event::TitleEdited(title.into()));
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.dispatch(Event::UrlEdited(url.into()));
    }

    pub fn save(&mut self) {
        self.dispatch(Event::SaveRequested);
    }

    /// Removes the bookmark locally right away, then asks the store.
    pub fn delete(&mut self, id: BookmarkId) {
        self.dispatch(Event::DeleteRequested(id));
    }

    pub fn begin_edit(&mut self, record: Bookmark) {
        self.dispatch(Event::EditRequested(record));
    }

    pub fn switch_panel(&mut self, panel: Panel) {
        self.dispatch(Event::PanelSelected(panel));
    }

    pub fn cancel_edit(&mut self) {
        self.dispatch(Event::EditCancelled);
    }

    pub fn sign_in(&mut self, provider: AuthProvider) {
        self.dispatch(Event::SignInRequested(provider));
    }

    pub fn sign_out(&mut self) {
        self.dispatch(Event::SignOutRequested);
    }

    pub fn dismiss_notice(&mut self) {
        self.dispatch(Event::NoticeDismissed);
    }

    /// Releases the session listener and the change channel. Later events are ignored.
    pub fn teardown(&mut self) {
        self.dispatch(Event::TornDown);
        self.release_all();
    }

    // ─── Event loop ───

    /// Applies one event and carries out the resulting commands.
    pub fn dispatch(&mut self, event: Event) {
        tracing::trace!(?event, "dispatch");
        for command in self.state.apply(event) {
            self.execute(command);
        }
    }

    /// Waits for and handles one inbound message.
    pub async fn next(&mut self) {
        if let Some(inbound) = self.inbox_rx.recv().await {
            self.receive(inbound);
        }
    }

    /// Handles inbound messages until the inbox is empty and no task is outstanding.
    pub async fn settle(&mut self) {
        loop {
            while let Ok(inbound) = self.inbox_rx.try_recv() {
                self.receive(inbound);
            }
            if self.in_flight == 0 {
                break;
            }
            match self.inbox_rx.recv().await {
                Some(inbound) => self.receive(inbound),
                None => break,
            }
        }
    }

    fn receive(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::External(event) | Inbound::Completed(event) => self.dispatch(event),
            Inbound::TaskEnded => self.in_flight = self.in_flight.saturating_sub(1),
        }
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Event> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let guard = TaskGuard(tx.clone());
            let event = task.await;
            let _ = tx.send(Inbound::Completed(event));
            drop(guard);
        });
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::ResolveSession => {
                let auth = self.collaborators.auth.clone();
                self.spawn(async move {
                    let result = auth.current_session().await;
                    Event::SessionResolved(result.map(|session| session.map(|s| s.user_id)))
                });
            }
            Command::ListenForSessionChanges => self.listen_for_session_changes(),
            Command::ReleaseSessionListener => self.release_session_listener(),
            Command::OpenChannel { owner } => self.subscribe_to_changes(owner),
            Command::CloseChannel => self.close_channel(),
            Command::Fetch { owner, seq } => {
                let store = self.collaborators.store.clone();
                let table = self.options.table.clone();
                self.spawn(async move {
                    let result = store.query(&table, &BookmarkQuery::owned_by(owner.clone())).await;
                    Event::FetchCompleted { owner, seq, result }
                });
            }
            Command::ScheduleRefetch { owner } => {
                let delay = self.options.refetch_debounce;
                self.spawn(async move {
                    tokio::time::sleep(delay).await;
                    Event::RefetchDue { owner }
                });
            }
            Command::Insert { owner, record } => {
                let store = self.collaborators.store.clone();
                let table = self.options.table.clone();
                self.spawn(async move {
                    let result = store.insert(&table, record).await;
                    Event::InsertCompleted { owner, result }
                });
            }
            Command::Update { owner, id, fields } => {
                let store = self.collaborators.store.clone();
                let table = self.options.table.clone();
                self.spawn(async move {
                    let result = store.update(&table, id, fields.clone()).await;
                    Event::UpdateCompleted {
                        owner,
                        id,
                        fields,
                        result,
                    }
                });
            }
            Command::Delete { owner, id } => {
                let store = self.collaborators.store.clone();
                let table = self.options.table.clone();
                self.spawn(async move {
                    let result = store.delete(&table, id).await;
                    Event::DeleteCompleted { owner, id, result }
                });
            }
            Command::SignIn(provider) => {
                let auth = self.collaborators.auth.clone();
                self.spawn(async move { Event::AuthCompleted(auth.sign_in(provider).await) });
            }
            Command::SignOut => {
                let auth = self.collaborators.auth.clone();
                self.spawn(async move { Event::AuthCompleted(auth.sign_out().await) });
            }
            Command::Alert(message) => self.collaborators.notifier.alert(&message),
            Command::Report(error) => report(&error),
        }
    }

    // ─── Scoped subscriptions ───

    fn listen_for_session_changes(&mut self) {
        if self.session_listener.is_some() {
            return;
        }
        let tx = self.inbox_tx.clone();
        let callback: SessionCallback = Arc::new(move |session: Option<Session>| {
            let user = session.map(|s| s.user_id);
            let _ = tx.send(Inbound::External(Event::SessionChanged(user)));
        });
        self.session_listener = Some(self.collaborators.auth.on_session_change(callback));
    }

    fn release_session_listener(&mut self) {
        if let Some(handle) = self.session_listener.take() {
            self.collaborators.auth.unsubscribe(handle);
        }
    }

    /// Opens the one change channel for `owner`, closing any channel still held.
    fn subscribe_to_changes(&mut self, owner: UserId) {
        self.close_channel();

        let tx = self.inbox_tx.clone();
        let tag = owner.clone();
        let callback: ChangeCallback = Arc::new(move |_event: ChangeEvent| {
            let _ = tx.send(Inbound::External(Event::ChangeNotified { owner: tag.clone() }));
        });

        match self.collaborators.feed.subscribe(
            &self.options.table,
            ChangeFilter::owner(owner.clone()),
            EventMask::All,
            callback,
        ) {
            Ok(handle) => {
                tracing::debug!(%owner, "subscribed to bookmark changes");
                self.channel = Some(handle);
            }
            Err(err) => tracing::warn!(%owner, %err, "could not open change channel"),
        }
    }

    fn close_channel(&mut self) {
        if let Some(handle) = self.channel.take() {
            self.collaborators.feed.unsubscribe(handle);
        }
    }

    fn release_all(&mut self) {
        self.close_channel();
        self.release_session_listener();
    }
}

impl Drop for ViewStateController {
    fn drop(&mut self) {
        if self.channel.is_some() || self.session_listener.is_some() {
            tracing::debug!("controller dropped without teardown");
            self.release_all();
        }
    }
}

fn report(error: &SyncError) {
    match error {
        SyncError::Validation(_) => tracing::debug!(%error, "save blocked"),
        SyncError::RemoteWrite(_) => tracing::warn!(%error, "bookmark write rejected"),
        SyncError::RemoteRead(_) => tracing::warn!(%error, "bookmark refresh failed"),
        SyncError::Auth(_) => tracing::error!(%error, "auth request failed"),
    }
}
