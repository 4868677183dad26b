//! View state of the bookmark screen and its transition function.
//!
//! [`ViewState::apply`] is the only place state changes. It performs no I/O:
//! anything that has to reach a collaborator is returned as a [`Command`],
//! and every collaborator result comes back in as an [`Event`]. Results are
//! tagged with the identity that was current when the call was issued, so a
//! response that outlives its session is dropped instead of applied.

use serde::Serialize;

use crate::types::bookmark::{Bookmark, BookmarkFields, BookmarkId, NewBookmark};
use crate::types::errors::{AuthError, RemoteError, SyncError, ValidationError};
use crate::types::session::{AuthProvider, UserId};
use crate::types::view::{FormDraft, Panel};

pub const MSG_MISSING_FIELDS: &str = "Please fill all fields";
pub const MSG_NOT_SIGNED_IN: &str = "Sign in to save bookmarks";
pub const MSG_SAVE_FAILED: &str = "Failed to save bookmark";
pub const MSG_UPDATE_FAILED: &str = "Failed to update bookmark";
pub const MSG_DELETE_FAILED: &str = "Delete failed";
pub const MSG_REFRESH_FAILED: &str = "Could not refresh bookmarks";
pub const MSG_AUTH_FAILED: &str = "Authentication failed";

/// Something that happened: user input, a notification, or a finished call.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Started,
    /// Result of the one-time current-session lookup.
    SessionResolved(Result<Option<UserId>, AuthError>),
    /// Pushed by the auth service on every session change.
    SessionChanged(Option<UserId>),
    /// A remote mutation on `owner`'s rows.
    ChangeNotified { owner: UserId },
    /// The debounce window after a change notification has elapsed.
    RefetchDue { owner: UserId },
    RefetchRequested,
    FetchCompleted {
        owner: UserId,
        seq: u64,
        result: Result<Vec<Bookmark>, RemoteError>,
    },
    TitleEdited(String),
    UrlEdited(String),
    SaveRequested,
    InsertCompleted {
        owner: UserId,
        result: Result<Bookmark, RemoteError>,
    },
    UpdateCompleted {
        owner: UserId,
        id: BookmarkId,
        fields: BookmarkFields,
        result: Result<(), RemoteError>,
    },
    DeleteRequested(BookmarkId),
    DeleteCompleted {
        owner: UserId,
        id: BookmarkId,
        result: Result<(), RemoteError>,
    },
    EditRequested(Bookmark),
    PanelSelected(Panel),
    EditCancelled,
    SignInRequested(AuthProvider),
    SignOutRequested,
    AuthCompleted(Result<(), AuthError>),
    NoticeDismissed,
    TornDown,
}

/// A side effect the controller must carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ResolveSession,
    ListenForSessionChanges,
    ReleaseSessionListener,
    OpenChannel { owner: UserId },
    CloseChannel,
    Fetch { owner: UserId, seq: u64 },
    ScheduleRefetch { owner: UserId },
    Insert { owner: UserId, record: NewBookmark },
    Update { owner: UserId, id: BookmarkId, fields: BookmarkFields },
    Delete { owner: UserId, id: BookmarkId },
    SignIn(AuthProvider),
    SignOut,
    /// Blocking, user-visible alert.
    Alert(String),
    /// Failure to log; carries no user-facing effect of its own.
    Report(SyncError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    #[default]
    Idle,
    Running,
    TornDown,
}

/// Everything the bookmark screen shows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ViewState {
    pub lifecycle: Lifecycle,
    pub session: Option<UserId>,
    /// Newest first. A cache of the store, possibly stale.
    pub bookmarks: Vec<Bookmark>,
    pub draft: FormDraft,
    pub panel: Panel,
    /// Transient, non-blocking message.
    pub notice: Option<String>,
    #[serde(skip)]
    session_notified: bool,
    #[serde(skip)]
    refetch_pending: bool,
    #[serde(skip)]
    last_fetch_seq: u64,
    #[serde(skip)]
    applied_fetch_seq: u64,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// True while a debounced refetch is waiting to fire.
    pub fn refetch_pending(&self) -> bool {
        self.refetch_pending
    }

    pub fn find(&self, id: BookmarkId) -> Option<&Bookmark> {
        self.bookmarks.iter().find(|b| b.id == id)
    }

    fn is_current(&self, owner: &UserId) -> bool {
        self.session.as_ref() == Some(owner)
    }

    fn fetch(&mut self, owner: UserId) -> Command {
        self.last_fetch_seq += 1;
        Command::Fetch {
            owner,
            seq: self.last_fetch_seq,
        }
    }

    /// Applies one event and returns the commands it calls for.
    pub fn apply(&mut self, event: Event) -> Vec<Command> {
        if self.lifecycle == Lifecycle::TornDown {
            return Vec::new();
        }

        match event {
            Event::Started => {
                if self.lifecycle != Lifecycle::Idle {
                    return Vec::new();
                }
                self.lifecycle = Lifecycle::Running;
                vec![Command::ResolveSession, Command::ListenForSessionChanges]
            }
            Event::SessionResolved(Ok(user)) => {
                // A pushed notification is newer than the lookup.
                if self.session_notified {
                    return Vec::new();
                }
                self.set_session(user)
            }
            Event::SessionResolved(Err(err)) | Event::AuthCompleted(Err(err)) => {
                self.notice = Some(MSG_AUTH_FAILED.to_string());
                vec![Command::Report(SyncError::Auth(err))]
            }
            Event::SessionChanged(user) => {
                self.session_notified = true;
                self.set_session(user)
            }
            Event::ChangeNotified { owner } => {
                if !self.is_current(&owner) || self.refetch_pending {
                    return Vec::new();
                }
                self.refetch_pending = true;
                vec![Command::ScheduleRefetch { owner }]
            }
            Event::RefetchDue { owner } => {
                if !self.is_current(&owner) {
                    return Vec::new();
                }
                self.refetch_pending = false;
                vec![self.fetch(owner)]
            }
            Event::RefetchRequested => match self.session.clone() {
                Some(owner) => vec![self.fetch(owner)],
                None => Vec::new(),
            },
            Event::FetchCompleted { owner, seq, result } => {
                if !self.is_current(&owner) || seq <= self.applied_fetch_seq {
                    return Vec::new();
                }
                self.applied_fetch_seq = seq;
                match result {
                    Ok(bookmarks) => {
                        self.bookmarks = bookmarks;
                        Vec::new()
                    }
                    Err(err) => {
                        self.notice = Some(MSG_REFRESH_FAILED.to_string());
                        vec![Command::Report(SyncError::RemoteRead(err))]
                    }
                }
            }
            Event::TitleEdited(title) => {
                self.draft.title = title;
                Vec::new()
            }
            Event::UrlEdited(url) => {
                self.draft.url = url;
                Vec::new()
            }
            Event::SaveRequested => self.save(),
            Event::InsertCompleted { owner, result } => {
                if !self.is_current(&owner) {
                    return Vec::new();
                }
                match result {
                    Ok(record) => {
                        match self.bookmarks.iter().position(|b| b.id == record.id) {
                            Some(index) => self.bookmarks[index] = record,
                            None => self.bookmarks.insert(0, record),
                        }
                        self.finish_save();
                        Vec::new()
                    }
                    Err(err) => {
                        self.draft.error = Some(MSG_SAVE_FAILED.to_string());
                        vec![Command::Report(SyncError::RemoteWrite(err))]
                    }
                }
            }
            Event::UpdateCompleted {
                owner,
                id,
                fields,
                result,
            } => {
                if !self.is_current(&owner) {
                    return Vec::new();
                }
                match result {
                    Ok(()) => {
                        if let Some(record) = self.bookmarks.iter_mut().find(|b| b.id == id) {
                            record.title = fields.title;
                            record.url = fields.url;
                        }
                        self.finish_save();
                        Vec::new()
                    }
                    Err(err) => {
                        self.draft.error = Some(MSG_UPDATE_FAILED.to_string());
                        vec![Command::Report(SyncError::RemoteWrite(err))]
                    }
                }
            }
            Event::DeleteRequested(id) => {
                let Some(owner) = self.session.clone() else {
                    return Vec::new();
                };
                self.bookmarks.retain(|b| b.id != id);
                vec![Command::Delete { owner, id }]
            }
            Event::DeleteCompleted { owner, id: _, result } => {
                if !self.is_current(&owner) {
                    return Vec::new();
                }
                match result {
                    Ok(()) => Vec::new(),
                    Err(err) => vec![
                        Command::Report(SyncError::RemoteWrite(err)),
                        Command::Alert(MSG_DELETE_FAILED.to_string()),
                        self.fetch(owner),
                    ],
                }
            }
            Event::EditRequested(record) => {
                self.draft.title = record.title.clone();
                self.draft.url = record.url.clone();
                self.draft.error = None;
                self.draft.editing = Some(record);
                self.panel = Panel::Add;
                Vec::new()
            }
            Event::PanelSelected(panel) => {
                self.select_panel(panel);
                Vec::new()
            }
            Event::EditCancelled => {
                self.draft.clear_input();
                self.draft.error = None;
                self.panel = Panel::List;
                Vec::new()
            }
            Event::SignInRequested(provider) => vec![Command::SignIn(provider)],
            Event::SignOutRequested => vec![Command::SignOut],
            Event::AuthCompleted(Ok(())) => Vec::new(),
            Event::NoticeDismissed => {
                self.notice = None;
                Vec::new()
            }
            Event::TornDown => {
                self.lifecycle = Lifecycle::TornDown;
                vec![Command::CloseChannel, Command::ReleaseSessionListener]
            }
        }
    }

    fn save(&mut self) -> Vec<Command> {
        self.draft.error = None;

        let Some(owner) = self.session.clone() else {
            self.draft.error = Some(MSG_NOT_SIGNED_IN.to_string());
            return vec![Command::Report(ValidationError::NotSignedIn.into())];
        };

        let fields = self.draft.fields();
        if !fields.is_complete() {
            self.draft.error = Some(MSG_MISSING_FIELDS.to_string());
            return vec![Command::Report(ValidationError::MissingFields.into())];
        }

        match &self.draft.editing {
            Some(target) => vec![Command::Update {
                owner,
                id: target.id,
                fields,
            }],
            None => vec![Command::Insert {
                record: NewBookmark::new(fields, owner.clone()),
                owner,
            }],
        }
    }

    fn finish_save(&mut self) {
        self.draft.clear_input();
        self.draft.error = None;
        self.panel = Panel::List;
    }

    /// Switching panels in either direction discards the form.
    fn select_panel(&mut self, panel: Panel) {
        if self.panel != panel {
            self.draft.clear_input();
            self.draft.error = None;
        }
        self.panel = panel;
    }

    /// Moves to a new identity (or none). Leaving an identity drops
    /// everything cached for it.
    fn set_session(&mut self, next: Option<UserId>) -> Vec<Command> {
        if self.session == next {
            return Vec::new();
        }

        let mut commands = Vec::new();
        if self.session.take().is_some() {
            commands.push(Command::CloseChannel);
            self.bookmarks.clear();
            self.draft = FormDraft::default();
            self.panel = Panel::Add;
            self.notice = None;
            self.refetch_pending = false;
        }

        if let Some(owner) = next {
            self.session = Some(owner.clone());
            commands.push(Command::OpenChannel {
                owner: owner.clone(),
            });
            commands.push(self.fetch(owner));
        }
        commands
    }
}
