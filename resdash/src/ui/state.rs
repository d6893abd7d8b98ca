//! Dashboard session state and its transition function.
//!
//! ```text
//!            Mounted / RetryRequested
//!   ┌──────────────────────┐
//!   ↓                      │
//! checking ──failure──▶ error ◀──load failure──┐
//!   │ connected                                │
//!   ↓                                          │
//! ready-empty ──LoadRequested──▶ (loading) ────┤
//!   ↑ empty result                  │ rows     │
//!   └───────────────────────────────┤          │
//!                                   ↓          │
//!                           ready-with-data ───┘ (LoadRequested reloads)
//! ```
//!
//! [`transition`] is pure: it never performs I/O. Side effects are requested through the
//! returned [`Command`] and their results come back as events.

use crate::api::models::connection::ConnectionStatus;
use crate::api::models::resources::Resource;

pub const DATABASE_ISSUE_MESSAGE: &str = "API reported database connection issue.";
pub const UNREACHABLE_MESSAGE: &str = "Failed to reach API. Ensure backend is deployed and running.";
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load users from API.";

/// Position of a record in the loaded list. Unique even when names repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiStatus {
    #[default]
    Checking,
    Connected,
    Error,
}

/// A failed backend call, as the view needs to know it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// The `error` field of the server's response body, when there was one
    pub server_message: Option<String>,
    /// Full description for logs
    pub cause: String,
}

impl Failure {
    pub fn new(server_message: Option<String>, cause: impl Into<String>) -> Self {
        Self {
            server_message,
            cause: cause.into(),
        }
    }

    /// The server's message, or `fallback` if it sent none.
    fn message_or(&self, fallback: &str) -> String {
        self.server_message.clone().unwrap_or_else(|| fallback.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Session {
    pub status: ApiStatus,
    pub records: Vec<Resource>,
    pub loading: bool,
    /// Set once a load has completed successfully
    pub loaded: bool,
    pub error: Option<String>,
    pub search: String,
    pub expanded: Option<RecordKey>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Mounted,
    HealthChecked(Result<ConnectionStatus, Failure>),
    LoadRequested,
    RecordsLoaded(Result<Vec<Resource>, Failure>),
    RetryRequested,
    SearchChanged(String),
    RecordSelected(RecordKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    CheckConnection,
    LoadRecords,
}

/// What the dashboard shows, derived from a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Checking,
    Error,
    ReadyEmpty,
    ReadyWithData,
}

impl Session {
    pub fn view_state(&self) -> ViewState {
        match self.status {
            ApiStatus::Checking => ViewState::Checking,
            ApiStatus::Error => ViewState::Error,
            ApiStatus::Connected if self.records.is_empty() => ViewState::ReadyEmpty,
            ApiStatus::Connected => ViewState::ReadyWithData,
        }
    }

    fn begin_check(self) -> Self {
        Session {
            status: ApiStatus::Checking,
            search: self.search,
            ..Session::default()
        }
    }

    fn fail(mut self, message: String) -> Self {
        self.status = ApiStatus::Error;
        self.error = Some(message);
        self.loading = false;
        self.records.clear();
        self.expanded = None;
        self
    }
}

/// Apply `event` to `session`, returning the next session and the side effect to run, if any.
///
/// Results that arrive when nothing is waiting for them (a health result outside
/// `checking`, records while not loading) leave the session unchanged.
pub fn transition(session: Session, event: Event) -> (Session, Option<Command>) {
    match event {
        Event::Mounted => (Session::default(), Some(Command::CheckConnection)),

        Event::HealthChecked(outcome) => {
            if session.status != ApiStatus::Checking {
                return (session, None);
            }
            let next = match outcome {
                Ok(status) if status.connected => Session {
                    status: ApiStatus::Connected,
                    error: None,
                    ..session
                },
                Ok(_) => session.fail(DATABASE_ISSUE_MESSAGE.to_string()),
                Err(failure) => session.fail(failure.message_or(UNREACHABLE_MESSAGE)),
            };
            (next, None)
        }

        Event::LoadRequested => {
            if session.status != ApiStatus::Connected || session.loading {
                return (session, None);
            }
            let next = Session {
                loading: true,
                loaded: false,
                error: None,
                records: Vec::new(),
                expanded: None,
                ..session
            };
            (next, Some(Command::LoadRecords))
        }

        Event::RecordsLoaded(outcome) => {
            if !session.loading {
                return (session, None);
            }
            let next = match outcome {
                Ok(records) => Session {
                    status: ApiStatus::Connected,
                    records,
                    loading: false,
                    loaded: true,
                    error: None,
                    expanded: None,
                    ..session
                },
                Err(failure) => session.fail(failure.message_or(LOAD_FAILED_MESSAGE)),
            };
            (next, None)
        }

        Event::RetryRequested => {
            if session.status != ApiStatus::Error {
                return (session, None);
            }
            (session.begin_check(), Some(Command::CheckConnection))
        }

        Event::SearchChanged(search) => (Session { search, ..session }, None),

        Event::RecordSelected(key) => {
            if session.view_state() != ViewState::ReadyWithData || key.0 >= session.records.len() {
                return (session, None);
            }
            let expanded = if session.expanded == Some(key) { None } else { Some(key) };
            (Session { expanded, ..session }, None)
        }
    }
}
