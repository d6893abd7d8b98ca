//! Runs the commands [`transition`] asks for and feeds the results back in.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::api::models::connection::ConnectionStatus;
use crate::api::models::links::PortalLinks;
use crate::api::models::resources::Resource;
use crate::ui::render::{View, render};
use crate::ui::state::{Command, Event, Failure, Session, transition};

/// The server calls a dashboard needs.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn check_connection(&self) -> Result<ConnectionStatus, Failure>;

    async fn list_resources(&self) -> Result<Vec<Resource>, Failure>;
}

/// Owns a [`Session`] and processes events one at a time.
///
/// `dispatch` takes `&mut self`, so a command's result is always applied before the
/// next user event is looked at.
pub struct Driver<B: Backend> {
    backend: B,
    session: Session,
    links: PortalLinks,
}

impl<B: Backend> Driver<B> {
    pub fn new(backend: B, links: PortalLinks) -> Self {
        Self {
            backend,
            session: Session::default(),
            links,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn set_links(&mut self, links: PortalLinks) {
        self.links = links;
    }

    pub fn view(&self) -> View {
        render(&self.session, &self.links)
    }

    /// Apply `event`, then run any command it produces until the session settles.
    pub async fn dispatch(&mut self, event: Event) {
        let mut next = Some(event);
        while let Some(event) = next.take() {
            let (session, command) = transition(std::mem::take(&mut self.session), event);
            self.session = session;
            if let Some(command) = command {
                next = Some(self.run(command).await);
            }
        }
    }

    async fn run(&self, command: Command) -> Event {
        debug!(?command, "Running command");
        match command {
            Command::CheckConnection => {
                let outcome = self.backend.check_connection().await;
                if let Err(failure) = &outcome {
                    warn!("API connection check failed: {}", failure.cause);
                }
                Event::HealthChecked(outcome)
            }
            Command::LoadRecords => {
                let outcome = self.backend.list_resources().await;
                if let Err(failure) = &outcome {
                    warn!("Error fetching records: {}", failure.cause);
                }
                Event::RecordsLoaded(outcome)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::state::{RecordKey, ViewState};
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted backend: pops one response per call and counts calls.
    #[derive(Default)]
    struct MockBackend {
        health: Mutex<Vec<Result<ConnectionStatus, Failure>>>,
        loads: Mutex<Vec<Result<Vec<Resource>, Failure>>>,
        health_calls: AtomicUsize,
        load_calls: AtomicUsize,
    }

    impl MockBackend {
        fn new(health: Vec<Result<ConnectionStatus, Failure>>, loads: Vec<Result<Vec<Resource>, Failure>>) -> Self {
            Self {
                health: Mutex::new(health.into_iter().rev().collect()),
                loads: Mutex::new(loads.into_iter().rev().collect()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl Backend for MockBackend {
        async fn check_connection(&self) -> Result<ConnectionStatus, Failure> {
            self.health_calls.fetch_add(1, Ordering::SeqCst);
            self.health.lock().unwrap().pop().expect("unexpected health check")
        }

        async fn list_resources(&self) -> Result<Vec<Resource>, Failure> {
            self.load_calls.fetch_add(1, Ordering::SeqCst);
            self.loads.lock().unwrap().pop().expect("unexpected load")
        }
    }

    fn rows() -> Vec<Resource> {
        vec![
            serde_json::from_value(json!({"Name": "Agu"})).unwrap(),
            serde_json::from_value(json!({"Name": "Elis"})).unwrap(),
        ]
    }

    #[tokio::test]
    async fn test_mount_then_load() {
        let backend = MockBackend::new(vec![Ok(ConnectionStatus::connected())], vec![Ok(rows())]);
        let mut driver = Driver::new(backend, PortalLinks::default());

        driver.dispatch(Event::Mounted).await;
        assert_eq!(driver.session().view_state(), ViewState::ReadyEmpty);

        driver.dispatch(Event::LoadRequested).await;
        assert_eq!(driver.session().view_state(), ViewState::ReadyWithData);
        assert_eq!(driver.backend.load_calls.load(Ordering::SeqCst), 1);

        driver.dispatch(Event::RecordSelected(RecordKey(1))).await;
        assert_eq!(driver.session().expanded, Some(RecordKey(1)));
    }

    #[tokio::test]
    async fn test_failure_then_retry_recovers() {
        let backend = MockBackend::new(
            vec![
                Err(Failure::new(Some("Database connection failed".to_string()), "HTTP 500")),
                Ok(ConnectionStatus::connected()),
            ],
            vec![],
        );
        let mut driver = Driver::new(backend, PortalLinks::default());

        driver.dispatch(Event::Mounted).await;
        assert_eq!(driver.session().view_state(), ViewState::Error);
        assert_eq!(driver.session().error.as_deref(), Some("Database connection failed"));

        driver.dispatch(Event::RetryRequested).await;
        assert_eq!(driver.session().view_state(), ViewState::ReadyEmpty);
        assert_eq!(driver.backend.health_calls.load(Ordering::SeqCst), 2);
        // Retry never loads on its own
        assert_eq!(driver.backend.load_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_events_without_commands_do_not_call_backend() {
        let backend = MockBackend::new(vec![], vec![]);
        let mut driver = Driver::new(backend, PortalLinks::default());

        driver.dispatch(Event::SearchChanged("ag".to_string())).await;
        driver.dispatch(Event::LoadRequested).await;

        assert_eq!(driver.backend.health_calls.load(Ordering::SeqCst), 0);
        assert_eq!(driver.backend.load_calls.load(Ordering::SeqCst), 0);
        assert!(driver.view().to_string().contains("Checking API connection..."));
    }
}
