//! Application state for the interactive dashboard shell.
//!
//! `App` sits between the command loop in `main.rs` and the library
//! components: it tracks which screen is active, holds the latest policy
//! view, and applies the client-side filters. While a refresh is in flight
//! the previous entry stays visible, so the shell can keep rendering stale
//! data as a placeholder until the fresh result lands.

use std::sync::Arc;

use tracing::info;

use crate::auth::SessionManager;
use crate::cache::{CacheEntry, CacheManager};
use crate::models::Policy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Policies,
}

/// What the policies screen currently shows.
#[derive(Default)]
pub struct PolicyView {
    pub entry: Option<CacheEntry<Vec<Policy>>>,
    pub loading: bool,
    pub error: Option<String>,
}

pub struct App {
    pub session: Arc<SessionManager>,
    pub cache: Arc<CacheManager>,
    pub screen: Screen,
    pub view: PolicyView,
    /// Server-side query scoping the fetched collection.
    pub query: Option<String>,
    /// Client-side text filter over the fetched collection.
    pub search: String,
    /// Client-side status filter; empty means all.
    pub status_filter: Vec<String>,
}

impl App {
    pub fn new(session: Arc<SessionManager>, cache: Arc<CacheManager>) -> Self {
        Self {
            session,
            cache,
            screen: Screen::Login,
            view: PolicyView::default(),
            query: None,
            search: String::new(),
            status_filter: Vec::new(),
        }
    }

    /// Startup bootstrap: ask the server whether a session already exists
    /// and pick the starting screen accordingly.
    pub async fn bootstrap(&mut self) {
        if self.session.verify_session().await {
            self.screen = Screen::Policies;
            self.refresh().await;
        } else {
            self.screen = Screen::Login;
        }
    }

    /// Log in; on success navigate to the policies screen (once) and load.
    pub async fn login(&mut self, username: &str, password: &str) -> bool {
        match self.session.login(username, password).await {
            Ok(()) => {
                self.screen = Screen::Policies;
                self.refresh().await;
                true
            }
            Err(_) => false,
        }
    }

    /// Log out, navigate back to the login screen, and drop the view.
    pub async fn logout(&mut self) {
        self.session.logout().await;
        self.screen = Screen::Login;
        self.view = PolicyView::default();
        self.search.clear();
        self.status_filter.clear();
        info!("returned to login screen");
    }

    /// Fetch the collection for the current query. The previous entry stays
    /// in place while the fetch runs and on failure, so the shell can keep
    /// showing it alongside the error. A refresh refused for lack of a
    /// session sends the user back to the login screen.
    pub async fn refresh(&mut self) {
        self.view.loading = true;
        self.view.error = None;

        match self.cache.get(self.query.as_deref()).await {
            Ok(entry) => {
                self.view.entry = Some(entry);
            }
            Err(err) => {
                if err.is_auth_required() {
                    self.screen = Screen::Login;
                }
                self.view.error = Some(err.to_string());
            }
        }
        self.view.loading = false;
    }

    /// Change the server-side query; takes effect on the next refresh.
    pub fn set_query(&mut self, query: Option<String>) {
        self.query = query.filter(|q| !q.is_empty());
    }

    /// Toggle one status in the client-side filter.
    pub fn toggle_status(&mut self, status: &str) {
        if let Some(pos) = self.status_filter.iter().position(|s| s == status) {
            self.status_filter.remove(pos);
        } else {
            self.status_filter.push(status.to_string());
        }
    }

    /// The fetched collection with client-side filters applied.
    pub fn filtered(&self) -> Vec<&Policy> {
        let Some(ref entry) = self.view.entry else {
            return Vec::new();
        };
        entry
            .data
            .iter()
            .filter(|p| p.matches_text(&self.search) && p.matches_status(&self.status_filter))
            .collect()
    }

    /// Counts per approval status over the unfiltered collection.
    pub fn status_counts(&self) -> Vec<(String, usize)> {
        let Some(ref entry) = self.view.entry else {
            return Vec::new();
        };
        crate::models::STATUS_OPTIONS
            .iter()
            .map(|status| {
                let count = entry
                    .data
                    .iter()
                    .filter(|p| {
                        p.approval_status
                            .as_deref()
                            .is_some_and(|s| s.contains(status))
                    })
                    .count();
                (status.to_string(), count)
            })
            .collect()
    }
}
