//! Issue list view-model.
//!
//! Owns the query state, the current page and the view flags. All requests
//! run on the task context; their results are applied on the owner's thread
//! through [`IssueListModel::poll_channel`] or [`IssueListModel::process_next`].
//! Every page fetch carries a sequence number and only the latest may commit.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use ventus_core::{AppError, AuthError, FetchPhase, IssuesConfig};
use ventus_services::{
    CreateIssueRequest, FilterKey, Issue, IssueFilters, IssueGateway, Page, QueryIntent,
    ReferenceData, ServiceError, SortDirection, SortKey, UpdateIssueRequest, UserLite,
};

use crate::debounce::SearchDebouncer;
use crate::models::bulk::{parse_bulk_titles, to_requests, BulkParseError};
use crate::models::listeners::{ListenerId, Listeners};
use crate::query_state::QueryState;
use crate::services::issue_service::{self, IssueSender, IssueServiceMessage};
use crate::services::TaskContext;
use crate::sort::{sort_field_changed, sort_issues};

/// State change notifications for observers of the list.
#[derive(Debug, Clone, PartialEq)]
pub enum ListEvent {
    ItemsChanged,
    LoadingChanged(bool),
    ErrorChanged(Option<String>),
    /// Transient row-level message
    Notification(String),
    SortChanged {
        key: SortKey,
        direction: SortDirection,
    },
    OptionsLoaded,
    /// The API key is missing or was rejected; fetching is paused.
    AuthRequired,
}

/// Optimistic edits to one row still waiting for the server.
#[derive(Debug)]
struct PendingEdit {
    /// Sequence number of the newest edit sent for the row
    latest: u64,
    /// Row as last confirmed by the server, or as it was before the first edit
    confirmed: Option<Issue>,
}

pub struct IssueListModel {
    gateway: Arc<dyn IssueGateway>,
    ctx: TaskContext,
    tx: IssueSender,
    rx: UnboundedReceiver<IssueServiceMessage>,
    query: QueryState,
    debouncer: SearchDebouncer<IssueServiceMessage>,
    search_input: String,
    items: Vec<Issue>,
    total_count: u64,
    phase: FetchPhase,
    latest_seq: u64,
    edit_seq: u64,
    pending_edits: HashMap<i64, PendingEdit>,
    error_message: Option<String>,
    notification: Option<String>,
    options: Option<ReferenceData>,
    users: Vec<UserLite>,
    options_requested: bool,
    auth_blocked: bool,
    shut_down: bool,
    listeners: Listeners<ListEvent>,
}

impl IssueListModel {
    pub fn new(gateway: Arc<dyn IssueGateway>, runtime: Handle, config: &IssuesConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = SearchDebouncer::new(
            runtime.clone(),
            Duration::from_millis(config.search_debounce_ms),
            "",
            tx.clone(),
            |generation, term| IssueServiceMessage::SearchSettled { generation, term },
        );

        Self {
            gateway,
            ctx: TaskContext::new(runtime),
            tx,
            rx,
            query: QueryState::new(config.page_size),
            debouncer,
            search_input: String::new(),
            items: Vec::new(),
            total_count: 0,
            phase: FetchPhase::Idle,
            latest_seq: 0,
            edit_seq: 0,
            pending_edits: HashMap::new(),
            error_message: None,
            notification: None,
            options: None,
            users: Vec::new(),
            options_requested: false,
            auth_blocked: false,
            shut_down: false,
            listeners: Listeners::default(),
        }
    }

    // ---- read access ----

    pub fn items(&self) -> &[Issue] {
        &self.items
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn page(&self) -> u32 {
        self.query.page()
    }

    pub fn page_size(&self) -> u32 {
        self.query.page_size()
    }

    pub fn total_pages(&self) -> u32 {
        self.query.total_pages()
    }

    pub fn intent(&self) -> &QueryIntent {
        self.query.intent()
    }

    pub fn search_term(&self) -> &str {
        self.query.search_term()
    }

    /// Raw text as typed, possibly not yet applied.
    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    pub fn filters(&self) -> &IssueFilters {
        self.query.filters()
    }

    pub fn sort_key(&self) -> Option<SortKey> {
        self.query.sort_key()
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.query.sort_direction()
    }

    pub fn is_loading(&self) -> bool {
        self.phase.is_loading()
    }

    pub fn phase(&self) -> FetchPhase {
        self.phase
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn notification(&self) -> Option<&str> {
        self.notification.as_deref()
    }

    /// Read and clear the transient notification.
    pub fn take_notification(&mut self) -> Option<String> {
        self.notification.take()
    }

    pub fn options(&self) -> Option<&ReferenceData> {
        self.options.as_ref()
    }

    pub fn users(&self) -> &[UserLite] {
        &self.users
    }

    pub fn is_auth_blocked(&self) -> bool {
        self.auth_blocked
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ListEvent) + Send + 'static) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    // ---- fetching ----

    /// Fetch the page described by the current intent. Supersedes any fetch
    /// still in flight.
    pub fn refresh(&mut self) {
        if self.shut_down {
            return;
        }
        if self.auth_blocked {
            tracing::debug!("Refresh skipped while waiting for login");
            return;
        }

        self.latest_seq += 1;
        let was_loading = self.phase.is_loading();
        self.phase = self.phase.on_dispatch();
        if !was_loading {
            self.listeners.emit(&ListEvent::LoadingChanged(true));
        }

        tracing::debug!(
            "Fetching issues page {} (seq {})",
            self.query.page(),
            self.latest_seq
        );
        issue_service::request_fetch_page(
            &self.tx,
            &self.ctx,
            self.gateway.clone(),
            self.latest_seq,
            self.query.intent().clone(),
        );
    }

    /// Clear the auth block after a successful login and fetch again.
    pub fn resume_after_login(&mut self) {
        if !self.auth_blocked {
            return;
        }
        tracing::info!("Resuming issue list after login");
        self.auth_blocked = false;
        self.clear_error();
        self.refresh();
    }

    /// Load reference data and users once; later calls use the cache.
    pub fn load_options(&mut self) {
        if self.shut_down || self.options.is_some() || self.options_requested {
            return;
        }
        self.options_requested = true;
        issue_service::request_options(&self.tx, &self.ctx, self.gateway.clone());
    }

    // ---- query setters ----

    /// Debounced: the fetch happens once typing pauses.
    pub fn set_search_term(&mut self, term: &str) {
        if self.shut_down {
            return;
        }
        self.search_input = term.to_string();
        self.debouncer.submit(term);
    }

    /// Apply a search term right away (e.g. on Enter).
    pub fn search_now(&mut self, term: &str) {
        if self.shut_down {
            return;
        }
        let term = self.debouncer.submit_now(term);
        self.search_input = term.clone();
        self.apply_search(&term);
    }

    pub fn set_filter(&mut self, key: FilterKey, value: Option<i64>) {
        if self.shut_down {
            return;
        }
        self.query.set_filter(key, value);
        self.refresh();
    }

    pub fn clear_filters(&mut self) {
        if self.shut_down {
            return;
        }
        for key in [
            FilterKey::Status,
            FilterKey::Priority,
            FilterKey::Assignee,
            FilterKey::Creator,
        ] {
            self.query.set_filter(key, None);
        }
        self.refresh();
    }

    /// Re-sorts the current page only; no fetch.
    pub fn set_sort(&mut self, key: SortKey) {
        if self.shut_down {
            return;
        }
        let intent = self.query.set_sort(key);
        self.apply_client_side_sort();
        self.listeners.emit(&ListEvent::SortChanged {
            key,
            direction: intent.sort_direction,
        });
        self.listeners.emit(&ListEvent::ItemsChanged);
    }

    /// Returns `false` for out-of-range pages; nothing is fetched then.
    pub fn set_page(&mut self, n: u32) -> bool {
        if self.shut_down {
            return false;
        }
        if !self.query.set_page(n) {
            tracing::debug!("Rejected page {} (total {})", n, self.total_count);
            return false;
        }
        self.refresh();
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.set_page(self.query.page().saturating_add(1))
    }

    pub fn previous_page(&mut self) -> bool {
        self.set_page(self.query.page().saturating_sub(1))
    }

    // ---- local list maintenance ----

    pub fn apply_client_side_sort(&mut self) {
        if let Some(key) = self.query.sort_key() {
            sort_issues(&mut self.items, key, self.query.sort_direction());
        }
    }

    /// Replace the item with `id` in place. Re-sorts only when the active sort
    /// column changed. Returns `false` when the item is not on this page.
    pub fn patch_item_locally(&mut self, id: i64, updated: Issue) -> bool {
        if updated.id != id {
            tracing::warn!("Ignoring patch for issue {} carrying issue {}", id, updated.id);
            return false;
        }
        let Some(pos) = self.items.iter().position(|i| i.id == id) else {
            return false;
        };

        let old = std::mem::replace(&mut self.items[pos], updated);
        if let Some(key) = self.query.sort_key() {
            if sort_field_changed(&old, &self.items[pos], key) {
                self.apply_client_side_sort();
            }
        }
        self.listeners.emit(&ListEvent::ItemsChanged);
        true
    }

    /// Show a freshly created item at the top of page 1 immediately, then
    /// resync with the server.
    pub fn create_and_prepend(&mut self, item: Issue) {
        if self.query.first_page() {
            tracing::debug!("Back to page 1 to show new issue {}", item.id);
            self.items.clear();
        }
        self.items.insert(0, item);
        self.items.truncate(self.query.page_size() as usize);
        self.total_count += 1;
        self.query.set_total_count(self.total_count);
        self.listeners.emit(&ListEvent::ItemsChanged);
        self.refresh();
    }

    /// Drop the item with `id`. When that empties a page other than the
    /// first, step back one page and fetch it.
    pub fn remove_item_locally(&mut self, id: i64) -> bool {
        let Some(pos) = self.items.iter().position(|i| i.id == id) else {
            return false;
        };
        self.items.remove(pos);
        self.total_count = self.total_count.saturating_sub(1);
        self.query.set_total_count(self.total_count);
        self.listeners.emit(&ListEvent::ItemsChanged);

        if self.items.is_empty() && self.query.step_back() {
            self.refresh();
        }
        true
    }

    // ---- row actions ----

    /// Optimistic edit: the row changes now, the PATCH follows. A vanished
    /// issue is removed. A rejected edit is rolled back to the last state the
    /// server confirmed, but only once no newer edit of the row is pending.
    pub fn update_issue(&mut self, id: i64, changes: UpdateIssueRequest) -> bool {
        if self.shut_down || changes.is_empty() {
            return false;
        }
        if self.auth_blocked {
            self.notify(AuthError::NotAuthenticated.user_message().to_string());
            return false;
        }

        let current = self.items.iter().find(|i| i.id == id).cloned();
        self.edit_seq += 1;
        let edit_seq = self.edit_seq;
        self.pending_edits
            .entry(id)
            .and_modify(|pending| pending.latest = edit_seq)
            .or_insert_with(|| PendingEdit {
                latest: edit_seq,
                confirmed: current.clone(),
            });

        if let Some(mut optimistic) = current {
            self.apply_changes(&mut optimistic, &changes);
            self.patch_item_locally(id, optimistic);
        }

        issue_service::request_update(&self.tx, &self.ctx, self.gateway.clone(), id, edit_seq, changes);
        true
    }

    /// Assign (or with `None`, unassign) an issue.
    pub fn assign_issue(&mut self, id: i64, assignee_id: Option<i64>) -> bool {
        self.update_issue(id, UpdateIssueRequest::assign(assignee_id))
    }

    pub fn create_issue(&mut self, request: CreateIssueRequest) -> bool {
        if self.shut_down {
            return false;
        }
        if request.title.trim().is_empty() {
            self.notify("A title is required.".to_string());
            return false;
        }
        issue_service::request_create(&self.tx, &self.ctx, self.gateway.clone(), request);
        true
    }

    pub fn delete_issue(&mut self, id: i64) -> bool {
        if self.shut_down {
            return false;
        }
        issue_service::request_delete(&self.tx, &self.ctx, self.gateway.clone(), id);
        true
    }

    /// Create one issue per non-blank line of `input`. Returns how many
    /// titles were sent.
    pub fn bulk_create(&mut self, input: &str) -> Result<usize, BulkParseError> {
        let titles = match parse_bulk_titles(input) {
            Ok(titles) => titles,
            Err(e) => {
                self.notify(e.to_string());
                return Err(e);
            }
        };
        let count = titles.len();
        if !self.shut_down {
            issue_service::request_bulk_create(&self.tx, &self.ctx, self.gateway.clone(), to_requests(titles));
        }
        Ok(count)
    }

    // ---- message pump ----

    /// Apply every result that has already arrived. Returns how many were
    /// handled.
    pub fn poll_channel(&mut self) -> usize {
        let mut handled = 0;
        while !self.shut_down {
            match self.rx.try_recv() {
                Ok(msg) => {
                    self.handle_message(msg);
                    handled += 1;
                }
                Err(_) => break,
            }
        }
        handled
    }

    /// Wait for the next result and apply it. Returns `false` after shutdown.
    pub async fn process_next(&mut self) -> bool {
        if self.shut_down {
            return false;
        }
        match self.rx.recv().await {
            Some(msg) => {
                self.handle_message(msg);
                true
            }
            None => false,
        }
    }

    /// Cancel in-flight requests and the debounce timer and drop all state.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        tracing::info!("Shutting down issue list");
        self.shut_down = true;
        self.ctx.cancel();
        self.debouncer.cancel();
        self.items.clear();
        self.pending_edits.clear();
        self.phase = FetchPhase::Idle;
        self.listeners.clear();
    }

    fn handle_message(&mut self, msg: IssueServiceMessage) {
        match msg {
            IssueServiceMessage::PageLoaded { seq, result } => self.on_page_loaded(seq, result),
            IssueServiceMessage::OptionsLoaded(result) => match result {
                Ok((options, users)) => {
                    tracing::info!("Loaded reference data and {} users", users.len());
                    self.options = Some(options);
                    self.users = users;
                    self.listeners.emit(&ListEvent::OptionsLoaded);
                }
                Err(e) => {
                    self.options_requested = false;
                    let message = self.report_failure(e, "Loading options");
                    self.notify(message);
                }
            },
            IssueServiceMessage::UpdateDone {
                id,
                edit_seq,
                result,
            } => self.on_update_done(id, edit_seq, result),
            IssueServiceMessage::CreateDone(result) => match result {
                Ok(issue) => {
                    tracing::info!("Created issue {}", issue.id);
                    self.notify(format!("Created issue #{}", issue.id));
                    self.create_and_prepend(issue);
                }
                Err(e) => {
                    let message = self.report_failure(e, "Issue create");
                    self.notify(message);
                }
            },
            IssueServiceMessage::DeleteDone { id, result } => match result {
                Ok(()) => {
                    self.remove_item_locally(id);
                }
                Err(e) if e.is_not_found() => {
                    let message = self.report_failure(e, "Issue delete");
                    self.remove_item_locally(id);
                    self.notify(message);
                }
                Err(e) => {
                    let message = self.report_failure(e, "Issue delete");
                    self.notify(message);
                }
            },
            IssueServiceMessage::BulkCreateDone(result) => match result {
                Ok(created) => {
                    self.notify(format!("Created {} issues", created.len()));
                    self.refresh();
                }
                Err(e) => {
                    let message = self.report_failure(e, "Bulk create");
                    self.notify(message);
                }
            },
            IssueServiceMessage::SearchSettled { generation, term } => {
                if self.debouncer.accept(generation, &term) {
                    self.apply_search(&term);
                }
            }
        }
    }

    fn on_update_done(&mut self, id: i64, edit_seq: u64, result: Result<Issue, ServiceError>) {
        let superseded = self
            .pending_edits
            .get(&id)
            .is_some_and(|pending| pending.latest != edit_seq);

        match result {
            Ok(issue) if superseded => {
                tracing::debug!("Edit {} of issue {} confirmed; newer edit pending", edit_seq, id);
                if let Some(pending) = self.pending_edits.get_mut(&id) {
                    pending.confirmed = Some(issue);
                }
            }
            Ok(issue) => {
                self.pending_edits.remove(&id);
                self.patch_item_locally(id, issue);
            }
            Err(e) if e.is_not_found() => {
                self.pending_edits.remove(&id);
                let message = self.report_failure(e, "Issue update");
                self.remove_item_locally(id);
                self.notify(message);
            }
            Err(e) => {
                let message = self.report_failure(e, "Issue update");
                if superseded {
                    tracing::debug!("Not rolling back issue {}; newer edit pending", id);
                } else if let Some(confirmed) =
                    self.pending_edits.remove(&id).and_then(|pending| pending.confirmed)
                {
                    self.patch_item_locally(id, confirmed);
                }
                self.notify(message);
            }
        }
    }

    fn on_page_loaded(&mut self, seq: u64, result: Result<Page, ServiceError>) {
        if seq != self.latest_seq {
            tracing::debug!(
                "Discarding superseded page response (seq {}, latest {})",
                seq,
                self.latest_seq
            );
            return;
        }

        match result {
            Ok(page) => {
                self.phase = self.phase.on_success();
                self.total_count = page.total_count;
                self.query.set_total_count(page.total_count);
                self.items = page.items;
                self.apply_client_side_sort();
                self.clear_error();
            }
            Err(e) => {
                self.phase = self.phase.on_failure();
                self.items.clear();
                let message = self.report_failure(e, "Issue fetch");
                self.set_error(message);
            }
        }

        self.listeners.emit(&ListEvent::LoadingChanged(false));
        self.listeners.emit(&ListEvent::ItemsChanged);
    }

    fn apply_search(&mut self, term: &str) {
        self.query.set_search_term(term);
        self.refresh();
    }

    /// Best-effort local projection of an update; fields that need data we
    /// do not have are left for the server response.
    fn apply_changes(&self, issue: &mut Issue, changes: &UpdateIssueRequest) {
        if let Some(title) = &changes.title {
            issue.title = title.clone();
        }
        if let Some(description) = &changes.description {
            issue.description = Some(description.clone());
        }
        if let Some(deadline) = &changes.deadline {
            issue.deadline = deadline.clone();
        }

        if let Some(options) = &self.options {
            if let Some(s) = changes
                .status_id
                .and_then(|id| options.statuses.iter().find(|s| s.id == id))
            {
                issue.status = s.clone();
            }
            if let Some(p) = changes
                .priority_id
                .and_then(|id| options.priorities.iter().find(|p| p.id == id))
            {
                issue.priority = p.clone();
            }
            if let Some(s) = changes
                .severity_id
                .and_then(|id| options.severities.iter().find(|s| s.id == id))
            {
                issue.severity = s.clone();
            }
            if let Some(t) = changes
                .issue_type_id
                .and_then(|id| options.issue_types.iter().find(|t| t.id == id))
            {
                issue.issue_type = t.clone();
            }
        }

        match changes.assignee_id {
            Some(None) => issue.assignee = None,
            Some(Some(uid)) => {
                if let Some(u) = self.users.iter().find(|u| u.id == uid) {
                    issue.assignee = Some(u.clone());
                }
            }
            None => {}
        }

        for uid in changes.watchers_to_add.iter().flatten() {
            if issue.watchers.iter().all(|w| w.id != *uid) {
                if let Some(u) = self.users.iter().find(|u| u.id == *uid) {
                    issue.watchers.push(u.clone());
                }
            }
        }
        if let Some(remove) = &changes.watchers_to_remove {
            issue.watchers.retain(|w| !remove.contains(&w.id));
        }
    }

    /// Log a failure, pause on auth problems, and return the user message.
    fn report_failure(&mut self, e: ServiceError, action: &str) -> String {
        let message = e.user_message();
        let app: AppError = e.into();
        tracing::error!("{} failed: {}", action, app);

        if app.requires_login() {
            self.block_for_auth();
        }
        message
    }

    fn block_for_auth(&mut self) {
        if self.auth_blocked {
            return;
        }
        tracing::warn!("Issue list paused until login");
        self.auth_blocked = true;
        self.listeners.emit(&ListEvent::AuthRequired);
    }

    fn set_error(&mut self, message: String) {
        self.error_message = Some(message.clone());
        self.listeners.emit(&ListEvent::ErrorChanged(Some(message)));
    }

    fn clear_error(&mut self) {
        if self.error_message.take().is_some() {
            self.listeners.emit(&ListEvent::ErrorChanged(None));
        }
    }

    fn notify(&mut self, message: String) {
        self.notification = Some(message.clone());
        self.listeners.emit(&ListEvent::Notification(message));
    }
}

impl Drop for IssueListModel {
    fn drop(&mut self) {
        self.ctx.cancel();
    }
}
