//! Admin view-model for one kind of reference data (statuses, priorities,
//! severities or issue types).

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use ventus_core::{AppError, FetchPhase};
use ventus_services::{ServiceError, SettingResource, SettingsAdmin};

use crate::services::settings_service::{self, SettingsSender, SettingsServiceMessage};
use crate::services::TaskContext;
use crate::sort::compare_meta;

pub struct SettingsAdminModel<T: SettingResource> {
    admin: Arc<dyn SettingsAdmin<T>>,
    ctx: TaskContext,
    tx: SettingsSender<T>,
    rx: UnboundedReceiver<SettingsServiceMessage<T>>,
    items: Vec<T>,
    phase: FetchPhase,
    latest_seq: u64,
    error_message: Option<String>,
    auth_required: bool,
    shut_down: bool,
}

impl<T: SettingResource> SettingsAdminModel<T> {
    pub fn new(admin: Arc<dyn SettingsAdmin<T>>, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            admin,
            ctx: TaskContext::new(runtime),
            tx,
            rx,
            items: Vec::new(),
            phase: FetchPhase::Idle,
            latest_seq: 0,
            error_message: None,
            auth_required: false,
            shut_down: false,
        }
    }

    /// Items in display order (rank, then name).
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn get(&self, id: i64) -> Option<&T> {
        self.items.iter().find(|i| i.id() == id)
    }

    pub fn is_loading(&self) -> bool {
        self.phase.is_loading()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn is_auth_required(&self) -> bool {
        self.auth_required
    }

    pub fn load(&mut self) {
        if self.shut_down {
            return;
        }
        self.latest_seq += 1;
        self.phase = self.phase.on_dispatch();
        tracing::debug!("Loading {} list (seq {})", T::LABEL, self.latest_seq);
        settings_service::request_list(&self.tx, &self.ctx, self.admin.clone(), self.latest_seq);
    }

    pub fn create(&mut self, draft: T::Draft) {
        if self.shut_down {
            return;
        }
        settings_service::request_create(&self.tx, &self.ctx, self.admin.clone(), draft);
    }

    pub fn update(&mut self, id: i64, draft: T::Draft) {
        if self.shut_down {
            return;
        }
        settings_service::request_update(&self.tx, &self.ctx, self.admin.clone(), id, draft);
    }

    pub fn delete(&mut self, id: i64) {
        if self.shut_down {
            return;
        }
        settings_service::request_delete(&self.tx, &self.ctx, self.admin.clone(), id);
    }

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

    pub fn shutdown(&mut self) {
        self.shut_down = true;
        self.ctx.cancel();
        self.items.clear();
        self.phase = FetchPhase::Idle;
    }

    fn handle_message(&mut self, msg: SettingsServiceMessage<T>) {
        match msg {
            SettingsServiceMessage::Loaded { seq, result } => {
                if seq != self.latest_seq {
                    tracing::debug!("Discarding superseded {} list (seq {})", T::LABEL, seq);
                    return;
                }
                match result {
                    Ok(items) => {
                        self.phase = self.phase.on_success();
                        self.items = items;
                        self.resort();
                        self.error_message = None;
                    }
                    Err(e) => {
                        self.phase = self.phase.on_failure();
                        self.report_failure(e, "load");
                    }
                }
            }
            SettingsServiceMessage::Created(result) => match result {
                Ok(item) => {
                    self.items.push(item);
                    self.resort();
                    self.error_message = None;
                }
                Err(e) => self.report_failure(e, "create"),
            },
            SettingsServiceMessage::Updated { id, result } => match result {
                Ok(item) => {
                    match self.items.iter_mut().find(|i| i.id() == id) {
                        Some(slot) => *slot = item,
                        None => self.items.push(item),
                    }
                    self.resort();
                    self.error_message = None;
                }
                Err(e) if e.is_not_found() => {
                    self.items.retain(|i| i.id() != id);
                    self.report_failure(e, "update");
                }
                Err(e) => self.report_failure(e, "update"),
            },
            SettingsServiceMessage::Deleted { id, result } => match result {
                Ok(()) => {
                    self.items.retain(|i| i.id() != id);
                    self.error_message = None;
                }
                Err(e) if e.is_not_found() => {
                    tracing::debug!("{} {} already deleted", T::LABEL, id);
                    self.items.retain(|i| i.id() != id);
                }
                Err(e) => self.report_failure(e, "delete"),
            },
        }
    }

    fn resort(&mut self) {
        self.items.sort_by(|a, b| compare_meta(a, b));
    }

    fn report_failure(&mut self, e: ServiceError, action: &str) {
        self.error_message = Some(e.user_message());
        let app: AppError = e.into();
        tracing::error!("Failed to {} {}: {}", action, T::LABEL, app);
        if app.requires_login() {
            self.auth_required = true;
        }
    }
}

impl<T: SettingResource> Drop for SettingsAdminModel<T> {
    fn drop(&mut self) {
        self.ctx.cancel();
    }
}
