//! Settings backend: async CRUD for one reference-data kind.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use ventus_services::{ServiceError, SettingResource, SettingsAdmin};

use super::TaskContext;

#[derive(Debug)]
pub enum SettingsServiceMessage<T> {
    Loaded {
        seq: u64,
        result: Result<Vec<T>, ServiceError>,
    },
    Created(Result<T, ServiceError>),
    Updated {
        id: i64,
        result: Result<T, ServiceError>,
    },
    Deleted {
        id: i64,
        result: Result<(), ServiceError>,
    },
}

pub type SettingsSender<T> = UnboundedSender<SettingsServiceMessage<T>>;

pub fn request_list<T: SettingResource>(
    tx: &SettingsSender<T>,
    ctx: &TaskContext,
    admin: Arc<dyn SettingsAdmin<T>>,
    seq: u64,
) {
    let tx = tx.clone();
    ctx.spawn(async move {
        let result = admin.list().await;
        let _ = tx.send(SettingsServiceMessage::Loaded { seq, result });
    });
}

pub fn request_create<T: SettingResource>(
    tx: &SettingsSender<T>,
    ctx: &TaskContext,
    admin: Arc<dyn SettingsAdmin<T>>,
    draft: T::Draft,
) {
    let tx = tx.clone();
    ctx.spawn(async move {
        let result = admin.create(&draft).await;
        let _ = tx.send(SettingsServiceMessage::Created(result));
    });
}

pub fn request_update<T: SettingResource>(
    tx: &SettingsSender<T>,
    ctx: &TaskContext,
    admin: Arc<dyn SettingsAdmin<T>>,
    id: i64,
    draft: T::Draft,
) {
    let tx = tx.clone();
    ctx.spawn(async move {
        let result = admin.update(id, &draft).await;
        let _ = tx.send(SettingsServiceMessage::Updated { id, result });
    });
}

pub fn request_delete<T: SettingResource>(
    tx: &SettingsSender<T>,
    ctx: &TaskContext,
    admin: Arc<dyn SettingsAdmin<T>>,
    id: i64,
) {
    let tx = tx.clone();
    ctx.spawn(async move {
        let result = admin.delete(id).await;
        let _ = tx.send(SettingsServiceMessage::Deleted { id, result });
    });
}
