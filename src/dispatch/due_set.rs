use crate::ports::NotificationStore;
use crate::ports::store::{DueWindow, StoreResult};
use crate::types::notification::Notification;

use std::collections::HashMap;

/// Due notifications of one recipient, in store order.
#[derive(Debug, Clone)]
pub(crate) struct RecipientGroup {
    pub(crate) recipient_id: String,
    pub(crate) notifications: Vec<Notification>,
}

/// Due notifications grouped by recipient, skipping ids in `held`.
pub(crate) async fn resolve(
    store: &dyn NotificationStore,
    window: DueWindow,
    held: impl Fn(&str) -> bool,
) -> StoreResult<Vec<RecipientGroup>> {
    let mut due = store.due_notifications(window).await?;
    due.retain(|notification| !held(&notification.id));
    Ok(group_by_recipient(due))
}

pub(crate) fn group_by_recipient(notifications: Vec<Notification>) -> Vec<RecipientGroup> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<RecipientGroup> = Vec::new();
    for notification in notifications {
        match index.get(&notification.recipient_id) {
            Some(&slot) => groups[slot].notifications.push(notification),
            None => {
                index.insert(notification.recipient_id.clone(), groups.len());
                groups.push(RecipientGroup {
                    recipient_id: notification.recipient_id.clone(),
                    notifications: vec![notification],
                });
            }
        }
    }
    groups
}
