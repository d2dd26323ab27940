//! Saving user settings.

use serde_json::{Map, Value, json};
use tracing::{info, warn};
use vigil_store::{Filter, RecordStore, StoreError, UserSettingsRecord, records};

use crate::error::Result;
use crate::notify::{Notice, Notifier};

/// Shallow-merges `changes` into the current user's settings record.
///
/// Notifies the user of the outcome either way and returns the merged
/// settings on success.
///
/// # Errors
///
/// Returns `AlertError::Store` if there is no settings record or the
/// backend rejects the update.
pub async fn save_settings(
    store: &dyn RecordStore,
    notifier: &dyn Notifier,
    changes: Map<String, Value>,
) -> Result<Map<String, Value>> {
    match merge_into_first(store, changes).await {
        Ok(settings) => {
            info!(keys = settings.len(), "saved user settings");
            notifier.notify(Notice::info(
                "Settings saved",
                "Your user settings have been updated.",
            ));
            Ok(settings)
        }
        Err(e) => {
            warn!(error = %e, "failed to save user settings");
            notifier.notify(Notice::destructive(
                "Failed to save settings",
                "Check logs for more details.",
            ));
            Err(e)
        }
    }
}

async fn merge_into_first(
    store: &dyn RecordStore,
    changes: Map<String, Value>,
) -> Result<Map<String, Value>> {
    let filter = Filter::all();
    let Some(raw) = store.first(records::USER_SETTINGS, &filter).await? else {
        return Err(StoreError::NotFound {
            collection: records::USER_SETTINGS.to_string(),
            id: "<first>".to_string(),
        }
        .into());
    };
    let current: UserSettingsRecord = records::decode(raw)?;

    let mut settings = current.settings;
    settings.extend(changes);

    store
        .update(
            records::USER_SETTINGS,
            &current.id,
            json!({ "settings": settings }),
        )
        .await?;

    Ok(settings)
}
