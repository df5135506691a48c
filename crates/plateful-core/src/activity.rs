//! Appending to the activity log

use crate::context::Plateful;
use crate::error::PlatefulError;
use crate::model::{ActivityEvent, NewActivity};
use crate::schema::collections;
use plateful_store::FromDocument;
use tracing::debug;

/// Append one event; the store assigns its ID and creation time
pub(crate) async fn append(
    ctx: &Plateful,
    event: NewActivity,
) -> Result<ActivityEvent, PlatefulError> {
    let doc = ctx
        .store()
        .add(collections::ACTIVITIES, event.to_fields())
        .await?;
    debug!(event = %doc.id, kind = %event.kind, actor = %event.actor_id, "activity recorded");
    Ok(ActivityEvent::from_document(&doc).into_value())
}
