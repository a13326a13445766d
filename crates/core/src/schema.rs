//! Schema validation for events.

use tracing::debug;
use validator::Validate;

use crate::error::{Error, Result};
use crate::events::Event;

/// Validates an event against its schema.
pub fn validate_event(event: &Event) -> Result<()> {
    // Run validator derive validations
    event
        .validate()
        .map_err(|e| Error::malformed(format!("{}", e)))?;

    // Timestamps before the Unix epoch are treated as corrupt
    if event.timestamp.timestamp() < 0 {
        return Err(Error::malformed(format!(
            "negative timestamp {}",
            event.timestamp.to_rfc3339()
        )));
    }

    Ok(())
}

/// Splits events into the valid ones and a count of dropped records.
///
/// Invalid events never fail the batch.
pub fn retain_valid(events: Vec<Event>) -> (Vec<Event>, usize) {
    let total = events.len();
    let valid: Vec<Event> = events
        .into_iter()
        .enumerate()
        .filter_map(|(i, event)| match validate_event(&event) {
            Ok(()) => Some(event),
            Err(e) => {
                debug!(index = i, key = %event.key, error = %e, "Dropping invalid event");
                None
            }
        })
        .collect();

    let dropped = total - valid.len();
    (valid, dropped)
}
