use std::collections::HashSet;

use chrono::{Local, NaiveDate};
use shared::{domain::MessageSid, protocol::MessageRecord};

/// Returns the sids of the messages that open a new local calendar day
/// within the given window, for date-separator rendering. The window is
/// assumed sorted by conversation index ascending. Pending messages carry
/// no timestamp and never open a day, but keep their position.
pub fn first_message_per_day(messages: &[MessageRecord]) -> HashSet<MessageSid> {
    let mut boundaries = HashSet::new();
    let mut current_day: Option<NaiveDate> = None;
    for message in messages {
        let Some(created) = message.date_created else {
            continue;
        };
        let day = created.with_timezone(&Local).date_naive();
        if current_day != Some(day) {
            boundaries.insert(message.sid.clone());
            current_day = Some(day);
        }
    }
    boundaries
}

#[cfg(test)]
#[path = "tests/date_bucket_tests.rs"]
mod tests;
