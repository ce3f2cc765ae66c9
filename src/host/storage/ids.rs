use anyhow::{anyhow, Result};

use super::entities::RecordId;
use crate::utils::clock::Clock;

/// Largest id the generator hands out, the largest integer a JavaScript number holds exactly.
/// Stored ids above it can't collide with generated ones.
pub const MAX_GENERATED_ID: u64 = 9_007_199_254_740_991;

/// Generates record ids in the historical format (milliseconds since epoch as a decimal string)
/// while guaranteeing that every id is strictly greater than the previous one, even when
/// several records are created within the same millisecond.
pub struct IdGenerator {
    last: u64,
    clock: Box<dyn Clock>,
}

impl IdGenerator {
    /// `existing` are the ids already stored. Ids that aren't numeric, or are above
    /// [MAX_GENERATED_ID], can't collide with generated ones and are ignored.
    pub fn new<'a>(clock: Box<dyn Clock>, existing: impl IntoIterator<Item = &'a RecordId>) -> Self {
        let last = existing
            .into_iter()
            .filter_map(|id| id.as_str().parse::<u64>().ok())
            .filter(|id| *id <= MAX_GENERATED_ID)
            .max()
            .unwrap_or(0);
        Self { last, clock }
    }

    pub fn next_id(&mut self) -> Result<RecordId> {
        let now = u64::try_from(self.clock.time().timestamp_millis()).unwrap_or(0);
        let next = self
            .last
            .checked_add(1)
            .map(|next| next.max(now))
            .filter(|next| *next <= MAX_GENERATED_ID)
            .ok_or_else(|| anyhow!("No record ids left after {}", self.last))?;
        self.last = next;
        Ok(RecordId::from(next.to_string()))
    }
}
