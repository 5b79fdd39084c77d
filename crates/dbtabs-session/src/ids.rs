//! Query tab id allocation

use dbtabs_core::{QUERY_TAB_PREFIX, TabId};
use std::time::{SystemTime, UNIX_EPOCH};

/// Numeric tokens at or above this are not tracked by
/// [`TabIdAllocator::observe`], so a huge id in a location cannot push the
/// counter to the end of its range.
const OBSERVE_CEILING: u64 = 1 << 53;

/// Hands out `query-<n>` ids from a wrapping counter.
///
/// The counter starts at the current time in milliseconds so ids from a
/// previous run (still present in saved records or bookmarked locations)
/// are unlikely to be reused, and it skips past any numeric id below
/// `OBSERVE_CEILING` it is shown. Callers still check ids for collisions.
#[derive(Clone, Debug)]
pub struct TabIdAllocator {
    next: u64,
}

impl TabIdAllocator {
    pub fn new() -> Self {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|d| u64::try_from(d.as_millis()).ok())
            .unwrap_or(0);
        Self::starting_at(now_ms)
    }

    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }

    pub fn next_query_id(&mut self) -> TabId {
        let id = TabId::query(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }

    /// Make sure ids handed out later do not collide with `id`
    pub fn observe(&mut self, id: &TabId) {
        let token = id
            .as_str()
            .strip_prefix(QUERY_TAB_PREFIX)
            .and_then(|token| token.parse::<u64>().ok());
        if let Some(token) = token {
            if token >= self.next && token < OBSERVE_CEILING {
                self.next = token + 1;
            }
        }
    }
}

impl Default for TabIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential() {
        let mut ids = TabIdAllocator::starting_at(0);
        assert_eq!(ids.next_query_id().as_str(), "query-0");
        assert_eq!(ids.next_query_id().as_str(), "query-1");
    }

    #[test]
    fn test_observe_skips_past_seen_ids() {
        let mut ids = TabIdAllocator::starting_at(0);
        ids.observe(&TabId::query(41));
        ids.observe(&TabId::query(3));
        ids.observe(&TabId::parse("query-abc").unwrap());
        ids.observe(&TabId::for_table("public", "users").unwrap());
        assert_eq!(ids.next_query_id(), TabId::query(42));
    }

    #[test]
    fn test_counter_wraps_at_end_of_range() {
        let mut ids = TabIdAllocator::starting_at(u64::MAX);
        assert_eq!(ids.next_query_id(), TabId::query(u64::MAX));
        assert_eq!(ids.next_query_id(), TabId::query(0));
    }

    #[test]
    fn test_observe_ignores_tokens_past_ceiling() {
        let mut ids = TabIdAllocator::starting_at(5);
        ids.observe(&TabId::query(u64::MAX - 1));
        ids.observe(&TabId::query(OBSERVE_CEILING));
        assert_eq!(ids.next_query_id(), TabId::query(5));

        ids.observe(&TabId::query(OBSERVE_CEILING - 1));
        assert_eq!(ids.next_query_id(), TabId::query(OBSERVE_CEILING));
    }

    #[test]
    fn test_time_seeded_allocator_is_nonzero() {
        let mut ids = TabIdAllocator::new();
        assert_ne!(ids.next_query_id(), TabId::query(0));
    }
}
