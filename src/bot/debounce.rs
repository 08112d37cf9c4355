use dashmap::{mapref::entry::Entry, DashMap};
use serenity::model::id::UserId;
use std::time::{Duration, Instant};

/// Per-user command cooldown. A zero cooldown lets everything through.
pub struct CommandDebounce {
    cooldown: Duration,
    last_action: DashMap<UserId, Instant>,
}

impl CommandDebounce {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_action: DashMap::new(),
        }
    }

    pub fn allow(&self, user_id: UserId) -> bool {
        self.allow_at(user_id, Instant::now())
    }

    fn allow_at(&self, user_id: UserId, now: Instant) -> bool {
        if self.cooldown.is_zero() {
            return true;
        }

        match self.last_action.entry(user_id) {
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
            Entry::Occupied(entry) if now.duration_since(*entry.get()) < self.cooldown => false,
            Entry::Occupied(mut entry) => {
                entry.insert(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_cooldown_is_disabled() {
        let debounce = CommandDebounce::new(Duration::ZERO);
        let user = UserId::new(1);
        assert!(debounce.allow(user));
        assert!(debounce.allow(user));
    }

    #[test]
    fn test_cooldown_per_user() {
        let debounce = CommandDebounce::new(Duration::from_secs(2));
        let start = Instant::now();
        let alice = UserId::new(1);
        let bob = UserId::new(2);

        assert!(debounce.allow_at(alice, start));
        assert!(!debounce.allow_at(alice, start + Duration::from_millis(500)));
        assert!(debounce.allow_at(bob, start + Duration::from_millis(500)));
        assert!(debounce.allow_at(alice, start + Duration::from_secs(2)));
        assert!(!debounce.allow_at(alice, start + Duration::from_secs(3)));
    }
}
