//! Per-subject cooldown timers.
//!
//! A [`CooldownStrategy`] maps a subject key (user, member or guild) to an
//! immutable [`CooldownTimer`]. Expiry is checked lazily on access; a
//! background sweeper may call [`CooldownStrategy::purge_expired`] to drop
//! stale entries, but correctness never depends on it.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;

use gantry_core::{Ambient, ChannelId, CooldownScope, GuildId, UserId};

/// A timer with a fixed end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownTimer {
    end: Instant,
}

impl CooldownTimer {
    pub fn starting_at(now: Instant, duration: Duration) -> Self {
        Self { end: now + duration }
    }

    pub fn end(&self) -> Instant {
        self.end
    }

    pub fn remaining(&self) -> Duration {
        self.remaining_at(Instant::now())
    }

    pub fn remaining_at(&self, now: Instant) -> Duration {
        self.end.saturating_duration_since(now)
    }

    pub fn is_finished(&self) -> bool {
        self.is_finished_at(Instant::now())
    }

    pub fn is_finished_at(&self, now: Instant) -> bool {
        now >= self.end
    }
}

/// The subject a timer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CooldownKey {
    User(UserId),
    Member(GuildId, UserId),
    Guild(GuildId),
    /// Guild-scoped cooldowns in private messages.
    Channel(ChannelId),
}

/// Result of checking a subject's timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownState {
    Ready,
    Cooling {
        remaining: Duration,
        /// False when the subject was already told within the throttle window.
        notify: bool,
    },
}

/// Result of trying to claim a subject's slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// The subject now holds the returned timer.
    Reserved(CooldownTimer),
    Cooling { remaining: Duration, notify: bool },
}

#[derive(Debug, Clone, Copy)]
struct CooldownEntry {
    timer: CooldownTimer,
    last_notice: Option<Instant>,
}

impl CooldownEntry {
    fn new(timer: CooldownTimer) -> Self {
        Self {
            timer,
            last_notice: None,
        }
    }

    /// Whether a notice is due, recording it if so.
    fn take_notice(&mut self, now: Instant, throttle: Duration) -> bool {
        let notify = self
            .last_notice
            .is_none_or(|last| now.saturating_duration_since(last) >= throttle);
        if notify {
            self.last_notice = Some(now);
        }
        notify
    }
}

/// Concurrent timer map for one cooldown declaration.
#[derive(Debug)]
pub struct CooldownStrategy {
    scope: CooldownScope,
    timers: DashMap<CooldownKey, CooldownEntry>,
}

impl CooldownStrategy {
    pub fn new(scope: CooldownScope) -> Self {
        Self {
            scope,
            timers: DashMap::new(),
        }
    }

    pub fn scope(&self) -> CooldownScope {
        self.scope
    }

    /// The key for the invoking subject, or `None` without a user.
    pub fn key(&self, ambient: &dyn Ambient) -> Option<CooldownKey> {
        let guild = ambient.guild_id();
        match self.scope {
            CooldownScope::User => ambient.user_id().map(CooldownKey::User),
            CooldownScope::Member => {
                let user = ambient.user_id()?;
                Some(match guild {
                    Some(guild) => CooldownKey::Member(guild, user),
                    None => CooldownKey::User(user),
                })
            }
            CooldownScope::Guild => match guild {
                Some(guild) => Some(CooldownKey::Guild(guild)),
                None => ambient.channel_id().map(CooldownKey::Channel),
            },
        }
    }

    pub fn check(&self, key: CooldownKey, throttle: Duration) -> CooldownState {
        self.check_at(key, Instant::now(), throttle)
    }

    /// Checks the timer for `key`, recording a notice when one is due.
    pub fn check_at(&self, key: CooldownKey, now: Instant, throttle: Duration) -> CooldownState {
        let Some(mut entry) = self.timers.get_mut(&key) else {
            return CooldownState::Ready;
        };
        if entry.timer.is_finished_at(now) {
            return CooldownState::Ready;
        }

        let notify = entry.take_notice(now, throttle);
        CooldownState::Cooling {
            remaining: entry.timer.remaining_at(now),
            notify,
        }
    }

    pub fn try_acquire(&self, key: CooldownKey, duration: Duration, throttle: Duration) -> Acquire {
        self.try_acquire_at(key, Instant::now(), duration, throttle)
    }

    /// Checks the timer for `key` and, when it is ready, starts a new one in
    /// the same step. Two concurrent callers never both get a reservation.
    pub fn try_acquire_at(
        &self,
        key: CooldownKey,
        now: Instant,
        duration: Duration,
        throttle: Duration,
    ) -> Acquire {
        let timer = CooldownTimer::starting_at(now, duration);
        match self.timers.entry(key) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.timer.is_finished_at(now) {
                    *entry = CooldownEntry::new(timer);
                    return Acquire::Reserved(timer);
                }
                Acquire::Cooling {
                    remaining: entry.timer.remaining_at(now),
                    notify: entry.take_notice(now, throttle),
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CooldownEntry::new(timer));
                Acquire::Reserved(timer)
            }
        }
    }

    /// Gives back a reservation, unless a newer timer replaced it.
    pub fn release(&self, key: CooldownKey, timer: CooldownTimer) {
        self.timers.remove_if(&key, |_, entry| entry.timer == timer);
    }

    pub fn start(&self, key: CooldownKey, duration: Duration) {
        self.start_at(key, Instant::now(), duration);
    }

    /// Replaces the timer for `key` with a fresh one.
    pub fn start_at(&self, key: CooldownKey, now: Instant, duration: Duration) {
        self.timers
            .insert(key, CooldownEntry::new(CooldownTimer::starting_at(now, duration)));
    }

    pub fn timer(&self, key: CooldownKey) -> Option<CooldownTimer> {
        self.timers.get(&key).map(|entry| entry.timer)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    /// Drops finished timers, returning how many were removed.
    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.timers.len();
        self.timers.retain(|_, entry| !entry.timer.is_finished_at(now));
        before.saturating_sub(self.timers.len())
    }
}

/// Keeps track of every strategy created during registration.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    strategies: Mutex<Vec<Weak<CooldownStrategy>>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and tracks a new strategy.
    pub fn create(&self, scope: CooldownScope) -> Arc<CooldownStrategy> {
        let strategy = Arc::new(CooldownStrategy::new(scope));
        self.strategies.lock().push(Arc::downgrade(&strategy));
        strategy
    }

    /// Number of live strategies.
    pub fn len(&self) -> usize {
        self.strategies
            .lock()
            .iter()
            .filter(|s| s.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Purges every live strategy and forgets dropped ones.
    pub fn purge_expired(&self) -> usize {
        let mut strategies = self.strategies.lock();
        strategies.retain(|s| s.strong_count() > 0);
        strategies
            .iter()
            .filter_map(Weak::upgrade)
            .map(|strategy| strategy.purge_expired())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::MessageEvent;

    const THROTTLE: Duration = Duration::from_secs(15);

    #[test]
    fn test_timer_remaining() {
        let now = Instant::now();
        let timer = CooldownTimer::starting_at(now, Duration::from_secs(10));
        assert_eq!(timer.remaining_at(now + Duration::from_secs(4)), Duration::from_secs(6));
        assert_eq!(timer.remaining_at(now + Duration::from_secs(11)), Duration::ZERO);
        assert!(timer.is_finished_at(now + Duration::from_secs(10)));
    }

    #[test]
    fn test_state_machine() {
        let strategy = CooldownStrategy::new(CooldownScope::User);
        let key = CooldownKey::User(UserId(1));
        let now = Instant::now();

        assert_eq!(strategy.check_at(key, now, THROTTLE), CooldownState::Ready);
        strategy.start_at(key, now, Duration::from_secs(30));

        let later = now + Duration::from_secs(10);
        assert_eq!(
            strategy.check_at(key, later, THROTTLE),
            CooldownState::Cooling {
                remaining: Duration::from_secs(20),
                notify: true
            }
        );

        let expired = now + Duration::from_secs(30);
        assert_eq!(strategy.check_at(key, expired, THROTTLE), CooldownState::Ready);
    }

    #[test]
    fn test_notice_throttled() {
        let strategy = CooldownStrategy::new(CooldownScope::User);
        let key = CooldownKey::User(UserId(1));
        let now = Instant::now();
        strategy.start_at(key, now, Duration::from_secs(60));

        let first = strategy.check_at(key, now + Duration::from_secs(1), THROTTLE);
        let second = strategy.check_at(key, now + Duration::from_secs(5), THROTTLE);
        let third = strategy.check_at(key, now + Duration::from_secs(17), THROTTLE);

        assert!(matches!(first, CooldownState::Cooling { notify: true, .. }));
        assert!(matches!(second, CooldownState::Cooling { notify: false, .. }));
        assert!(matches!(third, CooldownState::Cooling { notify: true, .. }));
    }

    #[test]
    fn test_acquire_reserves_once() {
        let strategy = CooldownStrategy::new(CooldownScope::User);
        let key = CooldownKey::User(UserId(1));
        let now = Instant::now();
        let duration = Duration::from_secs(30);

        let Acquire::Reserved(timer) = strategy.try_acquire_at(key, now, duration, THROTTLE) else {
            panic!("first caller should get the slot");
        };
        assert_eq!(timer.end(), now + duration);
        assert_eq!(
            strategy.try_acquire_at(key, now, duration, THROTTLE),
            Acquire::Cooling {
                remaining: duration,
                notify: true
            }
        );

        strategy.release(key, timer);
        assert!(strategy.timer(key).is_none());
        assert!(matches!(
            strategy.try_acquire_at(key, now, duration, THROTTLE),
            Acquire::Reserved(_)
        ));
    }

    #[test]
    fn test_release_keeps_newer_timer() {
        let strategy = CooldownStrategy::new(CooldownScope::User);
        let key = CooldownKey::User(UserId(1));
        let now = Instant::now();

        let Acquire::Reserved(old) =
            strategy.try_acquire_at(key, now, Duration::from_secs(1), THROTTLE)
        else {
            panic!("slot should be free");
        };
        let later = now + Duration::from_secs(2);
        assert!(matches!(
            strategy.try_acquire_at(key, later, Duration::from_secs(30), THROTTLE),
            Acquire::Reserved(_)
        ));

        strategy.release(key, old);
        assert_eq!(
            strategy.timer(key).map(|timer| timer.end()),
            Some(later + Duration::from_secs(30))
        );
    }

    #[test]
    fn test_subjects_are_independent() {
        let strategy = CooldownStrategy::new(CooldownScope::User);
        let now = Instant::now();
        strategy.start_at(CooldownKey::User(UserId(1)), now, Duration::from_secs(30));

        assert_eq!(
            strategy.check_at(CooldownKey::User(UserId(2)), now, THROTTLE),
            CooldownState::Ready
        );
    }

    #[test]
    fn test_scope_keys() {
        let in_guild = MessageEvent::new(UserId(1), ChannelId(2), "").in_guild(GuildId(3));
        let private = MessageEvent::new(UserId(1), ChannelId(2), "");

        let member = CooldownStrategy::new(CooldownScope::Member);
        assert_eq!(member.key(&in_guild), Some(CooldownKey::Member(GuildId(3), UserId(1))));
        assert_eq!(member.key(&private), Some(CooldownKey::User(UserId(1))));

        let guild = CooldownStrategy::new(CooldownScope::Guild);
        assert_eq!(guild.key(&in_guild), Some(CooldownKey::Guild(GuildId(3))));
        assert_eq!(guild.key(&private), Some(CooldownKey::Channel(ChannelId(2))));
    }

    #[test]
    fn test_purge_expired() {
        let strategy = CooldownStrategy::new(CooldownScope::User);
        let now = Instant::now();
        strategy.start_at(CooldownKey::User(UserId(1)), now, Duration::from_secs(1));
        strategy.start_at(CooldownKey::User(UserId(2)), now, Duration::from_secs(60));

        assert_eq!(strategy.purge_expired_at(now + Duration::from_secs(2)), 1);
        assert_eq!(strategy.len(), 1);
        assert!(strategy.timer(CooldownKey::User(UserId(2))).is_some());
    }

    #[test]
    fn test_tracker_forgets_dropped_strategies() {
        let tracker = CooldownTracker::new();
        let kept = tracker.create(CooldownScope::User);
        let dropped = tracker.create(CooldownScope::Guild);
        assert_eq!(tracker.len(), 2);

        drop(dropped);
        kept.start(CooldownKey::User(UserId(1)), Duration::ZERO);
        assert_eq!(tracker.purge_expired(), 1);
        assert_eq!(tracker.len(), 1);
    }
}
