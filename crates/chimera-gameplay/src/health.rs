//! Health pools and the damage-receiving contract.
//!
//! Anything that can be hurt implements [`Damageable`]. The usual
//! implementation delegates to a [`HealthPool`], which owns the numbers and
//! the invulnerability window and queues notifications for its owner to
//! forward.

use chimera_common::Vec2;
use serde::{Deserialize, Serialize};

/// Minimal capability required to take part in combat.
///
/// Damage and heal calls never fail; invalid amounts are ignored.
pub trait Damageable {
    /// Applies `amount` of damage at simulation time `now`.
    fn take_damage(&mut self, amount: f32, now: f32);

    /// Restores `amount` of health.
    fn heal(&mut self, amount: f32);

    /// Returns current health.
    fn current_health(&self) -> f32;

    /// Receives a knockback impulse. Bodies without velocity ignore it.
    fn apply_impulse(&mut self, _impulse: Vec2) {}
}

/// Notification queued by a [`HealthPool`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HealthNotification {
    /// Damage was applied.
    Damaged {
        /// Health actually removed (after clamping)
        amount: f32,
        /// Health left
        remaining: f32,
    },
    /// Health was restored.
    Healed {
        /// Health actually restored (after clamping)
        amount: f32,
        /// Health after healing
        current: f32,
    },
    /// Health reached zero.
    Died,
}

/// Current/max health plus the invulnerability window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthPool {
    current: f32,
    max: f32,
    /// Seconds of invulnerability after a successful hit.
    invulnerability: f32,
    last_damage_time: Option<f32>,
    #[serde(skip)]
    pending: Vec<HealthNotification>,
}

impl HealthPool {
    /// Creates a full pool. Non-positive `max` is raised to 1.
    #[must_use]
    pub fn new(max: f32) -> Self {
        let max = if max > 0.0 { max } else { 1.0 };
        Self {
            current: max,
            max,
            invulnerability: 0.0,
            last_damage_time: None,
            pending: Vec::new(),
        }
    }

    /// Sets the invulnerability window.
    #[must_use]
    pub fn with_invulnerability(mut self, seconds: f32) -> Self {
        self.invulnerability = seconds.max(0.0);
        self
    }

    /// Starts the pool at `current` instead of full, clamped to `[0, max]`.
    #[must_use]
    pub fn with_current(mut self, current: f32) -> Self {
        self.current = current.clamp(0.0, self.max);
        self
    }

    /// Returns current health.
    #[must_use]
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Returns maximum health.
    #[must_use]
    pub fn max(&self) -> f32 {
        self.max
    }

    /// Returns health as a fraction of max.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        self.current / self.max
    }

    /// Returns the invulnerability window length in seconds.
    #[must_use]
    pub fn invulnerability(&self) -> f32 {
        self.invulnerability
    }

    /// Time of the last damage that got through, if any.
    #[must_use]
    pub fn last_damage_time(&self) -> Option<f32> {
        self.last_damage_time
    }

    /// Time at which the current invulnerability window closes.
    #[must_use]
    pub fn invulnerable_until(&self) -> Option<f32> {
        self.last_damage_time.map(|t| t + self.invulnerability)
    }

    /// Whether damage at `now` would be rejected by the window.
    #[must_use]
    pub fn is_invulnerable(&self, now: f32) -> bool {
        match self.last_damage_time {
            Some(last) => now - last < self.invulnerability,
            None => false,
        }
    }

    /// Checks if dead.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }

    /// Applies damage at time `now`.
    ///
    /// Ignored when `amount` is not positive, the pool is already empty, or
    /// `now` falls inside the invulnerability window.
    pub fn take_damage(&mut self, amount: f32, now: f32) {
        if amount.is_nan() || amount <= 0.0 || self.is_dead() || self.is_invulnerable(now) {
            return;
        }

        let before = self.current;
        self.current = (self.current - amount).clamp(0.0, self.max);
        self.last_damage_time = Some(now);
        self.pending.push(HealthNotification::Damaged {
            amount: before - self.current,
            remaining: self.current,
        });

        if self.current <= 0.0 {
            self.pending.push(HealthNotification::Died);
        }
    }

    /// Restores health. Ignored for non-positive amounts or a dead pool.
    pub fn heal(&mut self, amount: f32) {
        if amount.is_nan() || amount <= 0.0 || self.is_dead() {
            return;
        }
        let before = self.current;
        self.current = (self.current + amount).clamp(0.0, self.max);
        self.pending.push(HealthNotification::Healed {
            amount: self.current - before,
            current: self.current,
        });
    }

    /// Refills the pool regardless of its state.
    pub fn fill_to_max(&mut self) {
        let before = self.current;
        self.current = self.max;
        self.pending.push(HealthNotification::Healed {
            amount: self.max - before,
            current: self.max,
        });
    }

    /// Takes every queued notification, oldest first.
    pub fn drain_notifications(&mut self) -> Vec<HealthNotification> {
        std::mem::take(&mut self.pending)
    }
}

impl Damageable for HealthPool {
    fn take_damage(&mut self, amount: f32, now: f32) {
        HealthPool::take_damage(self, amount, now);
    }

    fn heal(&mut self, amount: f32) {
        HealthPool::heal(self, amount);
    }

    fn current_health(&self) -> f32 {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_damage_and_death() {
        let mut pool = HealthPool::new(50.0);
        pool.take_damage(20.0, 0.0);
        assert_eq!(pool.current(), 30.0);
        pool.take_damage(100.0, 1.0);
        assert_eq!(pool.current(), 0.0);
        assert!(pool.is_dead());

        let notes = pool.drain_notifications();
        assert_eq!(notes.len(), 3);
        assert_eq!(
            notes[1],
            HealthNotification::Damaged {
                amount: 30.0,
                remaining: 0.0
            }
        );
        assert_eq!(notes[2], HealthNotification::Died);
        assert!(pool.drain_notifications().is_empty());
    }

    #[test]
    fn test_invulnerability_window_rejects_whole_hit() {
        let mut pool = HealthPool::new(100.0).with_invulnerability(0.5);
        pool.take_damage(10.0, 1.0);
        pool.take_damage(10.0, 1.4);
        assert_eq!(pool.current(), 90.0);
        assert!(pool.is_invulnerable(1.4));
        assert_eq!(pool.invulnerable_until(), Some(1.5));

        pool.take_damage(10.0, 1.5);
        assert_eq!(pool.current(), 80.0);
    }

    #[test]
    fn test_dead_pool_ignores_damage_and_heal() {
        let mut pool = HealthPool::new(10.0);
        pool.take_damage(10.0, 0.0);
        pool.drain_notifications();

        pool.take_damage(5.0, 10.0);
        pool.heal(5.0);
        assert_eq!(pool.current(), 0.0);
        assert!(pool.drain_notifications().is_empty());
    }

    #[test]
    fn test_heal_clamps_to_max() {
        let mut pool = HealthPool::new(100.0).with_current(50.0);
        pool.heal(30.0);
        assert_eq!(pool.current(), 80.0);
        pool.heal(50.0);
        assert_eq!(pool.current(), 100.0);
        assert_eq!(
            pool.drain_notifications().last(),
            Some(&HealthNotification::Healed {
                amount: 20.0,
                current: 100.0
            })
        );
    }

    #[test]
    fn test_non_positive_max_is_raised() {
        let pool = HealthPool::new(-3.0);
        assert_eq!(pool.max(), 1.0);
        assert_eq!(pool.fraction(), 1.0);
    }

    #[test]
    fn test_fill_to_max_revives() {
        let mut pool = HealthPool::new(10.0);
        pool.take_damage(10.0, 0.0);
        pool.fill_to_max();
        assert!(!pool.is_dead());
        assert_eq!(pool.current(), 10.0);
    }

    proptest! {
        #[test]
        fn prop_non_positive_amounts_are_noops(amount in -1000.0f32..=0.0, start in 1.0f32..100.0) {
            let mut pool = HealthPool::new(100.0).with_current(start);
            pool.take_damage(amount, 0.0);
            pool.heal(amount);
            prop_assert_eq!(pool.current(), start);
            prop_assert!(pool.drain_notifications().is_empty());
        }

        #[test]
        fn prop_health_stays_in_bounds(
            ops in prop::collection::vec((any::<bool>(), -50.0f32..200.0), 0..64),
            invuln in 0.0f32..1.0,
        ) {
            let mut pool = HealthPool::new(120.0).with_invulnerability(invuln);
            for (i, (is_damage, amount)) in ops.into_iter().enumerate() {
                let now = i as f32 * 0.1;
                if is_damage {
                    pool.take_damage(amount, now);
                } else {
                    pool.heal(amount);
                }
                prop_assert!(pool.current() >= 0.0 && pool.current() <= pool.max());
            }
        }

        #[test]
        fn prop_two_hits_inside_window_land_once(gap in 0.0f32..0.49, amount in 1.0f32..10.0) {
            let mut pool = HealthPool::new(100.0).with_invulnerability(0.5);
            pool.take_damage(amount, 2.0);
            pool.take_damage(amount, 2.0 + gap);
            prop_assert_eq!(pool.current(), 100.0 - amount);
        }
    }
}
