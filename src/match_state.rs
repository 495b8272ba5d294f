use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::protocol::{MatchEndReason, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    Created,
    Running,
    Ended,
}

/// One per room, created on room formation. `CREATED -> RUNNING -> ENDED`;
/// `EndMatch` is idempotent and fixes the end reason on its first call.
#[derive(Debug, Clone)]
pub struct Match {
    phase: MatchPhase,
    kill_target: u32,
    time_limit: Duration,
    started_at: Option<Instant>,
    scores: HashMap<PlayerId, u32>,
    end_reason: Option<MatchEndReason>,
    ended_at: Option<Instant>,
}

impl Match {
    pub fn new(kill_target: u32, time_limit: Duration) -> Self {
        Self {
            phase: MatchPhase::Created,
            kill_target,
            time_limit,
            started_at: None,
            scores: HashMap::new(),
            end_reason: None,
            ended_at: None,
        }
    }

    pub fn start(&mut self, now: Instant) {
        if self.phase == MatchPhase::Created {
            self.phase = MatchPhase::Running;
            self.started_at = Some(now);
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == MatchPhase::Running
    }

    pub fn is_ended(&self) -> bool {
        self.phase == MatchPhase::Ended
    }

    pub fn end_reason(&self) -> Option<MatchEndReason> {
        self.end_reason
    }

    /// Credits one kill to `attacker_id`; a no-op once the match isn't
    /// running (ended or not yet started).
    pub fn add_kill(&mut self, attacker_id: PlayerId) {
        if self.is_running() {
            *self.scores.entry(attacker_id).or_insert(0) += 1;
        }
    }

    pub fn check_kill_target(&self) -> bool {
        self.scores.values().any(|&s| s >= self.kill_target)
    }

    pub fn elapsed_exceeded(&self, now: Instant) -> bool {
        match self.started_at {
            Some(started_at) => now.saturating_duration_since(started_at) >= self.time_limit,
            None => false,
        }
    }

    pub fn remaining_seconds(&self, now: Instant) -> u64 {
        let Some(started_at) = self.started_at else {
            return self.time_limit.as_secs();
        };
        let elapsed = now.saturating_duration_since(started_at);
        self.time_limit.saturating_sub(elapsed).as_secs()
    }

    /// Ends the match, returning `true` iff this call is the one that
    /// actually transitioned it (so the caller knows whether to broadcast).
    pub fn end_match(&mut self, reason: MatchEndReason) -> bool {
        if self.is_ended() {
            return false;
        }
        self.phase = MatchPhase::Ended;
        self.end_reason = Some(reason);
        self.ended_at = Some(Instant::now());
        true
    }

    /// When the match transitioned to `Ended`, if it has. Used by the
    /// room-cleanup sweep to prune rooms once their match has been over for
    /// longer than its grace period.
    pub fn ended_at(&self) -> Option<Instant> {
        self.ended_at
    }

    /// All ids tied for the highest score. Empty if nobody has scored.
    pub fn winners(&self) -> Vec<PlayerId> {
        let Some(&max) = self.scores.values().max() else {
            return Vec::new();
        };
        if max == 0 {
            return Vec::new();
        }
        self.scores
            .iter()
            .filter(|(_, &score)| score == max)
            .map(|(&id, _)| id)
            .collect()
    }

    pub fn scores_snapshot(&self) -> HashMap<PlayerId, u32> {
        self.scores.clone()
    }

    pub fn kill_target(&self) -> u32 {
        self.kill_target
    }

    pub fn time_limit_secs(&self) -> u64 {
        self.time_limit.as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kill_target_reached_after_enough_kills() {
        let mut m = Match::new(3, Duration::from_secs(420));
        m.start(Instant::now());
        let id = PlayerId::new_v4();
        for _ in 0..3 {
            m.add_kill(id);
        }
        assert!(m.check_kill_target());
    }

    #[test]
    fn kills_before_start_are_ignored() {
        let mut m = Match::new(1, Duration::from_secs(420));
        m.add_kill(PlayerId::new_v4());
        assert!(!m.check_kill_target());
    }

    #[test]
    fn end_match_is_idempotent_and_fixes_first_reason() {
        let mut m = Match::new(1, Duration::from_secs(420));
        m.start(Instant::now());
        assert!(m.end_match(MatchEndReason::KillTarget));
        assert!(!m.end_match(MatchEndReason::TimeLimit));
        assert_eq!(m.end_reason(), Some(MatchEndReason::KillTarget));
    }

    #[test]
    fn winners_includes_all_ties() {
        let mut m = Match::new(10, Duration::from_secs(420));
        m.start(Instant::now());
        let a = PlayerId::new_v4();
        let b = PlayerId::new_v4();
        let c = PlayerId::new_v4();
        m.add_kill(a);
        m.add_kill(b);
        m.add_kill(c);
        m.add_kill(a);
        m.add_kill(b);
        let winners = m.winners();
        assert_eq!(winners.len(), 2);
        assert!(winners.contains(&a));
        assert!(winners.contains(&b));
    }

    #[test]
    fn elapsed_exceeded_respects_time_limit() {
        let mut m = Match::new(10, Duration::from_millis(100));
        let t0 = Instant::now();
        m.start(t0);
        assert!(!m.elapsed_exceeded(t0 + Duration::from_millis(50)));
        assert!(m.elapsed_exceeded(t0 + Duration::from_millis(150)));
    }

    #[test]
    fn kills_after_end_do_not_change_scores() {
        let mut m = Match::new(1, Duration::from_secs(420));
        m.start(Instant::now());
        let id = PlayerId::new_v4();
        m.add_kill(id);
        m.end_match(MatchEndReason::Manual);
        m.add_kill(id);
        assert_eq!(m.scores_snapshot().get(&id), Some(&1));
    }
}
