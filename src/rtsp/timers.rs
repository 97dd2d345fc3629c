//! RTSP session timer bookkeeping: the 1 s-granularity reaper (30 s idle),
//! M16 keep-alive at half the negotiated session timeout, and the 2 s
//! TEARDOWN grace period. Modeled as deadlines checked on each `tick()` call
//! from the owning Looper, not as spawned timer threads.
pub const IDLE_TIMEOUT_MS: i64 = 30_000;
pub const TEARDOWN_GRACE_MS: i64 = 2_000;
pub const DEFAULT_SESSION_TIMEOUT_S: i64 = 60;

pub struct SessionTimers {
    last_activity_ms: i64,
    session_timeout_s: i64,
    last_keep_alive_ms: Option<i64>,
    teardown_deadline_ms: Option<i64>,
}

impl SessionTimers {
    #[must_use]
    pub fn new(now_ms: i64, session_timeout_s: i64) -> Self {
        Self {
            last_activity_ms: now_ms,
            session_timeout_s,
            last_keep_alive_ms: None,
            teardown_deadline_ms: None,
        }
    }

    pub fn record_activity(&mut self, now_ms: i64) {
        self.last_activity_ms = now_ms;
    }

    /// 1 s-granularity reaper: true once the session has been idle past
    /// `IDLE_TIMEOUT_MS`.
    #[must_use]
    pub fn is_idle_expired(&self, now_ms: i64) -> bool {
        now_ms - self.last_activity_ms >= IDLE_TIMEOUT_MS
    }

    /// M16: true once `session_timeout/2` has elapsed since the last
    /// keep-alive (or since session start, if none sent yet).
    #[must_use]
    pub fn keep_alive_due(&self, now_ms: i64) -> bool {
        let interval_ms = self.session_timeout_s * 1000 / 2;
        match self.last_keep_alive_ms {
            None => now_ms - self.last_activity_ms >= interval_ms,
            Some(last) => now_ms - last >= interval_ms,
        }
    }

    pub fn record_keep_alive(&mut self, now_ms: i64) {
        self.last_keep_alive_ms = Some(now_ms);
    }

    /// TEARDOWN trigger fired: grants the peer `TEARDOWN_GRACE_MS` before a
    /// forced disconnect.
    pub fn arm_teardown_grace(&mut self, now_ms: i64) {
        self.teardown_deadline_ms = Some(now_ms + TEARDOWN_GRACE_MS);
    }

    #[must_use]
    pub fn teardown_grace_expired(&self, now_ms: i64) -> bool {
        self.teardown_deadline_ms.is_some_and(|deadline| now_ms >= deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_reaper_fires_after_30s() {
        let timers = SessionTimers::new(0, 60);
        assert!(!timers.is_idle_expired(IDLE_TIMEOUT_MS - 1));
        assert!(timers.is_idle_expired(IDLE_TIMEOUT_MS));
    }

    #[test]
    fn keep_alive_due_at_half_session_timeout() {
        let timers = SessionTimers::new(0, 60);
        assert!(!timers.keep_alive_due(29_999));
        assert!(timers.keep_alive_due(30_000));
    }

    #[test]
    fn teardown_grace_expires_after_2s() {
        let mut timers = SessionTimers::new(0, 60);
        timers.arm_teardown_grace(1_000);
        assert!(!timers.teardown_grace_expired(2_999));
        assert!(timers.teardown_grace_expired(3_000));
    }

    #[test]
    fn activity_resets_idle_window() {
        let mut timers = SessionTimers::new(0, 60);
        timers.record_activity(20_000);
        assert!(!timers.is_idle_expired(49_999));
        assert!(timers.is_idle_expired(50_000));
    }
}
