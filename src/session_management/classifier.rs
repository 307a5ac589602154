//! Idle-time classification of sessions.
//!
//! Classification is a pure function of the sessions, the reference instant
//! and the threshold. All timestamps are UTC instants, so the subtraction is
//! free of offset skew.

use chrono::{DateTime, Duration, Utc};

use crate::gateway::types::Session;

/// Sessions split by idle time, each side in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification<'a> {
    pub expired: Vec<&'a Session>,
    pub live: Vec<&'a Session>,
}

/// Time elapsed between the session's last activity and `now`.
pub fn idle_duration(session: &Session, now: DateTime<Utc>) -> Duration {
    now - session.last_active_time
}

/// A session is expired once idle for strictly longer than `max_idle`.
pub fn is_expired(session: &Session, now: DateTime<Utc>, max_idle: Duration) -> bool {
    idle_duration(session, now) > max_idle
}

pub fn classify(sessions: &[Session], now: DateTime<Utc>, max_idle: Duration) -> Classification<'_> {
    let (expired, live): (Vec<&Session>, Vec<&Session>) = sessions
        .iter()
        .partition(|session| is_expired(session, now, max_idle));
    Classification { expired, live }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session(key: &str, last_active: DateTime<Utc>) -> Session {
        Session {
            key: key.to_string(),
            user_name: format!("VSPHERE.LOCAL\\{}", key),
            full_name: String::new(),
            login_time: last_active - Duration::hours(1),
            last_active_time: last_active,
            ip_address: String::from("10.0.0.5"),
            user_agent: String::from("pyvmomi"),
            locale: String::from("en"),
            message_locale: String::from("en"),
            extension_session: false,
            call_count: 3,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn keys(sessions: &[&Session]) -> Vec<String> {
        sessions.iter().map(|s| s.key.clone()).collect()
    }

    #[test]
    fn test_threshold_is_strict() {
        let sessions = vec![
            session("stale", now() - Duration::hours(25)),
            session("boundary", now() - Duration::hours(24)),
            session("fresh", now() - Duration::minutes(5)),
            session("just-over", now() - Duration::hours(24) - Duration::seconds(1)),
        ];
        let classification = classify(&sessions, now(), Duration::hours(24));

        assert_eq!(keys(&classification.expired), vec!["stale", "just-over"]);
        assert_eq!(keys(&classification.live), vec!["boundary", "fresh"]);
    }

    #[test]
    fn test_idle_duration_uses_reference_instant() {
        let s = session("a", now() - Duration::minutes(90));
        assert_eq!(idle_duration(&s, now()), Duration::minutes(90));
        assert_eq!(
            idle_duration(&s, now() + Duration::hours(1)),
            Duration::minutes(150)
        );
    }

    #[test]
    fn test_classification_independent_of_order() {
        let mut sessions = vec![
            session("a", now() - Duration::hours(30)),
            session("b", now() - Duration::hours(2)),
            session("c", now() - Duration::hours(48)),
        ];
        let forward = classify(&sessions, now(), Duration::hours(24));
        let mut expired = keys(&forward.expired);
        expired.sort();

        sessions.reverse();
        let backward = classify(&sessions, now(), Duration::hours(24));
        let mut reversed = keys(&backward.expired);
        reversed.sort();

        assert_eq!(expired, reversed);
        assert_eq!(expired, vec!["a", "c"]);
    }

    #[test]
    fn test_empty_input() {
        let classification = classify(&[], now(), Duration::hours(1));
        assert!(classification.expired.is_empty());
        assert!(classification.live.is_empty());
    }
}
