use std::io::Write;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use log::{debug, error, info};

use crate::configuration::Config;
use crate::error_handling::types::SessionError;
use crate::gateway::gateway_trait::Gateway;
use crate::gateway::types::Session;
use crate::session_management::classifier::{classify, idle_duration};
use crate::session_management::{SessionAction, SortDirection};

const SESSION_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z%z";

/// The sessions listed by the endpoint together with the instant they were listed.
///
/// Idle times within one run are all measured against `captured_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCapture {
    pub captured_at: DateTime<Utc>,
    pub sessions: Vec<Session>,
}

impl SessionCapture {
    pub fn new(sessions: Vec<Session>, captured_at: DateTime<Utc>) -> Self {
        Self {
            captured_at,
            sessions,
        }
    }

    pub fn find(&self, key: &str) -> Result<&Session, SessionError> {
        self.sessions
            .iter()
            .find(|session| session.key == key)
            .ok_or_else(|| SessionError::NotFound(key.to_string()))
    }

    /// Sessions ordered by last activity, ties broken by ascending key.
    pub fn sorted_by_activity(&self, direction: SortDirection) -> Vec<&Session> {
        let mut sorted: Vec<&Session> = self.sessions.iter().collect();
        sorted.sort_by(|a, b| {
            let by_activity = match direction {
                SortDirection::Ascending => a.last_active_time.cmp(&b.last_active_time),
                SortDirection::Descending => b.last_active_time.cmp(&a.last_active_time),
            };
            by_activity.then_with(|| a.key.cmp(&b.key))
        });
        sorted
    }
}

/// The structure executing session actions
///
/// One executor serves both action kinds; [`SessionAction`] selects the
/// behaviour. Remote calls go through the borrowed [`Gateway`].
///
/// # Fields Overview
///
/// - `gateway`: endpoint the sessions are listed from and terminated on
/// - `timezone`: display timezone for every rendered timestamp
/// - `max_idle`: idle threshold past which a sweep terminates a session
pub struct SessionManager<'a> {
    gateway: &'a mut dyn Gateway,
    timezone: Tz,
    max_idle: Duration,
}

impl<'a> SessionManager<'a> {
    pub fn new(gateway: &'a mut dyn Gateway, config: &Config) -> Self {
        Self {
            gateway,
            timezone: config.timezone(),
            max_idle: config.max_idle(),
        }
    }

    /// Lists the endpoint's sessions once and stamps the capture with the current time.
    pub fn capture(&self) -> Result<SessionCapture, SessionError> {
        let sessions = self.gateway.list_sessions()?;
        let capture = SessionCapture::new(sessions, Utc::now());
        debug!(
            "Captured {} session(s) at {}",
            capture.sessions.len(),
            capture.captured_at
        );
        Ok(capture)
    }

    pub fn execute<W: Write>(
        &mut self,
        action: &SessionAction,
        out: &mut W,
    ) -> Result<(), SessionError> {
        let capture = self.capture()?;
        self.execute_on(action, &capture, out)
    }

    /// Applies `action` to an existing capture.
    pub fn execute_on<W: Write>(
        &mut self,
        action: &SessionAction,
        capture: &SessionCapture,
        out: &mut W,
    ) -> Result<(), SessionError> {
        match action {
            SessionAction::View { key: Some(key), .. } => {
                self.view_session(capture.find(key)?, out)
            }
            SessionAction::View { key: None, sort } => self.view_sessions(capture, *sort, out),
            SessionAction::Nuke {
                key: Some(key),
                dry_run,
            } => self.terminate_session(capture, key, *dry_run, out),
            SessionAction::Nuke { key: None, dry_run } => {
                self.sweep_expired(capture, *dry_run, out)
            }
        }
    }

    fn view_session<W: Write>(&self, session: &Session, out: &mut W) -> Result<(), SessionError> {
        writeln!(out, "userName: {}", session.user_name)?;
        writeln!(out, "fullName: {}", session.full_name)?;
        writeln!(out, "loginTime: {}", self.format_time(session.login_time))?;
        writeln!(
            out,
            "lastActiveTime: {}",
            self.format_time(session.last_active_time)
        )?;
        writeln!(out, "ipAddress: {}", session.ip_address)?;
        writeln!(out, "userAgent: {}", session.user_agent)?;
        writeln!(out, "locale: {}", session.locale)?;
        writeln!(out, "messageLocale: {}", session.message_locale)?;
        writeln!(out, "extensionSession: {}", session.extension_session)?;
        writeln!(out, "callCount: {}", session.call_count)?;
        Ok(())
    }

    fn view_sessions<W: Write>(
        &self,
        capture: &SessionCapture,
        direction: SortDirection,
        out: &mut W,
    ) -> Result<(), SessionError> {
        for session in capture.sorted_by_activity(direction) {
            writeln!(out, "{}", self.session_line(session))?;
        }
        Ok(())
    }

    fn terminate_session<W: Write>(
        &mut self,
        capture: &SessionCapture,
        key: &str,
        dry_run: bool,
        out: &mut W,
    ) -> Result<(), SessionError> {
        let session = capture.find(key)?;
        if dry_run {
            writeln!(out, "Would terminate session {}", session.key)?;
            return Ok(());
        }

        writeln!(out, "Terminating session {}", session.key)?;
        info!("Terminating session {} of {}", session.key, session.user_name);
        match self.gateway.terminate_sessions(&[session.key.clone()]) {
            Ok(()) => {
                writeln!(out, "Session terminated")?;
                Ok(())
            }
            Err(e) => {
                error!("Failed to terminate session {}: {}", session.key, e);
                writeln!(out, "Failed to terminate session {}: {}", session.key, e)?;
                Err(e.into())
            }
        }
    }

    /// Terminates every expired session of `capture` in one batch.
    fn sweep_expired<W: Write>(
        &mut self,
        capture: &SessionCapture,
        dry_run: bool,
        out: &mut W,
    ) -> Result<(), SessionError> {
        let classification = classify(&capture.sessions, capture.captured_at, self.max_idle);
        info!(
            "{} of {} session(s) idle for more than {}h",
            classification.expired.len(),
            capture.sessions.len(),
            self.max_idle.num_hours()
        );

        if classification.expired.is_empty() {
            writeln!(out, "No expired sessions found")?;
            return Ok(());
        }

        if dry_run {
            for session in &classification.expired {
                writeln!(
                    out,
                    "{} IS EXPIRED (idle {})",
                    self.session_line(session),
                    format_idle(idle_duration(session, capture.captured_at))
                )?;
            }
            return Ok(());
        }

        let keys: Vec<String> = classification
            .expired
            .iter()
            .map(|session| session.key.clone())
            .collect();
        match self.gateway.terminate_sessions(&keys) {
            Ok(()) => {
                for session in &classification.expired {
                    writeln!(
                        out,
                        "Terminated session {} ({})",
                        session.key, session.user_name
                    )?;
                }
                writeln!(out, "Sessions terminated")?;
                Ok(())
            }
            Err(e) => {
                error!("Failed to terminate {} expired session(s): {}", keys.len(), e);
                for session in &classification.expired {
                    writeln!(out, "Failed to terminate session {}: {}", session.key, e)?;
                }
                Err(e.into())
            }
        }
    }

    fn session_line(&self, session: &Session) -> String {
        format!(
            "{:<20} {:<40} {}",
            session.user_name,
            session.key,
            self.format_time(session.last_active_time)
        )
    }

    fn format_time(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.timezone)
            .format(SESSION_TIME_FORMAT)
            .to_string()
    }
}

fn format_idle(idle: Duration) -> String {
    format!("{}h{:02}m", idle.num_hours(), idle.num_minutes() % 60)
}
