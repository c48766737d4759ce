//! Prometheus metrics collection for rosterd.
//!
//! Tracks roster activity (admissions, rejections, promotions), session
//! lifecycle and notification fan-out. Served on `/metrics` by the API
//! server for Prometheus scraping.

use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

/// Admissions by landing list (players/waitlist).
pub static JOINS: OnceLock<IntCounterVec> = OnceLock::new();

/// Rejected mutations by error code.
pub static REJECTIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Waitlist entries moved into the main list.
pub static PROMOTIONS: OnceLock<IntCounter> = OnceLock::new();

/// Withdrawals (each removed entry counts, so a host+guest leave is 2).
pub static WITHDRAWALS: OnceLock<IntCounter> = OnceLock::new();

/// Sessions created.
pub static SESSIONS_CREATED: OnceLock<IntCounter> = OnceLock::new();

/// Sessions closed, by reason (manual/stale).
pub static SESSIONS_CLOSED: OnceLock<IntCounterVec> = OnceLock::new();

/// Notifications queued for users.
pub static NOTIFICATIONS_SENT: OnceLock<IntCounter> = OnceLock::new();

/// Attendance reconciliations applied.
pub static ATTENDANCE_UPDATES: OnceLock<IntCounter> = OnceLock::new();

// ========================================================================
// Gauges (can increase/decrease)
// ========================================================================

/// Sessions currently accepting mutations.
pub static OPEN_SESSIONS: OnceLock<IntGauge> = OnceLock::new();

/// Main-list headcount per session (gauge).
pub static SESSION_PLAYERS: OnceLock<IntGaugeVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at daemon startup before any metrics are recorded.
pub fn init() {
    let r = registry();

    // Helper macro to register metric
    macro_rules! register {
        ($metric:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($metric), " creation failed"));
            if let Err(e) = r.register(Box::new(m.clone())) {
                tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
            }
            let _ = $metric.set(m);
        };
    }

    register!(JOINS, IntCounterVec::new(Opts::new("roster_joins_total", "Admissions by landing list"), &["placement"]));
    register!(REJECTIONS, IntCounterVec::new(Opts::new("roster_rejections_total", "Rejected mutations by error code"), &["code"]));
    register!(PROMOTIONS, IntCounter::new("roster_promotions_total", "Waitlist entries promoted to the main list"));
    register!(WITHDRAWALS, IntCounter::new("roster_withdrawals_total", "Roster entries removed by leave operations"));
    register!(SESSIONS_CREATED, IntCounter::new("roster_sessions_created_total", "Sessions created"));
    register!(SESSIONS_CLOSED, IntCounterVec::new(Opts::new("roster_sessions_closed_total", "Sessions closed by reason"), &["reason"]));
    register!(NOTIFICATIONS_SENT, IntCounter::new("roster_notifications_total", "Notifications queued for users"));
    register!(ATTENDANCE_UPDATES, IntCounter::new("roster_attendance_updates_total", "Attendance reconciliations applied"));
    register!(OPEN_SESSIONS, IntGauge::new("roster_open_sessions", "Sessions currently accepting mutations"));
    register!(SESSION_PLAYERS, IntGaugeVec::new(Opts::new("roster_session_players", "Main-list headcount per session"), &["session"]));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions for roster metric updates
// ============================================================================

/// Record a successful admission.
#[inline]
pub fn record_join(placement: &str) {
    if let Some(c) = JOINS.get() {
        c.with_label_values(&[placement]).inc();
    }
}

/// Record a rejected mutation.
#[inline]
pub fn record_rejection(code: &str) {
    if let Some(c) = REJECTIONS.get() {
        c.with_label_values(&[code]).inc();
    }
}

/// Record waitlist promotions.
#[inline]
pub fn record_promotions(count: usize) {
    if count == 0 {
        return;
    }
    if let Some(c) = PROMOTIONS.get() {
        c.inc_by(count as u64);
    }
}

/// Record removed roster entries.
#[inline]
pub fn record_withdrawals(count: usize) {
    if let Some(c) = WITHDRAWALS.get() {
        c.inc_by(count as u64);
    }
}

/// Record a session creation.
#[inline]
pub fn record_session_created() {
    if let Some(c) = SESSIONS_CREATED.get() {
        c.inc();
    }
    if let Some(g) = OPEN_SESSIONS.get() {
        g.inc();
    }
}

/// Set the open-sessions gauge (startup reconciliation).
#[inline]
pub fn set_open_sessions(count: i64) {
    if let Some(g) = OPEN_SESSIONS.get() {
        g.set(count);
    }
}

/// Record a session close.
#[inline]
pub fn record_session_closed(reason: &str) {
    if let Some(c) = SESSIONS_CLOSED.get() {
        c.with_label_values(&[reason]).inc();
    }
    if let Some(g) = OPEN_SESSIONS.get() {
        g.dec();
    }
}

/// Record queued notifications.
#[inline]
pub fn record_notifications(count: usize) {
    if count == 0 {
        return;
    }
    if let Some(c) = NOTIFICATIONS_SENT.get() {
        c.inc_by(count as u64);
    }
}

/// Update a session's main-list headcount gauge.
#[inline]
pub fn set_session_players(session: &str, count: i64) {
    if let Some(g) = SESSION_PLAYERS.get() {
        g.with_label_values(&[session]).set(count);
    }
}

/// Record an applied attendance reconciliation.
#[inline]
pub fn record_attendance_update() {
    if let Some(c) = ATTENDANCE_UPDATES.get() {
        c.inc();
    }
}
