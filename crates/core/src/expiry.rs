//! Expiry classification, resend throttling and the per-application
//! reconciliation decision.
//!
//! Nothing here is stored: each run re-derives an application's situation
//! from the cached expiry, the authoritative latest expiry, the notification
//! flags and the current time. Keeping the decision pure means the same
//! inputs always produce the same [`Assessment`], which is what makes
//! re-running a reconciliation after a partial failure safe.

use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Secrets expiring within this many days are "expiring soon".
pub const DEFAULT_EXPIRY_THRESHOLD_DAYS: i64 = 30;

/// Minimum days between two notifications of the same kind.
pub const DEFAULT_RESEND_INTERVAL_DAYS: i64 = 2;

/// Upper bound for either policy duration, in days.
pub const MAX_POLICY_DAYS: i64 = 3650;

// ---------------------------------------------------------------------------
// Notification kinds and flags
// ---------------------------------------------------------------------------

/// The closed set of notifications the reconciler can send.
///
/// Each kind owns exactly one flag in [`NotificationFlags`] and one column in
/// the `tracked_applications` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// The current secret expires within the threshold window.
    Upcoming,
    /// The current secret has expired.
    Expired,
    /// A previously expired application received a new secret.
    Renewal,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 3] = [
        NotificationKind::Upcoming,
        NotificationKind::Expired,
        NotificationKind::Renewal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Upcoming => "upcoming",
            NotificationKind::Expired => "expired",
            NotificationKind::Renewal => "renewal",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// "A notification of this kind has been sent for the current expiry epoch."
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationFlags {
    pub upcoming: bool,
    pub expired: bool,
    pub renewal: bool,
}

impl NotificationFlags {
    pub fn get(&self, kind: NotificationKind) -> bool {
        match kind {
            NotificationKind::Upcoming => self.upcoming,
            NotificationKind::Expired => self.expired,
            NotificationKind::Renewal => self.renewal,
        }
    }

    /// Mark `kind` as sent. Flags are never cleared individually; see
    /// [`TrackingState::reset_for_renewal`].
    pub fn set(&mut self, kind: NotificationKind) {
        match kind {
            NotificationKind::Upcoming => self.upcoming = true,
            NotificationKind::Expired => self.expired = true,
            NotificationKind::Renewal => self.renewal = true,
        }
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Thresholds that drive classification and throttling.
///
/// Passed explicitly into the reconciler; overridable per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    /// Window before expiry in which an application is "expiring soon".
    pub expiry_threshold: Duration,
    /// Minimum time between repeated notifications of the same kind.
    pub resend_interval: Duration,
}

impl ExpiryPolicy {
    /// Build a policy from whole days. Values must lie in
    /// `0..=MAX_POLICY_DAYS`.
    pub fn from_days(expiry_threshold_days: i64, resend_interval_days: i64) -> Result<Self, CoreError> {
        Ok(Self {
            expiry_threshold: policy_days("expiry_threshold_days", expiry_threshold_days)?,
            resend_interval: policy_days("resend_interval_days", resend_interval_days)?,
        })
    }

    /// Apply per-invocation overrides on top of this policy.
    pub fn with_overrides(
        self,
        expiry_threshold_days: Option<i64>,
        resend_interval_days: Option<i64>,
    ) -> Result<Self, CoreError> {
        let threshold = expiry_threshold_days.unwrap_or(self.expiry_threshold.num_days());
        let resend = resend_interval_days.unwrap_or(self.resend_interval.num_days());
        Self::from_days(threshold, resend)
    }
}

fn policy_days(name: &str, days: i64) -> Result<Duration, CoreError> {
    if !(0..=MAX_POLICY_DAYS).contains(&days) {
        return Err(CoreError::Validation(format!(
            "{name} must be between 0 and {MAX_POLICY_DAYS}, got {days}"
        )));
    }
    Duration::try_days(days)
        .ok_or_else(|| CoreError::Validation(format!("{name} is out of range, got {days}")))
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            expiry_threshold: Duration::days(DEFAULT_EXPIRY_THRESHOLD_DAYS),
            resend_interval: Duration::days(DEFAULT_RESEND_INTERVAL_DAYS),
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// How urgent the latest expiry is relative to `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    /// `latest <= now`.
    Expired,
    /// `now < latest <= now + threshold`.
    ExpiringSoon,
    /// `latest > now + threshold`.
    FarFuture,
}

impl Urgency {
    /// The notification this urgency calls for, if any.
    pub fn notification_kind(self) -> Option<NotificationKind> {
        match self {
            Urgency::Expired => Some(NotificationKind::Expired),
            Urgency::ExpiringSoon => Some(NotificationKind::Upcoming),
            Urgency::FarFuture => None,
        }
    }
}

/// Classify `latest` against `now`. The threshold boundary is inclusive.
/// A window reaching past the representable range covers every future
/// expiry.
pub fn classify(latest: Timestamp, now: Timestamp, threshold: Duration) -> Urgency {
    if latest <= now {
        Urgency::Expired
    } else if now
        .checked_add_signed(threshold)
        .map_or(true, |window_end| latest <= window_end)
    {
        Urgency::ExpiringSoon
    } else {
        Urgency::FarFuture
    }
}

// ---------------------------------------------------------------------------
// Tracking state
// ---------------------------------------------------------------------------

/// The mutable, persisted part of a tracked application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrackingState {
    /// Last expiry observed from the authority (or planned at provisioning).
    pub cached_expiry: Option<Timestamp>,
    pub flags: NotificationFlags,
    /// Most recent notification of any kind.
    pub last_notified_at: Option<Timestamp>,
}

impl TrackingState {
    /// State of a freshly provisioned application.
    pub fn provisioned(planned_expiry: Timestamp) -> Self {
        Self {
            cached_expiry: Some(planned_expiry),
            ..Self::default()
        }
    }

    /// Whether a notification of `kind` may be sent at `now`.
    ///
    /// Due when the flag is unset, when nothing was ever sent, or when the
    /// resend interval has fully elapsed since the last notification.
    pub fn is_due(&self, kind: NotificationKind, now: Timestamp, resend_interval: Duration) -> bool {
        if !self.flags.get(kind) {
            return true;
        }
        match self.last_notified_at {
            None => true,
            Some(last) => now - last >= resend_interval,
        }
    }

    /// Record a successfully sent notification. `last_notified_at` never
    /// moves backwards.
    pub fn record_sent(&mut self, kind: NotificationKind, now: Timestamp) {
        self.flags.set(kind);
        self.last_notified_at = Some(match self.last_notified_at {
            Some(last) if last > now => last,
            _ => now,
        });
    }

    /// Start a new expiry epoch: adopt `new_expiry` and clear every flag.
    pub fn reset_for_renewal(&mut self, new_expiry: Timestamp) {
        self.cached_expiry = Some(new_expiry);
        self.flags = NotificationFlags::default();
    }
}

// ---------------------------------------------------------------------------
// Transition detection
// ---------------------------------------------------------------------------

/// How the authoritative expiry relates to the cached one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The authority reports exactly the cached value.
    Unchanged,
    /// A later expiry appeared: the previous epoch ended.
    Renewed { previous: Option<Timestamp> },
    /// A different, non-renewing value (earlier than the cache, or a first
    /// observation that is already in the past). Adopted without clearing
    /// flags.
    Adopted { previous: Option<Timestamp> },
}

/// Compare the cached expiry with the authority. Renewal needs a strictly
/// later value; with no cache, any future expiry counts as renewal.
pub fn detect_transition(cached: Option<Timestamp>, latest: Timestamp, now: Timestamp) -> Transition {
    match cached {
        Some(previous) if latest > previous => Transition::Renewed {
            previous: Some(previous),
        },
        Some(previous) if latest == previous => Transition::Unchanged,
        Some(previous) => Transition::Adopted {
            previous: Some(previous),
        },
        None if latest > now => Transition::Renewed { previous: None },
        None => Transition::Adopted { previous: None },
    }
}

// ---------------------------------------------------------------------------
// Assessment
// ---------------------------------------------------------------------------

/// Everything the reconciler needs to act on one application for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub transition: Transition,
    /// Urgency of the (possibly new) current epoch.
    pub urgency: Urgency,
    /// Send a renewal confirmation for the superseded epoch.
    pub renewal_notice: bool,
    /// Urgency notification due for the current epoch, if any.
    pub urgency_notice: Option<NotificationKind>,
    /// State after the transition, before any notification is recorded.
    pub state: TrackingState,
}

/// Decide what to do for one application given the authoritative `latest`
/// expiry.
///
/// Renewal is handled first; urgency is then evaluated against the new
/// epoch, so a renewed application can still be told its new secret expires
/// soon. At most one urgency notice is produced.
pub fn assess(
    current: &TrackingState,
    latest: Timestamp,
    now: Timestamp,
    policy: &ExpiryPolicy,
) -> Assessment {
    let transition = detect_transition(current.cached_expiry, latest, now);

    let mut state = *current;
    let mut renewal_notice = false;
    match transition {
        Transition::Renewed { .. } => {
            renewal_notice = current.flags.expired;
            state.reset_for_renewal(latest);
        }
        Transition::Adopted { .. } => state.cached_expiry = Some(latest),
        Transition::Unchanged => {}
    }

    let urgency = classify(latest, now, policy.expiry_threshold);
    let urgency_notice = urgency
        .notification_kind()
        .filter(|kind| state.is_due(*kind, now, policy.resend_interval));

    Assessment {
        transition,
        urgency,
        renewal_notice,
        urgency_notice,
        state,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    use super::*;

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn policy() -> ExpiryPolicy {
        ExpiryPolicy::default()
    }

    // -----------------------------------------------------------------------
    // classify
    // -----------------------------------------------------------------------

    #[test]
    fn threshold_boundary_is_expiring_soon() {
        let latest = now() + Duration::days(30);
        assert_eq!(classify(latest, now(), Duration::days(30)), Urgency::ExpiringSoon);
    }

    #[test]
    fn one_second_past_threshold_is_far_future() {
        let latest = now() + Duration::days(30) + Duration::seconds(1);
        assert_eq!(classify(latest, now(), Duration::days(30)), Urgency::FarFuture);
    }

    #[test]
    fn expiry_equal_to_now_is_expired() {
        assert_eq!(classify(now(), now(), Duration::days(30)), Urgency::Expired);
    }

    #[test]
    fn one_second_in_future_is_expiring_soon() {
        let latest = now() + Duration::seconds(1);
        assert_eq!(classify(latest, now(), Duration::days(30)), Urgency::ExpiringSoon);
    }

    #[test]
    fn zero_threshold_never_yields_expiring_soon() {
        let latest = now() + Duration::seconds(1);
        assert_eq!(classify(latest, now(), Duration::zero()), Urgency::FarFuture);
    }

    // -----------------------------------------------------------------------
    // is_due / record_sent
    // -----------------------------------------------------------------------

    #[test]
    fn unset_flag_is_due_even_right_after_another_notification() {
        let mut state = TrackingState::provisioned(now());
        state.record_sent(NotificationKind::Upcoming, now());
        assert!(state.is_due(NotificationKind::Expired, now(), Duration::days(2)));
    }

    #[test]
    fn set_flag_without_timestamp_is_due() {
        let mut state = TrackingState::default();
        state.flags.set(NotificationKind::Upcoming);
        assert!(state.is_due(NotificationKind::Upcoming, now(), Duration::days(2)));
    }

    #[test]
    fn set_flag_inside_resend_window_is_not_due() {
        let mut state = TrackingState::default();
        state.record_sent(NotificationKind::Upcoming, now() - Duration::days(1));
        assert!(!state.is_due(NotificationKind::Upcoming, now(), Duration::days(2)));
    }

    #[test]
    fn set_flag_exactly_at_resend_interval_is_due() {
        let mut state = TrackingState::default();
        state.record_sent(NotificationKind::Expired, now() - Duration::days(2));
        assert!(state.is_due(NotificationKind::Expired, now(), Duration::days(2)));
    }

    #[test]
    fn record_sent_never_moves_last_notified_backwards() {
        let later = now() + Duration::hours(3);
        let mut state = TrackingState::default();
        state.record_sent(NotificationKind::Upcoming, later);
        state.record_sent(NotificationKind::Expired, now());
        assert_eq!(state.last_notified_at, Some(later));
        assert!(state.flags.upcoming && state.flags.expired);
    }

    // -----------------------------------------------------------------------
    // detect_transition
    // -----------------------------------------------------------------------

    #[test]
    fn later_expiry_is_renewal() {
        let cached = now() - Duration::days(5);
        let latest = now() + Duration::days(730);
        assert_matches!(
            detect_transition(Some(cached), latest, now()),
            Transition::Renewed { previous: Some(p) } if p == cached
        );
    }

    #[test]
    fn equal_expiry_is_not_renewal() {
        let cached = now() + Duration::days(10);
        assert_eq!(detect_transition(Some(cached), cached, now()), Transition::Unchanged);
    }

    #[test]
    fn earlier_expiry_is_adopted() {
        let cached = now() + Duration::days(100);
        let latest = now() + Duration::days(10);
        assert_matches!(
            detect_transition(Some(cached), latest, now()),
            Transition::Adopted { previous: Some(_) }
        );
    }

    #[test]
    fn missing_cache_with_future_expiry_is_renewal() {
        let latest = now() + Duration::days(1);
        assert_eq!(
            detect_transition(None, latest, now()),
            Transition::Renewed { previous: None }
        );
    }

    #[test]
    fn missing_cache_with_past_expiry_is_adopted() {
        let latest = now() - Duration::days(1);
        assert_eq!(
            detect_transition(None, latest, now()),
            Transition::Adopted { previous: None }
        );
    }

    // -----------------------------------------------------------------------
    // assess
    // -----------------------------------------------------------------------

    #[test]
    fn fresh_expiring_secret_gets_upcoming_notice() {
        let expiry = now() + Duration::days(10);
        let state = TrackingState::provisioned(expiry);

        let assessment = assess(&state, expiry, now(), &policy());

        assert_eq!(assessment.transition, Transition::Unchanged);
        assert_eq!(assessment.urgency, Urgency::ExpiringSoon);
        assert!(!assessment.renewal_notice);
        assert_eq!(assessment.urgency_notice, Some(NotificationKind::Upcoming));
        assert_eq!(assessment.state, state);
    }

    #[test]
    fn throttled_repeat_is_suppressed() {
        let expiry = now() + Duration::days(10);
        let mut state = TrackingState::provisioned(expiry);
        state.record_sent(NotificationKind::Upcoming, now());

        let assessment = assess(&state, expiry, now() + Duration::days(1), &policy());

        assert_eq!(assessment.urgency_notice, None);
        assert_eq!(assessment.state, state);
    }

    #[test]
    fn repeat_is_resent_once_interval_elapses() {
        let expiry = now() + Duration::days(10);
        let mut state = TrackingState::provisioned(expiry);
        state.record_sent(NotificationKind::Upcoming, now());

        let assessment = assess(&state, expiry, now() + Duration::days(2), &policy());

        assert_eq!(assessment.urgency_notice, Some(NotificationKind::Upcoming));
    }

    #[test]
    fn renewal_after_expiry_confirms_and_resets_flags() {
        let mut state = TrackingState::provisioned(now() - Duration::days(5));
        state.record_sent(NotificationKind::Expired, now() - Duration::days(3));
        let latest = now() + Duration::days(730);

        let assessment = assess(&state, latest, now(), &policy());

        assert_matches!(assessment.transition, Transition::Renewed { .. });
        assert!(assessment.renewal_notice);
        assert_eq!(assessment.urgency, Urgency::FarFuture);
        assert_eq!(assessment.urgency_notice, None);
        assert_eq!(assessment.state.cached_expiry, Some(latest));
        assert_eq!(assessment.state.flags, NotificationFlags::default());
        assert_eq!(assessment.state.last_notified_at, state.last_notified_at);
    }

    #[test]
    fn renewal_without_prior_expired_notice_is_silent() {
        let mut state = TrackingState::provisioned(now() + Duration::days(5));
        state.record_sent(NotificationKind::Upcoming, now() - Duration::hours(1));
        let latest = now() + Duration::days(730);

        let assessment = assess(&state, latest, now(), &policy());

        assert!(!assessment.renewal_notice);
        assert!(!assessment.state.flags.upcoming);
    }

    #[test]
    fn renewal_into_expiring_soon_epoch_also_warns() {
        let mut state = TrackingState::provisioned(now() - Duration::days(1));
        state.record_sent(NotificationKind::Expired, now() - Duration::hours(2));
        let latest = now() + Duration::days(7);

        let assessment = assess(&state, latest, now(), &policy());

        assert!(assessment.renewal_notice);
        assert_eq!(assessment.urgency, Urgency::ExpiringSoon);
        assert_eq!(assessment.urgency_notice, Some(NotificationKind::Upcoming));
    }

    #[test]
    fn expired_application_gets_expired_notice_not_upcoming() {
        let expiry = now() - Duration::minutes(1);
        let mut state = TrackingState::provisioned(expiry);
        state.record_sent(NotificationKind::Upcoming, now() - Duration::hours(1));

        let assessment = assess(&state, expiry, now(), &policy());

        assert_eq!(assessment.urgency, Urgency::Expired);
        assert_eq!(assessment.urgency_notice, Some(NotificationKind::Expired));
    }

    #[test]
    fn earlier_truth_is_adopted_and_keeps_flags() {
        let mut state = TrackingState::provisioned(now() + Duration::days(100));
        state.record_sent(NotificationKind::Upcoming, now() - Duration::hours(1));
        let latest = now() + Duration::days(20);

        let assessment = assess(&state, latest, now(), &policy());

        assert_matches!(assessment.transition, Transition::Adopted { .. });
        assert_eq!(assessment.state.cached_expiry, Some(latest));
        assert!(assessment.state.flags.upcoming);
        assert_eq!(assessment.urgency_notice, None);
    }

    #[test]
    fn far_future_needs_nothing() {
        let expiry = now() + Duration::days(400);
        let state = TrackingState::provisioned(expiry);

        let assessment = assess(&state, expiry, now(), &policy());

        assert_eq!(assessment.urgency, Urgency::FarFuture);
        assert_eq!(assessment.urgency_notice, None);
        assert!(!assessment.renewal_notice);
    }

    // -----------------------------------------------------------------------
    // ExpiryPolicy
    // -----------------------------------------------------------------------

    #[test]
    fn default_policy_matches_documented_defaults() {
        let p = ExpiryPolicy::default();
        assert_eq!(p.expiry_threshold, Duration::days(30));
        assert_eq!(p.resend_interval, Duration::days(2));
    }

    #[test]
    fn overrides_replace_only_given_values() {
        let p = ExpiryPolicy::default().with_overrides(Some(7), None).unwrap();
        assert_eq!(p.expiry_threshold, Duration::days(7));
        assert_eq!(p.resend_interval, Duration::days(2));
    }

    #[test]
    fn negative_days_are_rejected() {
        assert_matches!(ExpiryPolicy::from_days(-1, 2), Err(CoreError::Validation(_)));
        assert_matches!(ExpiryPolicy::from_days(30, -2), Err(CoreError::Validation(_)));
    }

    #[test]
    fn oversized_days_are_rejected_not_panicking() {
        assert_matches!(ExpiryPolicy::from_days(i64::MAX, 2), Err(CoreError::Validation(_)));
        assert_matches!(
            ExpiryPolicy::from_days(100_000_000_000, 2),
            Err(CoreError::Validation(_))
        );
        assert_matches!(ExpiryPolicy::from_days(30, i64::MAX), Err(CoreError::Validation(_)));
        assert_matches!(
            ExpiryPolicy::default().with_overrides(Some(MAX_POLICY_DAYS + 1), None),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn upper_bound_is_accepted() {
        let p = ExpiryPolicy::from_days(MAX_POLICY_DAYS, MAX_POLICY_DAYS).unwrap();
        assert_eq!(p.expiry_threshold, Duration::days(MAX_POLICY_DAYS));
    }

    #[test]
    fn window_past_representable_range_counts_as_expiring_soon() {
        let huge = Duration::MAX;
        assert_eq!(classify(now() + Duration::days(1), now(), huge), Urgency::ExpiringSoon);
        assert_eq!(classify(now(), now(), huge), Urgency::Expired);
    }

    #[test]
    fn kind_names_are_stable() {
        let names: Vec<_> = NotificationKind::ALL.iter().map(|k| k.to_string()).collect();
        assert_eq!(names, ["upcoming", "expired", "renewal"]);
    }
}
