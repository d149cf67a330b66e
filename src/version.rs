//! Certificate version records and rollover-aware version selection.
//!
//! This is the decision core of the crate, kept free of any vault types so it
//! can be exercised against plain in-memory version lists. The rules:
//!
//! - Only enabled versions are ever eligible, for signing or validation.
//! - Signing prefers the most recent version that has existed for at least
//!   the rollover window, so validators (whose caches may be stale by up to
//!   their own cache window) have had time to learn the key before it signs.
//! - If no version has passed the window (a freshly created certificate),
//!   signing falls back to the most recent enabled version rather than
//!   blocking token issuance.
//! - Validation accepts every enabled version, newest first, so tokens
//!   signed under a rotated-out key remain verifiable.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One immutable snapshot of a named certificate as stored in the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateVersion {
    /// Certificate name (vault path component).
    pub name: String,

    /// Version identifier within the certificate's history.
    pub version: String,

    /// Whether the vault reports this version as usable.
    pub enabled: bool,

    /// Version creation time. Versions without one are ineligible for the
    /// passed-rollover rule but remain usable as a signing fallback.
    pub created_at: Option<DateTime<Utc>>,
}

impl CertificateVersion {
    /// Key identifier in `<name>/v<version>` form, suitable as a JWT `kid`.
    pub fn key_id(&self) -> String {
        format!("{}/v{}", self.name, self.version)
    }
}

/// Returns the enabled versions sorted most-recent-first.
///
/// Versions without a creation timestamp sort last. The sort is stable, so
/// untimestamped versions keep their incoming relative order.
fn enabled_most_recent_first(versions: &[CertificateVersion]) -> Vec<CertificateVersion> {
    let mut enabled: Vec<CertificateVersion> =
        versions.iter().filter(|v| v.enabled).cloned().collect();
    enabled.sort_by(|a, b| match (a.created_at, b.created_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    enabled
}

/// Selects the certificate version that should currently sign.
///
/// Scans the enabled versions newest-first for the first one created before
/// `now - rollover_window`. If none qualifies the most recent enabled
/// version is returned as a fallback, accepting a brief period where other
/// validators may not have the key cached yet. Returns `None` only when no
/// version is enabled, which callers must treat as "no usable key material".
pub fn select_signing_version(
    versions: &[CertificateVersion],
    rollover_window: Duration,
    now: DateTime<Utc>,
) -> Option<CertificateVersion> {
    let enabled = enabled_most_recent_first(versions);
    if enabled.is_empty() {
        return None;
    }

    let cutoff = now - rollover_window;
    let past_rollover = enabled.iter().find(|v| match v.created_at {
        Some(created) => created < cutoff,
        None => false,
    });

    match past_rollover {
        Some(version) => Some(version.clone()),
        // Newly created certificate: nothing has aged past the window yet,
        // but signing must not block. Use the most recent enabled version.
        None => enabled.into_iter().next(),
    }
}

/// Returns every enabled version, most-recent-first, for signature
/// validation. Unfiltered by rollover: tokens signed under any previously
/// active key must stay verifiable.
pub fn select_validation_versions(versions: &[CertificateVersion]) -> Vec<CertificateVersion> {
    enabled_most_recent_first(versions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn version(v: &str, enabled: bool, age_hours: Option<i64>) -> CertificateVersion {
        CertificateVersion {
            name: "signing-cert".to_string(),
            version: v.to_string(),
            enabled,
            created_at: age_hours.map(|h| Utc::now() - Duration::hours(h)),
        }
    }

    #[test]
    fn test_key_id_format() {
        let v = version("3", true, Some(1));
        assert_eq!(v.key_id(), "signing-cert/v3");
    }

    #[test]
    fn test_signing_prefers_most_recent_past_rollover() {
        // v1 is 40h old, v2 is 2h old; with a 24h window v1 signs.
        let versions = vec![version("1", true, Some(40)), version("2", true, Some(2))];
        let selected =
            select_signing_version(&versions, Duration::hours(24), Utc::now()).unwrap();
        assert_eq!(selected.version, "1");
    }

    #[test]
    fn test_signing_picks_newest_among_past_rollover() {
        let versions = vec![
            version("1", true, Some(100)),
            version("2", true, Some(40)),
            version("3", true, Some(2)),
        ];
        let selected =
            select_signing_version(&versions, Duration::hours(24), Utc::now()).unwrap();
        assert_eq!(selected.version, "2");
    }

    #[test]
    fn test_signing_falls_back_to_newest_when_none_past_rollover() {
        // Freshly created certificate: only a 2h-old version exists.
        let versions = vec![version("1", true, Some(2))];
        let selected =
            select_signing_version(&versions, Duration::hours(24), Utc::now()).unwrap();
        assert_eq!(selected.version, "1");
    }

    #[test]
    fn test_signing_returns_none_when_nothing_enabled() {
        let versions = vec![version("1", false, Some(40)), version("2", false, Some(2))];
        assert!(select_signing_version(&versions, Duration::hours(24), Utc::now()).is_none());
        assert!(select_signing_version(&[], Duration::hours(24), Utc::now()).is_none());
    }

    #[test]
    fn test_disabled_versions_never_selected() {
        // The oldest version is disabled; selection must skip it even though
        // it is the only one past the rollover window.
        let versions = vec![version("1", false, Some(40)), version("2", true, Some(2))];
        let selected =
            select_signing_version(&versions, Duration::hours(24), Utc::now()).unwrap();
        assert_eq!(selected.version, "2");
    }

    #[test]
    fn test_untimestamped_version_ineligible_for_rollover_rule() {
        // No created_at means the version cannot satisfy "passed rollover",
        // but it remains a fallback when nothing else is enabled.
        let versions = vec![version("1", true, None), version("2", true, Some(2))];
        let selected =
            select_signing_version(&versions, Duration::hours(24), Utc::now()).unwrap();
        assert_eq!(selected.version, "2");

        let only_untimestamped = vec![version("1", true, None)];
        let selected =
            select_signing_version(&only_untimestamped, Duration::hours(24), Utc::now()).unwrap();
        assert_eq!(selected.version, "1");
    }

    #[test]
    fn test_validation_returns_all_enabled_most_recent_first() {
        let versions = vec![
            version("1", true, Some(40)),
            version("2", false, Some(20)),
            version("3", true, Some(2)),
            version("4", true, None),
        ];
        let validation = select_validation_versions(&versions);
        let order: Vec<&str> = validation.iter().map(|v| v.version.as_str()).collect();
        assert_eq!(order, vec!["3", "1", "4"]);
    }

    #[test]
    fn test_validation_empty_when_nothing_enabled() {
        let versions = vec![version("1", false, Some(40))];
        assert!(select_validation_versions(&versions).is_empty());
    }

    #[test]
    fn test_rollover_scenario_from_rotation_history() {
        // Typical rollover: v2 was rotated in 2h ago, v1 is 40h old.
        // Signing stays on v1 for the 24h window; validation covers both.
        let versions = vec![version("1", true, Some(40)), version("2", true, Some(2))];
        let signing =
            select_signing_version(&versions, Duration::hours(24), Utc::now()).unwrap();
        assert_eq!(signing.version, "1");

        let validation = select_validation_versions(&versions);
        let order: Vec<&str> = validation.iter().map(|v| v.version.as_str()).collect();
        assert_eq!(order, vec!["2", "1"]);
        assert!(validation.contains(&signing));
    }

    proptest! {
        #[test]
        fn prop_selected_version_is_enabled(
            entries in prop::collection::vec((any::<bool>(), prop::option::of(0i64..200)), 0..12)
        ) {
            let versions: Vec<CertificateVersion> = entries
                .iter()
                .enumerate()
                .map(|(i, (enabled, age))| version(&i.to_string(), *enabled, *age))
                .collect();

            if let Some(selected) =
                select_signing_version(&versions, Duration::hours(24), Utc::now())
            {
                prop_assert!(selected.enabled);
            } else {
                prop_assert!(versions.iter().all(|v| !v.enabled));
            }
        }

        #[test]
        fn prop_signing_version_contained_in_validation_set(
            entries in prop::collection::vec((any::<bool>(), prop::option::of(0i64..200)), 0..12)
        ) {
            let versions: Vec<CertificateVersion> = entries
                .iter()
                .enumerate()
                .map(|(i, (enabled, age))| version(&i.to_string(), *enabled, *age))
                .collect();

            let validation = select_validation_versions(&versions);
            if let Some(selected) =
                select_signing_version(&versions, Duration::hours(24), Utc::now())
            {
                prop_assert!(validation.contains(&selected));
            }
        }

        #[test]
        fn prop_selection_prefers_aged_versions(
            entries in prop::collection::vec((any::<bool>(), prop::option::of(0i64..200)), 1..12)
        ) {
            let now = Utc::now();
            let window = Duration::hours(24);
            let versions: Vec<CertificateVersion> = entries
                .iter()
                .enumerate()
                .map(|(i, (enabled, age))| version(&i.to_string(), *enabled, *age))
                .collect();

            let aged: Vec<&CertificateVersion> = versions
                .iter()
                .filter(|v| v.enabled && v.created_at.map(|c| c < now - window).unwrap_or(false))
                .collect();

            if let Some(selected) = select_signing_version(&versions, window, now) {
                if !aged.is_empty() {
                    // Must be the most recent among those past the window.
                    let newest_aged =
                        aged.iter().max_by_key(|v| v.created_at.unwrap()).unwrap();
                    prop_assert_eq!(selected.created_at, newest_aged.created_at);
                    prop_assert!(selected.created_at.unwrap() < now - window);
                }
            }
        }
    }
}
