//! Collision-safe, length-bounded names for replica resources
//!
//! A name that fits the provider limit is used verbatim. One that does not is
//! truncated and tagged with a short digest of the full base, so two long
//! names sharing a prefix (`{vm}_DataDisk_0` / `{vm}_DataDisk_1`) still map to
//! different resources. The digest is taken over the lowercased base, which
//! keeps names stable across re-runs whatever casing the provider reports.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Provider length ceiling for disk, snapshot and NIC names
pub const MAX_NAME_LEN: usize = 80;

/// Hex characters of the base digest kept in truncated names
const DIGEST_CHARS: usize = 8;

/// Fixed-width timestamp format used in copy-artifact names
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Characters a name may not end with
const TRAILING_JUNK: [char; 3] = ['-', '.', '_'];

fn digest(base: &str) -> String {
    Sha256::digest(base.to_ascii_lowercase().as_bytes())
        .iter()
        .take(DIGEST_CHARS / 2)
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// `{base}{suffix}`, or `{truncated base}-{digest}{suffix}` when that would
/// exceed `max` characters
pub fn bounded_name(base: &str, suffix: &str, max: usize) -> String {
    let suffix_len = suffix.chars().count();
    if base.chars().count() + suffix_len <= max {
        return format!("{}{}", base, suffix);
    }

    let tag = format!("-{}", digest(base));
    let budget = max.saturating_sub(suffix_len + tag.len());
    let truncated: String = base.chars().take(budget).collect();
    format!("{}{}{}", truncated.trim_end_matches(TRAILING_JUNK), tag, suffix)
}

/// Fixed-width timestamp suffix component
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Snapshot name: `{disk}-snap-{YYYYMMDDHHMMSS}`
pub fn snapshot_name(disk_name: &str, at: DateTime<Utc>) -> String {
    bounded_name(disk_name, &format!("-snap-{}", timestamp(at)), MAX_NAME_LEN)
}

/// Restore point collection name: `{vm}-rpc-{YYYYMMDDHHMMSS}`
pub fn restore_point_collection_name(vm_name: &str, at: DateTime<Utc>) -> String {
    bounded_name(vm_name, &format!("-rpc-{}", timestamp(at)), MAX_NAME_LEN)
}

/// Restore point name: `{vm}-rp-{YYYYMMDDHHMMSS}`
pub fn restore_point_name(vm_name: &str, at: DateTime<Utc>) -> String {
    bounded_name(vm_name, &format!("-rp-{}", timestamp(at)), MAX_NAME_LEN)
}

/// Replica resource name: `{source}{suffix}`
pub fn replica_name(source_name: &str, suffix: &str) -> String {
    bounded_name(source_name, suffix, MAX_NAME_LEN)
}

/// Default replica suffix for a target zone
pub fn zone_suffix(zone: &str) -> String {
    format!("-z{}", zone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 9, 7, 5, 1).unwrap()
    }

    #[test]
    fn test_snapshot_name_short_base() {
        assert_eq!(snapshot_name("os-disk", at()), "os-disk-snap-20260309070501");
    }

    #[test]
    fn test_snapshot_name_is_bounded() {
        let base = "d".repeat(200);
        let name = snapshot_name(&base, at());
        assert_eq!(name.chars().count(), MAX_NAME_LEN);
        assert!(name.ends_with("-snap-20260309070501"));
    }

    #[test]
    fn test_long_names_sharing_a_prefix_stay_distinct() {
        let vm = "v".repeat(64);
        let first = format!("{}_DataDisk_0", vm);
        let second = format!("{}_DataDisk_1", vm);

        let a = snapshot_name(&first, at());
        let b = snapshot_name(&second, at());
        assert_ne!(a, b);
        assert!(a.chars().count() <= MAX_NAME_LEN);
        assert!(b.chars().count() <= MAX_NAME_LEN);

        let suffix = "-zone-two-replica".repeat(2);
        assert_ne!(replica_name(&first, &suffix), replica_name(&second, &suffix));
    }

    #[test]
    fn test_truncated_name_is_stable_across_casing() {
        let base = "Data".repeat(30);
        assert_eq!(
            replica_name(&base, "-z1").to_ascii_lowercase(),
            replica_name(&base.to_ascii_lowercase(), "-z1")
        );
    }

    #[test]
    fn test_truncation_trims_trailing_separator() {
        // 20-char budget lands right after the '-' in "abcdefghijklmnopqrs-"
        let name = bounded_name("abcdefghijklmnopqrs-tuvwxyz0123", "-x", 31);
        assert!(name.starts_with("abcdefghijklmnopqrs-"));
        assert!(!name.starts_with("abcdefghijklmnopqrs--"));
        assert!(name.ends_with("-x"));
        assert_eq!(name.chars().count(), 30);
    }

    #[test]
    fn test_untruncated_base_is_kept_verbatim() {
        assert_eq!(bounded_name("data_", "-z2", MAX_NAME_LEN), "data_-z2");
    }

    #[test]
    fn test_replica_name() {
        assert_eq!(replica_name("app-data-01", &zone_suffix("2")), "app-data-01-z2");
    }
}
