//! external-dns annotation helpers
//!
//! TTL and target-override parsing shared by every object this source reads.

use std::collections::BTreeMap;
use std::time::Duration;
use tracing::warn;

use crate::endpoint::{Targets, Ttl};

pub const ANNOTATION_PREFIX: &str = "external-dns.alpha.kubernetes.io/";
pub const TTL_KEY: &str = "external-dns.alpha.kubernetes.io/ttl";
pub const TARGET_KEY: &str = "external-dns.alpha.kubernetes.io/target";

const TTL_MINIMUM: i64 = 1;
const TTL_MAXIMUM: i64 = i32::MAX as i64;

/// Annotation map as found on object metadata
pub type Annotations = BTreeMap<String, String>;

/// Explicit TTL from the TTL annotation
///
/// Returns `None` when the annotation is absent or invalid; invalid values are
/// logged against `resource`.
pub fn ttl_from_annotations(annotations: &Annotations, resource: &str) -> Option<Ttl> {
    let value = annotations.get(TTL_KEY)?;
    match parse_ttl(value) {
        Ok(ttl) => Some(ttl),
        Err(reason) => {
            warn!(resource = %resource, value = %value, "{}", reason);
            None
        }
    }
}

/// Parse a TTL given as whole seconds (`"300"`) or a duration (`"5m"`)
pub fn parse_ttl(value: &str) -> Result<Ttl, String> {
    let seconds = match value.parse::<i64>() {
        Ok(seconds) => seconds,
        Err(_) => humantime::parse_duration(value)
            .map(|d: Duration| d.as_secs().min(i64::MAX as u64) as i64)
            .map_err(|e| format!("failed to parse TTL annotation: {}", e))?,
    };

    if !(TTL_MINIMUM..=TTL_MAXIMUM).contains(&seconds) {
        return Err(format!(
            "TTL value {} must be between [{}, {}]",
            seconds, TTL_MINIMUM, TTL_MAXIMUM
        ));
    }

    Ok(Ttl(seconds as u32))
}

/// Targets listed in the target-override annotation
///
/// Spaces are stripped, the value is split on commas, a single trailing dot is
/// removed from each entry and empty entries are dropped.
pub fn targets_from_target_annotation(annotations: &Annotations) -> Targets {
    let mut targets = Targets::default();
    let Some(value) = annotations.get(TARGET_KEY) else {
        return targets;
    };

    for target in split_hostname_annotation(value) {
        let target = target.strip_suffix('.').unwrap_or(&target);
        if !target.is_empty() {
            targets.push(target);
        }
    }

    targets
}

/// Split a comma-separated annotation value, ignoring every space
pub fn split_hostname_annotation(value: &str) -> Vec<String> {
    value
        .replace(' ', "")
        .trim()
        .split(',')
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotations(pairs: &[(&str, &str)]) -> Annotations {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_ttl_absent_is_unset() {
        assert_eq!(ttl_from_annotations(&Annotations::new(), "r"), None);
    }

    #[test]
    fn test_ttl_seconds_and_durations() {
        assert_eq!(parse_ttl("300"), Ok(Ttl(300)));
        assert_eq!(parse_ttl("1m"), Ok(Ttl(60)));
        assert_eq!(parse_ttl("1h30m"), Ok(Ttl(5400)));
    }

    #[test]
    fn test_ttl_out_of_range_is_unset() {
        let a = annotations(&[(TTL_KEY, "0")]);
        assert_eq!(ttl_from_annotations(&a, "f5-virtualserver/default/vs1"), None);

        let a = annotations(&[(TTL_KEY, "-5")]);
        assert_eq!(ttl_from_annotations(&a, "f5-virtualserver/default/vs1"), None);

        let a = annotations(&[(TTL_KEY, "4294967296")]);
        assert_eq!(ttl_from_annotations(&a, "f5-virtualserver/default/vs1"), None);
    }

    #[test]
    fn test_ttl_garbage_is_unset() {
        let a = annotations(&[(TTL_KEY, "soon")]);
        assert_eq!(ttl_from_annotations(&a, "f5-virtualserver/default/vs1"), None);
    }

    #[test]
    fn test_targets_from_annotation() {
        let a = annotations(&[(TARGET_KEY, " 5.6.7.8, 1.2.3.4 ,lb.example.com.")]);
        let targets = targets_from_target_annotation(&a);
        assert_eq!(targets.as_slice(), &["5.6.7.8", "1.2.3.4", "lb.example.com"]);
    }

    #[test]
    fn test_targets_empty_entries_dropped() {
        let a = annotations(&[(TARGET_KEY, ",,")]);
        assert!(targets_from_target_annotation(&a).is_empty());

        let a = annotations(&[(TARGET_KEY, "")]);
        assert!(targets_from_target_annotation(&a).is_empty());
    }
}
