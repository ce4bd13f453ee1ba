//! Permissive dotted-version comparison.
//!
//! Versions are compared component by component as unsigned integers.
//! A component that is not made only of ASCII digits counts as `0`, so
//! `"1.x.0"` equals `"1.0.0"` and a suffix such as `"2-beta"` compares as
//! `0`. Missing trailing components are padded with zeros: `"1.1"` is
//! greater than `"1.0.0"` and `"1.0"` equals `"1.0.0"`.
//!
//! ```rust
//! use paper_launcher::version::{compare, is_newer, normalize};
//! use std::cmp::Ordering;
//!
//! assert_eq!(normalize(" v1.2.3 "), "1.2.3");
//! assert_eq!(compare("1.10.0", "1.9.9"), Ordering::Greater);
//! assert!(is_newer("v0.7.0", "0.6.2"));
//! ```

use std::cmp::Ordering;

/// Trims whitespace and strips one leading `v`.
#[must_use]
pub fn normalize(version: &str) -> &str {
    let trimmed = version.trim();
    trimmed.strip_prefix('v').unwrap_or(trimmed).trim()
}

fn component_value(component: &str) -> u64 {
    if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }
    // All digits, so the only possible failure is overflow
    component.parse().unwrap_or(u64::MAX)
}

/// Compares two dotted versions numerically, component by component.
#[must_use]
pub fn compare(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (l, r) => {
                let ordering = component_value(l.unwrap_or("")).cmp(&component_value(r.unwrap_or("")));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

/// Whether `candidate` is strictly newer than `current` after normalizing both.
///
/// An empty version on either side is never newer.
#[must_use]
pub fn is_newer(candidate: &str, current: &str) -> bool {
    let candidate = normalize(candidate);
    let current = normalize(current);
    if candidate.is_empty() || current.is_empty() {
        return false;
    }
    compare(candidate, current) == Ordering::Greater
}

/// Whether `version` identifies an unversioned development build.
///
/// Such builds never self-update.
#[must_use]
pub fn is_development_version(version: &str) -> bool {
    let version = normalize(version);
    version.is_empty() || version.eq_ignore_ascii_case("dev")
}
