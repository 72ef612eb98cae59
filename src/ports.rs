//! Fuzzy port name comparison
//!
//! Some devices shorten the port names they advertise over LLDP, replacing the
//! tail with `..` (Juniper reports "ge-1/0.." for "ge-1/0/46.0"). Two reported
//! names are considered the same port when they are identical, or when either
//! one is truncated and its prefix appears inside the other.

const TRUNCATION_MARKER: &str = "..";

/// Returns the prefix before the truncation marker, if the name is truncated
fn truncated_prefix(name: &str) -> Option<&str> {
    name.find(TRUNCATION_MARKER)
        .map(|index| &name[..index])
        .filter(|prefix| !prefix.is_empty())
}

fn truncated_match(truncated: &str, other: &str) -> bool {
    truncated_prefix(truncated).is_some_and(|prefix| other.contains(prefix))
}

/// Symmetric port name equality, tolerant of truncation on either side.
///
/// No case folding or whitespace trimming is applied.
pub fn ports_match(a: &str, b: &str) -> bool {
    a == b || truncated_match(a, b) || truncated_match(b, a)
}
