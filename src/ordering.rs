//! Human-friendly orderings for port names and VLAN identifiers

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Run<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn runs(value: &str) -> Vec<Run<'_>> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut in_digits: Option<bool> = None;

    for (index, c) in value.char_indices() {
        let is_digit = c.is_ascii_digit();
        match in_digits {
            Some(current) if current != is_digit => {
                runs.push(make_run(&value[start..index], current));
                start = index;
            }
            _ => {}
        }
        in_digits = Some(is_digit);
    }
    if let Some(current) = in_digits {
        runs.push(make_run(&value[start..], current));
    }
    runs
}

fn make_run(slice: &str, digits: bool) -> Run<'_> {
    if digits {
        Run::Digits(slice)
    } else {
        Run::Text(slice)
    }
}

/// Compares two digit strings by integer value without parsing, so runs longer
/// than any machine integer still order correctly. Equal values fall back to the
/// raw length ("7" before "007") to keep the ordering total.
fn compare_digits(a: &str, b: &str) -> Ordering {
    let a_trimmed = a.trim_start_matches('0');
    let b_trimmed = b.trim_start_matches('0');
    a_trimmed
        .len()
        .cmp(&b_trimmed.len())
        .then_with(|| a_trimmed.cmp(b_trimmed))
        .then_with(|| a.len().cmp(&b.len()))
}

/// Natural ("human") ordering: "ge-0/0/2" sorts before "ge-0/0/10".
///
/// Both strings are split into maximal runs of ASCII digits and non-digits.
/// Digit runs compare by value, everything else compares lexicographically, and
/// when one run sequence is a prefix of the other the shorter sorts first.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a_runs = runs(a);
    let b_runs = runs(b);

    for (left, right) in a_runs.iter().zip(b_runs.iter()) {
        let ordering = match (left, right) {
            (Run::Digits(left), Run::Digits(right)) => compare_digits(left, right),
            (Run::Text(left), Run::Text(right)) => left.cmp(right),
            (Run::Digits(left), Run::Text(right)) | (Run::Text(left), Run::Digits(right)) => {
                left.cmp(right)
            }
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    a_runs.len().cmp(&b_runs.len())
}

/// Ascending VLAN identifier ordering.
///
/// Numeric identifiers compare by value and come before any non-numeric
/// identifier; non-numeric identifiers compare lexicographically.
pub fn vlan_id_cmp(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(left), Ok(right)) => left.cmp(&right).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
