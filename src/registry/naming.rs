//! Legal, unique names for user types and constructors.
//!
//! A candidate is first sanitised into an identifier and then disambiguated
//! by a numeric suffix: trailing digits are incremented, and a name without
//! trailing digits gets a `2` appended. The search gives up after
//! [`MAX_ATTEMPTS`] candidates.

use crate::error::TypeError;

pub const TYPE_PLACEHOLDER: &str = "UserType";
pub const CONSTRUCTOR_PLACEHOLDER: &str = "Constructor";
pub const MAX_ATTEMPTS: usize = 1000;

/// Turns `candidate` into an identifier starting with an uppercase letter or
/// an underscore.
pub fn sanitize(candidate: &str, placeholder: &str) -> String {
    let name: String = candidate
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();

    let mut chars = name.chars();
    match chars.next() {
        None => String::from(placeholder),
        Some(first) if first.is_ascii_digit() => format!("{placeholder}{name}"),
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
    }
}

/// The candidate tried after `name` is taken.
pub fn next_candidate(name: &str) -> String {
    let stem = name.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &name[stem.len()..];

    match digits.parse::<u64>() {
        Ok(n) if !stem.is_empty() => format!("{stem}{}", n.saturating_add(1)),
        _ => format!("{name}2"),
    }
}

/// Sanitises `candidate` and disambiguates it until `is_taken` rejects it.
pub fn propose(
    candidate: &str,
    placeholder: &str,
    is_taken: impl Fn(&str) -> bool,
) -> Result<Box<str>, TypeError> {
    let mut name = sanitize(candidate, placeholder);

    for _ in 0..MAX_ATTEMPTS {
        if !is_taken(&name) {
            return Ok(name.into());
        }

        name = next_candidate(&name);
    }

    Err(TypeError::NameCollision {
        candidate: candidate.into(),
        attempts: MAX_ATTEMPTS,
    })
}
