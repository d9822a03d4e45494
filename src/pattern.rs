//! Name patterns used to select pending events.
//!
//! A pattern is either an exact name or a literal prefix followed by the wildcard marker `*`.
//! Both forms compare ASCII case-insensitively. Anything after the first `*` is ignored.

/// The wildcard marker.
pub const WILDCARD: char = '*';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern<'a> {
    /// Matches a name equal to this one.
    Exact(&'a str),
    /// Matches any name that starts with this prefix.
    Prefix(&'a str),
}

impl<'a> Pattern<'a> {
    pub fn parse(pattern: &'a str) -> Self {
        match pattern.find(WILDCARD) {
            Some(pos) => Pattern::Prefix(&pattern[..pos]),
            None => Pattern::Exact(pattern),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match *self {
            Pattern::Exact(exact) => exact.eq_ignore_ascii_case(name),
            // The name must be at least as long as the literal prefix and share it in full.
            Pattern::Prefix(prefix) => name
                .as_bytes()
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes())),
        }
    }
}

/// Input-name filter. An absent or empty pattern matches any input.
pub(crate) fn input_matches(pattern: Option<&Pattern<'_>>, input: &str) -> bool {
    match pattern {
        None | Some(Pattern::Exact("")) => true,
        Some(p) => p.matches(input),
    }
}

/// Matches a by-name event target against a live entity.
///
/// A stored name with a wildcard matches on the entity name prefix. Without a wildcard, the
/// stored name may equal either the entity name or its classname.
pub(crate) fn target_matches(stored: &str, name: &str, classname: &str) -> bool {
    match Pattern::parse(stored) {
        p @ Pattern::Prefix(_) => p.matches(name),
        p @ Pattern::Exact(_) => p.matches(name) || p.matches(classname),
    }
}
