/// Suffix that turns an endpoint pattern into a prefix match.
pub const WILDCARD: char = '*';

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    Exact(String),
    Prefix(String),
}

/// Decides which request paths are protected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointMatcher {
    patterns: Vec<Pattern>,
}

impl EndpointMatcher {
    pub fn new<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = endpoints
            .into_iter()
            .map(|e| {
                let e = e.as_ref();
                match e.strip_suffix(WILDCARD) {
                    Some(prefix) => Pattern::Prefix(prefix.to_owned()),
                    None => Pattern::Exact(e.to_owned()),
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_protected(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| match p {
            Pattern::Exact(exact) => path == exact,
            Pattern::Prefix(prefix) => path.starts_with(prefix.as_str()),
        })
    }
}
