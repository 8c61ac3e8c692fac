//! Route path templates: literal segments plus `{name}` captures.

use std::collections::HashMap;

/// A compiled route path, e.g. `/users/{id}/posts/{post_id}`.
#[derive(Debug, Clone)]
pub struct Pattern {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Param(String),
}

impl Pattern {
    /// Compile a path template.
    pub fn compile(path: &str) -> Self {
        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if let Some(name) = s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    Segment::Param(name.to_string())
                } else {
                    Segment::Literal(s.to_string())
                }
            })
            .collect();

        Self { segments }
    }

    /// The number of literal (non-param) segments, used to break ties between
    /// two otherwise-matching patterns in favor of the more specific one.
    pub fn specificity(&self) -> usize {
        self.segments.iter().filter(|s| matches!(s, Segment::Literal(_))).count()
    }

    /// Match `path` against this pattern, returning captured params on success.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();

        for (segment, part) in self.segments.iter().zip(parts.iter()) {
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
            }
        }

        Some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_a_literal_path() {
        let pattern = Pattern::compile("/health");
        assert!(pattern.matches("/health").is_some());
        assert!(pattern.matches("/healthz").is_none());
    }

    #[test]
    fn captures_named_params() {
        let pattern = Pattern::compile("/users/{id}/posts/{post_id}");
        let params = pattern.matches("/users/42/posts/7").unwrap();
        assert_eq!(params.get("id"), Some(&"42".to_string()));
        assert_eq!(params.get("post_id"), Some(&"7".to_string()));
    }

    #[test]
    fn a_literal_route_is_more_specific_than_a_param_route() {
        let literal = Pattern::compile("/users/me");
        let param = Pattern::compile("/users/{id}");
        assert!(literal.specificity() > param.specificity());
    }
}
