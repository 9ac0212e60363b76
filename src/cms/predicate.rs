//! Query predicates in the Prismic query language
//!
//! A query is a list of predicates wrapped in brackets, e.g.
//! `[[at(document.type, "posts")]]`.

use std::fmt;

/// A single query predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Exact match of a field path against a string value
    At { path: String, value: String },
}

impl Predicate {
    pub fn at(path: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::At {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Match every document of the given custom type
    pub fn document_type(doc_type: &str) -> Self {
        Self::at("document.type", doc_type)
    }

    /// Match the document of `doc_type` whose uid is `uid`
    pub fn uid(doc_type: &str, uid: &str) -> Self {
        Self::at(format!("my.{}.uid", doc_type), uid)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::At { path, value } => {
                // serde_json gives us a correctly escaped, quoted string literal
                let quoted = serde_json::Value::String(value.clone()).to_string();
                write!(f, "[at({}, {})]", path, quoted)
            }
        }
    }
}

/// Render a predicate list as the `q` query parameter
pub fn to_query_param(predicates: &[Predicate]) -> String {
    let inner: String = predicates.iter().map(|p| p.to_string()).collect();
    format!("[{}]", inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_predicate() {
        let p = Predicate::document_type("posts");
        assert_eq!(p.to_string(), r#"[at(document.type, "posts")]"#);
    }

    #[test]
    fn test_uid_predicate_escapes_value() {
        let p = Predicate::uid("posts", r#"say-"hi""#);
        assert_eq!(p.to_string(), r#"[at(my.posts.uid, "say-\"hi\"")]"#);
    }

    #[test]
    fn test_query_param() {
        let q = to_query_param(&[Predicate::document_type("posts")]);
        assert_eq!(q, r#"[[at(document.type, "posts")]]"#);
    }
}
