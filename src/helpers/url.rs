//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::path::{Path, PathBuf};

/// Characters left alone in a path segment (RFC 3986 unreserved)
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a single path segment
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Path of a post detail page
///
/// # Examples
/// ```ignore
/// post_path("como-utilizar-hooks") // -> "/post/como-utilizar-hooks"
/// ```
pub fn post_path(slug: &str) -> String {
    format!("/post/{}", encode_segment(slug))
}

/// Path of a page of the pagination endpoint
pub fn api_posts_path(page: u32) -> String {
    format!("/api/posts/{}", page)
}

/// File a rendered route is written to inside the output directory
///
/// # Examples
/// ```ignore
/// output_file(public, "/") // -> public/index.html
/// output_file(public, "/post/hello") // -> public/post/hello/index.html
/// ```
pub fn output_file(public_dir: &Path, route: &str) -> PathBuf {
    let mut path = public_dir.to_path_buf();
    for segment in route.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path.join("index.html")
}
