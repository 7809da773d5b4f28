//! Request path normalization.

/// Lexically clean a slash-separated path.
///
/// Collapses repeated slashes, removes `.` segments and resolves `..`
/// against the preceding segment. A rooted path never climbs above `/`.
/// The trailing slash is dropped; an empty result is `.` (or `/` when rooted).
///
/// # Examples
///
/// ```
/// use bucketsite_http::path::clean;
///
/// assert_eq!(clean("/a//b/./c/../d/"), "/a/b/d");
/// assert_eq!(clean("/../x"), "/x");
/// assert_eq!(clean("a/.."), ".");
/// assert_eq!(clean("/"), "/");
/// ```
#[must_use]
pub fn clean(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|s| *s != "..") {
                    segments.pop();
                } else if !rooted {
                    segments.push("..");
                }
            }
            s => segments.push(s),
        }
    }

    let joined = segments.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_owned()
    } else {
        joined
    }
}

/// Root `path` and clean it, keeping a trailing slash when present.
///
/// This is the form the file server opens: `/docs/` stays a directory
/// request while `/docs/../a.txt` becomes `/a.txt`.
///
/// # Examples
///
/// ```
/// use bucketsite_http::path::clean_request_path;
///
/// assert_eq!(clean_request_path("docs/"), "/docs/");
/// assert_eq!(clean_request_path("/docs/../a.txt"), "/a.txt");
/// assert_eq!(clean_request_path(""), "/");
/// ```
#[must_use]
pub fn clean_request_path(path: &str) -> String {
    let rooted = rooted(path);
    let mut cleaned = clean(&rooted);
    if rooted.ends_with('/') && cleaned != "/" {
        cleaned.push('/');
    }
    cleaned
}

/// Prefix `path` with `/` unless it already starts with one.
#[must_use]
pub fn rooted(path: &str) -> String {
    if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    }
}
