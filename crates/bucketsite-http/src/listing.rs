//! HTML rendering of pseudo-directory listings.

use std::fmt::Write as _;

use bucketsite_core::store::DirEntry;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use quick_xml::escape::escape;

/// Characters escaped in a listing link (the URL path set, plus `%`).
const LINK_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Render `entries` as the body of a directory listing page.
///
/// Entries are sorted by name; sub-directories get a trailing `/`.
///
/// # Examples
///
/// ```
/// use bucketsite_core::store::DirEntry;
/// use bucketsite_http::listing::render;
///
/// let html = render(&[DirEntry { name: "a b.txt".into(), is_dir: false, size: 1, last_modified: None }]);
/// assert!(html.contains(r#"<a href="a%20b.txt">a b.txt</a>"#));
/// ```
#[must_use]
pub fn render(entries: &[DirEntry]) -> String {
    let mut sorted: Vec<&DirEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut html = String::from(
        "<!doctype html>\n<meta name=\"viewport\" content=\"width=device-width\">\n<pre>\n",
    );
    for entry in sorted {
        let mut name = entry.name.clone();
        let mut href = utf8_percent_encode(&entry.name, LINK_ESCAPE).to_string();
        if entry.is_dir {
            name.push('/');
            href.push('/');
        }
        // A colon in the first segment would read as a URL scheme.
        if href.split('/').next().is_some_and(|s| s.contains(':')) {
            href.insert_str(0, "./");
        }
        let _ = writeln!(
            html,
            "<a href=\"{}\">{}</a>",
            escape(href.as_str()),
            escape(name.as_str())
        );
    }
    html.push_str("</pre>\n");
    html
}
