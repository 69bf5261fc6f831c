use std::cmp::Ordering;

/// Canonicalize a raw tag string into its lowercase lookup key.
///
/// Strips leading `#` markers, splits on `/`, drops empty segments and
/// boundary whitespace, lowercases and rejoins. Returns `None` when nothing
/// survives. Normalization is idempotent: feeding the output back in returns
/// it unchanged.
///
/// # Examples
///
/// ```
/// use trellis_core::normalize_tag;
///
/// assert_eq!(normalize_tag("#Foo/Bar/"), Some("foo/bar".to_string()));
/// assert_eq!(normalize_tag("foo//bar"), Some("foo/bar".to_string()));
/// assert_eq!(normalize_tag("/"), None);
/// assert_eq!(normalize_tag(""), None);
/// ```
pub fn normalize_tag(raw: &str) -> Option<String> {
    display_tag(raw).map(|display| display.to_lowercase())
}

/// Like [`normalize_tag`] but preserves the original casing of each segment.
///
/// For every valid input, `normalize_tag(x)` equals the lowercased
/// `display_tag(x)`.
///
/// ```
/// use trellis_core::display_tag;
///
/// assert_eq!(display_tag("#Proj/Alpha"), Some("Proj/Alpha".to_string()));
/// ```
pub fn display_tag(raw: &str) -> Option<String> {
    let stripped = raw.trim().trim_start_matches('#');
    let segments: Vec<&str> = stripped
        .split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

/// Deterministic natural ordering over tag paths.
///
/// Segments are compared left to right; within a segment, runs of ASCII
/// digits compare numerically (`tag2` sorts before `tag10`) and everything
/// else compares case-insensitively byte by byte. Ties are broken by plain
/// string order so the result is a total order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.split('/');
    let mut right = b.split('/');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match natural_cmp_segment(x, y) {
                Ordering::Equal => continue,
                decided => return decided,
            },
        }
    }
}

fn natural_cmp_segment(a: &str, b: &str) -> Ordering {
    let left = a.as_bytes();
    let right = b.as_bytes();
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        if left[i].is_ascii_digit() && right[j].is_ascii_digit() {
            let start_i = i;
            while i < left.len() && left[i].is_ascii_digit() {
                i += 1;
            }
            let start_j = j;
            while j < right.len() && right[j].is_ascii_digit() {
                j += 1;
            }
            // Compare digit runs numerically: longer run of significant
            // digits wins, equal lengths fall back to lexical order.
            let digits_a = a[start_i..i].trim_start_matches('0');
            let digits_b = b[start_j..j].trim_start_matches('0');
            let decided = digits_a
                .len()
                .cmp(&digits_b.len())
                .then_with(|| digits_a.cmp(digits_b));
            if decided != Ordering::Equal {
                return decided;
            }
        } else {
            let decided = left[i]
                .to_ascii_lowercase()
                .cmp(&right[j].to_ascii_lowercase());
            if decided != Ordering::Equal {
                return decided;
            }
            i += 1;
            j += 1;
        }
    }
    (left.len() - i).cmp(&(right.len() - j))
}
