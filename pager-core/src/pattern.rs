//! Encoding of search text into SQL `LIKE` patterns.

use offline_pager_types::Query;

/// Escape character the item cache declares in its `LIKE ... ESCAPE` clause.
pub const LIKE_ESCAPE: char = '\\';

/// Loose substring pattern for a query.
///
/// Each whitespace-separated token must appear in order, with anything in
/// between: `"red shoe"` becomes `%red%shoe%`. Wildcard characters typed by
/// the user match literally. Returns `None` for the empty query.
pub fn substring_pattern(query: &Query) -> Option<String> {
    if query.is_all() {
        return None;
    }

    let mut pattern = String::with_capacity(query.as_str().len() + 2);
    pattern.push('%');
    for token in query.as_str().split_whitespace() {
        for c in token.chars() {
            if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
                pattern.push(LIKE_ESCAPE);
            }
            pattern.push(c);
        }
        pattern.push('%');
    }
    Some(pattern)
}
