//! Line-level parsing of duplicate listings.
//!
//! The listing is what `fdupes -r` prints: one absolute path per line, with
//! a blank line closing each group of identical files.

/// Path separator every accepted line must start with.
pub const SEPARATOR: char = '/';

/// One classified line of a duplicate listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingRecord<'a> {
    /// Blank line: the current group ends.
    Separator,
    /// An absolute path belonging to the current group.
    Path(&'a str),
    /// Anything else. Discarded and counted.
    Malformed(&'a str),
}

/// Classify a single listing line. Trailing whitespace and line endings
/// are ignored.
pub fn parse_line(line: &str) -> ListingRecord<'_> {
    let line = line.trim_end_matches(['\n', '\r']);
    if line.trim().is_empty() {
        ListingRecord::Separator
    } else if line.starts_with(SEPARATOR) {
        ListingRecord::Path(line.trim_end())
    } else {
        ListingRecord::Malformed(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lines_separate() {
        assert_eq!(parse_line(""), ListingRecord::Separator);
        assert_eq!(parse_line("\n"), ListingRecord::Separator);
        assert_eq!(parse_line("   \r\n"), ListingRecord::Separator);
    }

    #[test]
    fn test_absolute_paths() {
        assert_eq!(parse_line("/a/b.txt\n"), ListingRecord::Path("/a/b.txt"));
        assert_eq!(parse_line("/a/b c.txt  "), ListingRecord::Path("/a/b c.txt"));
    }

    #[test]
    fn test_relative_paths_are_malformed() {
        assert_eq!(parse_line("a/b.txt"), ListingRecord::Malformed("a/b.txt"));
        assert_eq!(parse_line(" /a"), ListingRecord::Malformed(" /a"));
    }
}
