//! Per-line pattern matching

use fancy_regex::{Error, Regex};

/// 1-based column of the leftmost match of `pattern` in `line`.
///
/// Columns count chars rather than bytes so they line up with what an editor
/// shows for non-ASCII source. Errors only when a backtracking pattern hits
/// its step limit.
pub fn first_match(line: &str, pattern: &Regex) -> Result<Option<usize>, Error> {
    Ok(pattern
        .find(line)?
        .map(|m| line[..m.start()].chars().count() + 1))
}

/// First `(line, column)` in `text`, both 1-based, splitting on `\n` only.
pub fn first_match_in_text(text: &str, pattern: &Regex) -> Result<Option<(usize, usize)>, Error> {
    for (idx, line) in text.split('\n').enumerate() {
        if let Some(column) = first_match(line, pattern)? {
            return Ok(Some((idx + 1, column)));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_column() {
        let re = Regex::new("Foo").unwrap();
        assert_eq!(first_match("const X = <Foo onClick={...} />", &re).unwrap(), Some(12));
        assert_eq!(first_match("Foo", &re).unwrap(), Some(1));
        assert_eq!(first_match("bar", &re).unwrap(), None);
    }

    #[test]
    fn test_leftmost_match_wins() {
        let re = Regex::new("a+").unwrap();
        assert_eq!(first_match("xxaxaa", &re).unwrap(), Some(3));
    }

    #[test]
    fn test_column_counts_chars() {
        let re = Regex::new("btn").unwrap();
        assert_eq!(first_match("<p>é→ btn", &re).unwrap(), Some(7));
    }

    #[test]
    fn test_first_line_wins() {
        let re = Regex::new(r#"class="card""#).unwrap();
        let text = "<div>\n  <span class=\"card\">\n<p class=\"card\">";
        assert_eq!(first_match_in_text(text, &re).unwrap(), Some((2, 9)));
    }

    #[test]
    fn test_crlf_keeps_columns() {
        let re = Regex::new("Foo").unwrap();
        assert_eq!(first_match_in_text("a\r\n  Foo\r\n", &re).unwrap(), Some((2, 3)));
    }

    #[test]
    fn test_empty_text() {
        let re = Regex::new("Foo").unwrap();
        assert_eq!(first_match_in_text("", &re).unwrap(), None);
    }

    #[test]
    fn test_look_around_and_backreferences() {
        let re = Regex::new(r"(?<=<)Foo(?= onClick)").unwrap();
        assert_eq!(first_match("<Foo id /><Foo onClick={go} />", &re).unwrap(), Some(12));

        let re = Regex::new(r#"class="(\w+) \1""#).unwrap();
        assert_eq!(
            first_match_in_text("<a class=\"x y\">\n<b class=\"nav nav\">", &re).unwrap(),
            Some((2, 4))
        );
    }
}
