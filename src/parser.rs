use std::io::BufRead;

use crate::config::MatchPolicy;
use crate::error::BuildError;
use crate::trie::Trie;

/// Parses one hwdb-format text source and inserts its records into `trie`.
///
/// `#`-prefixed lines are comments; a blank line closes the current
/// record; a record is one or more flush-left match lines followed by
/// one or more ` KEY=VALUE` lines. Malformed value lines (no `=`) are
/// skipped, logged, and never abort the build.
pub fn parse_records(
    reader: impl BufRead,
    trie: &mut Trie,
    match_policy: MatchPolicy,
) -> Result<(), BuildError> {
    let mut matches: Vec<String> = Vec::new();

    for line in reader.lines() {
        let line = line?;

        if line.starts_with('#') {
            continue;
        }

        if line.is_empty() {
            matches.clear();
            continue;
        }

        if let Some(rest) = line.strip_prefix(' ') {
            if matches.is_empty() {
                log::debug!("value line with no preceding match line, ignoring: {line:?}");
                continue;
            }
            let Some((key, value)) = rest.split_once('=') else {
                log::debug!("malformed value line (no '='), ignoring: {line:?}");
                continue;
            };

            let active: &[String] = match match_policy {
                MatchPolicy::FirstMatchOnly => &matches[..1],
                MatchPolicy::AllMatches => &matches[..],
            };
            for pattern in active {
                trie.insert(pattern.as_bytes(), key.as_bytes(), value.as_bytes())?;
            }
            continue;
        }

        // Flush-left, non-empty, not starting with '#': a match line.
        matches.push(line);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn records(input: &str, policy: MatchPolicy) -> Trie {
        let mut trie = Trie::new();
        parse_records(Cursor::new(input), &mut trie, policy).unwrap();
        trie
    }

    fn value_of(trie: &Trie, pattern: &[u8], key: &[u8]) -> Option<Vec<u8>> {
        let mut node = trie.root();
        let mut i = 0;
        loop {
            let prefix = trie.pool().get(node.prefix).to_bytes();
            if i + prefix.len() > pattern.len() || &pattern[i..i + prefix.len()] != prefix {
                return None;
            }
            i += prefix.len();
            if i == pattern.len() {
                return node
                    .values
                    .iter()
                    .find(|(k, _)| trie.pool().get(*k).to_bytes() == key)
                    .map(|(_, v)| trie.pool().get(*v).to_bytes().to_vec());
            }
            let c = pattern[i];
            match node.children.iter().find(|(disc, _)| *disc == c) {
                Some((_, child)) => {
                    node = child;
                    i += 1;
                }
                None => return None,
            }
        }
    }

    #[test]
    fn basic_record() {
        let trie = records("usb:v1234p5678\n MODULE=foo\n", MatchPolicy::AllMatches);
        assert_eq!(
            value_of(&trie, b"usb:v1234p5678", b"MODULE"),
            Some(b"foo".to_vec())
        );
    }

    #[test]
    fn comments_and_blank_lines_delimit_records() {
        let input = "\
# a comment
usb:v0001p0001
 MODULE=a

usb:v0002p0002
 MODULE=b
";
        let trie = records(input, MatchPolicy::AllMatches);
        assert_eq!(
            value_of(&trie, b"usb:v0001p0001", b"MODULE"),
            Some(b"a".to_vec())
        );
        assert_eq!(
            value_of(&trie, b"usb:v0002p0002", b"MODULE"),
            Some(b"b".to_vec())
        );
    }

    #[test]
    fn malformed_value_line_is_skipped_not_fatal() {
        let input = "usb:v0001p0001\n NO_EQUALS_HERE\n MODULE=ok\n";
        let trie = records(input, MatchPolicy::AllMatches);
        assert_eq!(
            value_of(&trie, b"usb:v0001p0001", b"MODULE"),
            Some(b"ok".to_vec())
        );
    }

    #[test]
    fn empty_value_is_preserved() {
        let trie = records("p\n K=\n", MatchPolicy::AllMatches);
        assert_eq!(value_of(&trie, b"p", b"K"), Some(b"".to_vec()));
    }

    #[test]
    fn multi_match_all_matches_inserts_cross_product() {
        let input = "m1\nm2\n K=v\n";
        let trie = records(input, MatchPolicy::AllMatches);
        assert_eq!(value_of(&trie, b"m1", b"K"), Some(b"v".to_vec()));
        assert_eq!(value_of(&trie, b"m2", b"K"), Some(b"v".to_vec()));
    }

    #[test]
    fn multi_match_first_only_matches_reference_tool() {
        let input = "m1\nm2\n K=v\n";
        let trie = records(input, MatchPolicy::FirstMatchOnly);
        assert_eq!(value_of(&trie, b"m1", b"K"), Some(b"v".to_vec()));
        assert_eq!(value_of(&trie, b"m2", b"K"), None);
    }

    #[test]
    fn later_insert_overwrites_earlier_value_for_same_key() {
        let input = "x\n K=1\n\nx\n K=2\n";
        let trie = records(input, MatchPolicy::AllMatches);
        assert_eq!(value_of(&trie, b"x", b"K"), Some(b"2".to_vec()));
    }
}
