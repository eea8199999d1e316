//! Line reassembly across chunk boundaries

/// Turns a sequence of arbitrarily split byte chunks into complete lines.
///
/// Only the bytes after the last newline seen so far are buffered. Lines are
/// decoded after reassembly, so a multi-byte character split between two
/// chunks comes out intact. The terminating `\n` is not part of the returned
/// line; anything else (including `\r`) is passed through untouched.
#[derive(Debug, Default)]
pub struct LineSplitter {
    remainder: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk and return every line it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let Some(last_newline) = chunk.iter().rposition(|&b| b == b'\n') else {
            self.remainder.extend_from_slice(chunk);
            return Vec::new();
        };

        let mut complete = std::mem::take(&mut self.remainder);
        complete.extend_from_slice(&chunk[..last_newline]);
        self.remainder.extend_from_slice(&chunk[last_newline + 1..]);

        complete
            .split(|&b| b == b'\n')
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect()
    }

    /// Bytes held back waiting for a newline
    pub fn buffered(&self) -> usize {
        self.remainder.len()
    }

    /// End of stream: the unterminated final line, if any
    pub fn finish(self) -> Option<String> {
        if self.remainder.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.remainder).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_all(chunks: &[&[u8]]) -> Vec<String> {
        let mut splitter = LineSplitter::new();
        let mut lines: Vec<String> = chunks.iter().flat_map(|c| splitter.push(c)).collect();
        lines.extend(splitter.finish());
        lines
    }

    #[test]
    fn test_single_chunk() {
        let lines = split_all(&[b"a,b\n1,2\n3,4\n"]);
        assert_eq!(lines, vec!["a,b", "1,2", "3,4"]);
    }

    #[test]
    fn test_line_split_across_chunks() {
        let lines = split_all(&[b"a,b\n1,", b"2\n3", b",4\n"]);
        assert_eq!(lines, vec!["a,b", "1,2", "3,4"]);
    }

    #[test]
    fn test_every_split_point_yields_same_lines() {
        let text = "h1,h2\nfoo,bar\nbaz,qux\n";
        for offset in 1..text.len() {
            let (left, right) = text.as_bytes().split_at(offset);
            assert_eq!(
                split_all(&[left, right]),
                vec!["h1,h2", "foo,bar", "baz,qux"],
                "split at {offset}"
            );
        }
    }

    #[test]
    fn test_chunk_without_newline_is_buffered() {
        let mut splitter = LineSplitter::new();
        assert!(splitter.push(b"partial").is_empty());
        assert_eq!(splitter.buffered(), 7);
        assert_eq!(splitter.push(b" line\n"), vec!["partial line"]);
        assert_eq!(splitter.buffered(), 0);
    }

    #[test]
    fn test_trailing_line_without_newline() {
        let lines = split_all(&[b"h\n1\n2"]);
        assert_eq!(lines, vec!["h", "1", "2"]);
    }

    #[test]
    fn test_empty_lines_are_preserved() {
        let lines = split_all(&[b"h\n\n1\n"]);
        assert_eq!(lines, vec!["h", "", "1"]);
    }

    #[test]
    fn test_multibyte_character_split() {
        let text = "h\ncafé,1\n".as_bytes();
        let split = text.iter().position(|&b| b == 0xc3).map(|i| i + 1).unwrap();
        let lines = split_all(&[&text[..split], &text[split..]]);
        assert_eq!(lines, vec!["h", "café,1"]);
    }

    #[test]
    fn test_crlf_kept_verbatim() {
        let lines = split_all(&[b"h\r\n1\r\n"]);
        assert_eq!(lines, vec!["h\r", "1\r"]);
    }
}
