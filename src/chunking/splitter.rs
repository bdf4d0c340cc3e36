// Separator handling for the recursive chunker
// Pieces keep their separator attached to the front, so concatenating the
// pieces of a text reproduces it exactly.

use regex::Regex;
use std::collections::VecDeque;

/// A natural boundary the chunker may cut at
#[derive(Debug, Clone)]
pub enum Separator {
    /// Plain substring; the empty string means "between any two characters"
    Literal(String),
    /// Regular expression boundary
    Pattern(Regex),
}

impl Separator {
    /// True for the character-level fallback
    pub fn is_char_level(&self) -> bool {
        matches!(self, Separator::Literal(s) if s.is_empty())
    }

    pub fn occurs_in(&self, text: &str) -> bool {
        match self {
            Separator::Literal(s) => s.is_empty() || text.contains(s.as_str()),
            Separator::Pattern(re) => re.find_iter(text).any(|m| !m.is_empty()),
        }
    }

    /// Split text into pieces, each non-first piece starting with its separator
    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let starts: Vec<usize> = match self {
            Separator::Literal(s) if s.is_empty() => {
                return text
                    .char_indices()
                    .map(|(i, c)| &text[i..i + c.len_utf8()])
                    .collect();
            }
            Separator::Literal(s) => text.match_indices(s.as_str()).map(|(i, _)| i).collect(),
            Separator::Pattern(re) => re
                .find_iter(text)
                .filter(|m| !m.is_empty())
                .map(|m| m.start())
                .collect(),
        };

        let mut pieces = Vec::with_capacity(starts.len() + 1);
        let mut begin = 0;
        for start in starts {
            if start > begin {
                pieces.push(&text[begin..start]);
            }
            begin = start;
        }
        if begin < text.len() {
            pieces.push(&text[begin..]);
        }
        pieces
    }
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Hard split into windows of `size` characters stepping by `size - overlap`
pub fn split_by_chars(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = boundaries.len() - 1;
    let step = size.saturating_sub(overlap).max(1);

    let mut windows = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + size).min(total);
        windows.push(text[boundaries[start]..boundaries[end]].to_string());
        if end == total {
            break;
        }
        start += step;
    }
    windows
}

/// Greedy merge of small pieces into chunks of at most `chunk_size` characters.
///
/// After a chunk is emitted, the shortest run of trailing pieces that still
/// covers `chunk_overlap` characters (after trimming) is carried into the
/// next chunk, as long as the next piece still fits.
pub fn merge_pieces(pieces: &[&str], chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: VecDeque<(&str, usize)> = VecDeque::new();
    let mut total = 0usize;

    for &piece in pieces {
        let len = char_len(piece);

        if total + len > chunk_size && !current.is_empty() {
            if let Some(chunk) = join_trimmed(&current) {
                chunks.push(chunk);
            }

            while let Some(&(_, front_len)) = current.front() {
                let needs_room = total + len > chunk_size;
                let tail_total = total - front_len;
                let tail_keeps_overlap = tail_total >= chunk_overlap
                    && trimmed_len(&current, 1, tail_total) >= chunk_overlap;

                if !(needs_room || tail_keeps_overlap) {
                    break;
                }
                total -= front_len;
                current.pop_front();
            }
        }

        current.push_back((piece, len));
        total += len;
    }

    if let Some(chunk) = join_trimmed(&current) {
        chunks.push(chunk);
    }

    chunks
}

fn join_trimmed(pieces: &VecDeque<(&str, usize)>) -> Option<String> {
    let joined: String = pieces.iter().map(|(p, _)| *p).collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Character count of `pieces[skip..]` concatenated and trimmed
fn trimmed_len(pieces: &VecDeque<(&str, usize)>, skip: usize, total: usize) -> usize {
    let mut leading = 0;
    for (piece, len) in pieces.iter().skip(skip) {
        let ws = piece.chars().take_while(|c| c.is_whitespace()).count();
        leading += ws;
        if ws < *len {
            break;
        }
    }
    if leading >= total {
        return 0;
    }

    let mut trailing = 0;
    for (piece, len) in pieces.iter().skip(skip).rev() {
        let ws = piece.chars().rev().take_while(|c| c.is_whitespace()).count();
        trailing += ws;
        if ws < *len {
            break;
        }
    }

    total - leading - trailing
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_split_keeps_separator_in_front() {
        let sep = Separator::Literal(". ".to_string());
        let pieces = sep.split("One. Two. Three");
        assert_eq!(pieces, vec!["One", ". Two", ". Three"]);
        assert_eq!(pieces.concat(), "One. Two. Three");
    }

    #[test]
    fn test_split_with_leading_separator() {
        let sep = Separator::Literal(" ".to_string());
        assert_eq!(sep.split(" a b"), vec![" a", " b"]);
    }

    #[test]
    fn test_char_split_handles_multibyte() {
        let sep = Separator::Literal(String::new());
        assert_eq!(sep.split("héé"), vec!["h", "é", "é"]);
        assert!(sep.occurs_in("anything"));
    }

    #[test]
    fn test_pattern_split() {
        let sep = Separator::Pattern(Regex::new(r"\n+").unwrap());
        assert_eq!(sep.split("a\n\nb\nc"), vec!["a", "\n\nb", "\nc"]);
    }

    #[test]
    fn test_split_by_chars_windows() {
        let windows = split_by_chars("abcdefghij", 4, 1);
        assert_eq!(windows, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn test_merge_respects_size() {
        let pieces = ["aaaa", " bbbb", " cccc", " dddd"];
        let merged = merge_pieces(&pieces, 10, 0);
        assert_eq!(merged, vec!["aaaa bbbb", "cccc dddd"]);
    }

    #[test]
    fn test_merge_carries_overlap() {
        let pieces = ["aaaa", " bbbb", " cccc", " dddd", " eeee"];
        let merged = merge_pieces(&pieces, 15, 4);
        assert_eq!(merged, vec!["aaaa bbbb cccc", "cccc dddd eeee"]);
    }
}
