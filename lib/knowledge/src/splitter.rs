//! Recursive character text splitter.
//!
//! Text is split on the first separator that occurs in it; pieces that are
//! still too long are split again with the remaining separators, and pieces
//! with no separator left are cut into fixed windows. Adjacent small pieces
//! are merged back up to `chunk_size` characters, carrying up to
//! `chunk_overlap` characters of trailing context into the next chunk.
//! Lengths are measured in characters.

use std::collections::VecDeque;

/// Splits documents into overlapping chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSplitter {
    separators: Vec<String>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            separators: vec!["\n\n".to_string(), "\n".to_string()],
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl TextSplitter {
    /// Creates a splitter with the default separators.
    ///
    /// The overlap is clamped below the chunk size.
    #[must_use]
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            ..Self::default()
        }
    }

    /// Replaces the separator list, most significant first.
    #[must_use]
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    /// Maximum chunk length in characters.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Splits `text` into chunks; blank text yields no chunks.
    #[must_use]
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with(text, &self.separators)
    }

    fn split_with(&self, text: &str, separators: &[String]) -> Vec<String> {
        let position = separators.iter().position(|sep| text.contains(sep.as_str()));
        let Some(position) = position else {
            return self.hard_split(text);
        };
        let separator = separators[position].as_str();
        let remaining = &separators[position + 1..];

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        for piece in text.split(separator).filter(|p| !p.is_empty()) {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending, separator));
                pending.clear();
            }
            chunks.extend(self.split_with(piece, remaining));
        }
        if !pending.is_empty() {
            chunks.extend(self.merge(&pending, separator));
        }
        chunks
    }

    fn hard_split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= self.chunk_size {
            let trimmed = text.trim();
            return if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![trimmed.to_string()]
            };
        }
        let step = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            let chunk: String = chars[start..end].iter().collect();
            let chunk = chunk.trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }
            if end == chars.len() {
                break;
            }
            start += step;
        }
        chunks
    }

    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        let join = |window: &VecDeque<&str>| {
            window
                .iter()
                .copied()
                .collect::<Vec<_>>()
                .join(separator)
                .trim()
                .to_string()
        };

        let joiner = |window: &VecDeque<&str>| if window.is_empty() { 0 } else { sep_len };

        for &piece in pieces {
            let len = char_len(piece);
            if total + joiner(&window) + len > self.chunk_size && !window.is_empty() {
                let chunk = join(&window);
                if !chunk.is_empty() {
                    chunks.push(chunk);
                }
                // Drop from the front until only the overlap remains and the
                // new piece fits.
                while total > self.chunk_overlap
                    || (total > 0 && total + joiner(&window) + len > self.chunk_size)
                {
                    let Some(front) = window.pop_front() else {
                        break;
                    };
                    total -= char_len(front) + joiner(&window);
                }
            }
            total += len + joiner(&window);
            window.push_back(piece);
        }

        let chunk = join(&window);
        if !chunk.is_empty() {
            chunks.push(chunk);
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let splitter = TextSplitter::default();
        assert_eq!(splitter.split("Leave policy.\n\nTen days."), vec![
            "Leave policy.\n\nTen days."
        ]);
    }

    #[test]
    fn blank_text_yields_nothing() {
        assert!(TextSplitter::default().split(" \n\n ").is_empty());
    }

    #[test]
    fn chunks_respect_size_and_overlap() {
        let splitter = TextSplitter::new(20, 10);
        let text = "aa bb\ncc dd\nee ff\ngg hh\nii jj\nkk ll";
        let chunks = splitter.split(text);

        assert_eq!(
            chunks,
            vec!["aa bb\ncc dd\nee ff", "ee ff\ngg hh\nii jj", "ii jj\nkk ll"]
        );
        assert!(chunks.iter().all(|c| c.chars().count() <= 20));
    }

    #[test]
    fn paragraphs_split_before_lines() {
        let splitter = TextSplitter::new(30, 0);
        let text = "first paragraph here\n\nsecond paragraph here";
        assert_eq!(
            splitter.split(text),
            vec!["first paragraph here", "second paragraph here"]
        );
    }

    #[test]
    fn text_without_separators_is_hard_split() {
        let splitter = TextSplitter::new(10, 2);
        let chunks = splitter.split("abcdefghijklmnopqrstuvwxyz");
        assert_eq!(chunks[0], "abcdefghij");
        assert_eq!(chunks[1], "ijklmnopqr");
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert!(chunks.last().expect("chunk").ends_with('z'));
    }

    #[test]
    fn multibyte_text_is_measured_in_characters() {
        let splitter = TextSplitter::new(5, 0);
        let chunks = splitter.split("สวัสดีครับผม");
        assert!(chunks.iter().all(|c| c.chars().count() <= 5));
        assert_eq!(chunks.concat(), "สวัสดีครับผม");
    }

    #[test]
    fn overlap_is_clamped() {
        let splitter = TextSplitter::new(4, 10);
        assert_eq!(splitter.chunk_overlap, 3);
    }
}
