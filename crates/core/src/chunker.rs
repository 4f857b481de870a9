//! Recursive character splitting of corpus documents into passages

use std::collections::VecDeque;

/// Separators tried in order; the empty separator splits into characters.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Chunk sizing, measured in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

/// Split `text` into chunks of at most `chunk_size` characters.
///
/// Splits on the coarsest separator present in the text, recurses into
/// pieces that are still too large, then greedily merges neighbouring pieces
/// back together, carrying up to `overlap` characters into the next chunk.
pub fn split_text(text: &str, config: &ChunkConfig) -> Vec<String> {
    let chunk_size = config.chunk_size.max(1);
    let overlap = config.overlap.min(chunk_size - 1);
    split_recursive(text, &SEPARATORS, chunk_size, overlap)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn pick_separator<'a>(text: &str, separators: &'a [&'a str]) -> (&'a str, &'a [&'a str]) {
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() || text.contains(sep) {
            return (sep, &separators[i + 1..]);
        }
    }
    ("", &[])
}

fn split_recursive(
    text: &str,
    separators: &[&str],
    chunk_size: usize,
    overlap: usize,
) -> Vec<String> {
    let (separator, finer) = pick_separator(text, separators);

    let pieces: Vec<&str> = if separator.is_empty() {
        text.char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect()
    } else {
        text.split(separator).filter(|s| !s.is_empty()).collect()
    };

    let mut chunks = Vec::new();
    let mut pending: Vec<&str> = Vec::new();

    for piece in pieces {
        if char_len(piece) < chunk_size {
            pending.push(piece);
            continue;
        }

        if !pending.is_empty() {
            chunks.extend(merge_pieces(&pending, separator, chunk_size, overlap));
            pending.clear();
        }

        if finer.is_empty() {
            chunks.push(piece.to_string());
        } else {
            chunks.extend(split_recursive(piece, finer, chunk_size, overlap));
        }
    }

    if !pending.is_empty() {
        chunks.extend(merge_pieces(&pending, separator, chunk_size, overlap));
    }

    chunks
}

fn merge_pieces(pieces: &[&str], separator: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let sep_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut window: VecDeque<(&str, usize)> = VecDeque::new();
    let mut total = 0usize;

    for &piece in pieces {
        let len = char_len(piece);
        let joiner = |w: &VecDeque<(&str, usize)>| if w.is_empty() { 0 } else { sep_len };

        if !window.is_empty() && total + len + joiner(&window) > chunk_size {
            push_window(&mut chunks, &window, separator);

            // Drop from the front until what is left fits the overlap budget
            while total > overlap || (total > 0 && total + len + joiner(&window) > chunk_size) {
                let Some((_, first_len)) = window.pop_front() else {
                    break;
                };
                total -= first_len + joiner(&window);
            }
        }

        total += len + joiner(&window);
        window.push_back((piece, len));
    }

    push_window(&mut chunks, &window, separator);
    chunks
}

fn push_window(chunks: &mut Vec<String>, window: &VecDeque<(&str, usize)>, separator: &str) {
    let joined = window
        .iter()
        .map(|(piece, _)| *piece)
        .collect::<Vec<_>>()
        .join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
