//! Paragraph-greedy text chunking with sliding-window overlap.
//!
//! Lengths are measured in characters, not bytes, so multi-byte text
//! (accented Spanish, emoji) never splits inside a code point.

/// One chunk produced by [`chunk_candidates`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkCandidate {
    /// Ordinal of the chunk within its document
    pub position: u32,

    /// Chunk text, including any carried-over overlap prefix
    pub text: String,

    /// Characters at the start of `text` that repeat the previous chunk
    /// (tail plus the joining newline); zero for fresh chunks.
    pub overlap_chars: usize,
}

impl ChunkCandidate {
    /// The chunk text without the carried-over prefix.
    pub fn body(&self) -> &str {
        match self.text.char_indices().nth(self.overlap_chars) {
            Some((idx, _)) => &self.text[idx..],
            None if self.overlap_chars == 0 => &self.text,
            None => "",
        }
    }
}

/// Chunk normalized text into ordered passages.
///
/// Paragraphs (non-empty trimmed lines) are accumulated greedily while the
/// buffer stays within `max_chars`. On overflow the buffer is emitted and the
/// next one is seeded with the last `overlap` characters of the emitted chunk
/// followed by the paragraph, unless the emitted chunk was not longer than
/// `overlap`. A seeded chunk may exceed `max_chars` when its paragraph is
/// long; such a chunk holds exactly one paragraph after the overlap. A
/// paragraph longer than `max_chars` is never split.
pub fn chunk_text(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    chunk_candidates(text, max_chars, overlap)
        .into_iter()
        .map(|c| c.text)
        .collect()
}

/// Like [`chunk_text`], keeping the overlap bookkeeping of each chunk.
pub fn chunk_candidates(text: &str, max_chars: usize, overlap: usize) -> Vec<ChunkCandidate> {
    let mut chunks: Vec<ChunkCandidate> = Vec::new();
    let mut buf = String::new();
    let mut buf_len = 0usize;
    let mut buf_overlap = 0usize;

    let paragraphs = text.split('\n').map(str::trim).filter(|p| !p.is_empty());

    for paragraph in paragraphs {
        let para_len = paragraph.chars().count();

        if buf.is_empty() {
            buf.push_str(paragraph);
            buf_len = para_len;
            buf_overlap = 0;
        } else if buf_len + 1 + para_len <= max_chars {
            buf.push('\n');
            buf.push_str(paragraph);
            buf_len += 1 + para_len;
        } else {
            let emitted = std::mem::take(&mut buf);
            let tail = overlap_tail(&emitted, buf_len, overlap);

            chunks.push(ChunkCandidate {
                position: chunks.len() as u32,
                text: emitted,
                overlap_chars: buf_overlap,
            });

            match tail {
                Some(tail) => {
                    buf.push_str(&tail);
                    buf.push('\n');
                    buf.push_str(paragraph);
                    buf_len = overlap + 1 + para_len;
                    buf_overlap = overlap + 1;
                }
                None => {
                    buf.push_str(paragraph);
                    buf_len = para_len;
                    buf_overlap = 0;
                }
            }
        }
    }

    if !buf.is_empty() {
        chunks.push(ChunkCandidate {
            position: chunks.len() as u32,
            text: buf,
            overlap_chars: buf_overlap,
        });
    }

    tracing::debug!(
        "Chunked text into {} chunks (size: {}, overlap: {})",
        chunks.len(),
        max_chars,
        overlap
    );

    chunks
}

/// Last `overlap` characters of an emitted chunk, verbatim.
fn overlap_tail(emitted: &str, emitted_len: usize, overlap: usize) -> Option<String> {
    if overlap == 0 || emitted_len <= overlap {
        return None;
    }
    Some(emitted.chars().skip(emitted_len - overlap).collect())
}
