//! Chunked loading for large documents.
//!
//! Content longer than [`LoadOptions::chunk_size`] is cut at blank lines that
//! sit outside fenced code, parsed a chunk at a time and applied in batches,
//! so a caller can report progress and abandon the load between batches.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub const DEFAULT_CHUNK_SIZE: usize = 5000;
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Stops an in-flight [`EditorStore::set_md_content_with`] at the next batch
/// boundary.
///
/// [`EditorStore::set_md_content_with`]: crate::editing::EditorStore::set_md_content_with
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

pub struct LoadOptions<'a> {
    /// Content at or under this many bytes is parsed in one go.
    pub chunk_size: usize,
    /// Chunks parsed between progress reports and cancellation checks.
    pub batch_size: usize,
    /// Called with the loaded fraction, ending at `1.0` on success.
    pub on_progress: Option<Box<dyn FnMut(f64) + 'a>>,
}

impl Default for LoadOptions<'_> {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            on_progress: None,
        }
    }
}

impl<'a> LoadOptions<'a> {
    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    pub fn batch_size(mut self, chunks: usize) -> Self {
        self.batch_size = chunks.max(1);
        self
    }

    pub fn on_progress(mut self, f: impl FnMut(f64) + 'a) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    pub(crate) fn report(&mut self, fraction: f64) {
        if let Some(f) = self.on_progress.as_mut() {
            f(fraction.clamp(0.0, 1.0));
        }
    }
}

/// Splits `markdown` at blank lines, never inside a ``` or ~~~ fence.
/// Blank chunks are dropped.
pub fn split_chunks(markdown: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut fence: Option<(char, usize)> = None;
    let mut start = 0;
    let mut offset = 0;
    let mut prev_blank = false;

    for line in markdown.split_inclusive('\n') {
        let trimmed = line.trim();
        match fence {
            Some((ch, len)) => {
                if fence_marker(trimmed).is_some_and(|(c, n)| c == ch && n >= len)
                    && trimmed.chars().all(|c| c == ch)
                {
                    fence = None;
                }
            }
            None if trimmed.is_empty() => {
                if !prev_blank {
                    push_chunk(&mut chunks, &markdown[start..offset]);
                }
                start = offset + line.len();
            }
            None => fence = fence_marker(trimmed),
        }
        prev_blank = fence.is_none() && trimmed.is_empty();
        offset += line.len();
    }
    push_chunk(&mut chunks, &markdown[start..]);
    chunks
}

fn push_chunk<'s>(chunks: &mut Vec<&'s str>, chunk: &'s str) {
    if !chunk.trim().is_empty() {
        chunks.push(chunk.trim_end_matches(['\n', '\r']));
    }
}

fn fence_marker(line: &str) -> Option<(char, usize)> {
    let ch = line.chars().next().filter(|c| matches!(c, '`' | '~'))?;
    let len = line.chars().take_while(|&c| c == ch).count();
    (len >= 3).then_some((ch, len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_on_blank_lines() {
        assert_eq!(split_chunks("a\nb\n\nc\n\n\n\nd\n"), vec!["a\nb", "c", "d"]);
    }

    #[test]
    fn fences_stay_whole() {
        let md = "intro\n\n```\nfn a() {}\n\nfn b() {}\n```\n\n~~~~\nx\n\n~~~\ny\n~~~~\n\nend";
        assert_eq!(
            split_chunks(md),
            vec![
                "intro",
                "```\nfn a() {}\n\nfn b() {}\n```",
                "~~~~\nx\n\n~~~\ny\n~~~~",
                "end"
            ]
        );
    }

    #[test]
    fn unterminated_fence_runs_to_the_end() {
        assert_eq!(split_chunks("```\na\n\nb"), vec!["```\na\n\nb"]);
    }

    #[test]
    fn blank_input_has_no_chunks() {
        assert!(split_chunks("\n\n  \n").is_empty());
    }

    #[test]
    fn cancel_handle_is_shared() {
        let handle = CancelHandle::default();
        let clone = handle.clone();
        clone.cancel();
        assert!(handle.is_cancelled());
        handle.reset();
        assert!(!clone.is_cancelled());
    }
}
