//! Re-segmentation of a finished artifact into stream chunks.

use super::GeneratedArtifact;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};

/// One slice of generated code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeChunk {
    /// Position of the chunk, starting at 0
    pub index: usize,
    /// Code text of this chunk
    pub content: String,
    /// Approximate tokens emitted so far, this chunk included
    pub tokens_so_far: u64,
    /// Whether this is the last chunk
    pub done: bool,
}

/// Finite, non-restartable sequence of [`CodeChunk`]s over an artifact.
///
/// No model work happens here. Chunks hold at most `chunk_size` characters and
/// never split a UTF-8 sequence.
#[derive(Debug)]
pub struct ChunkStream {
    artifact: GeneratedArtifact,
    chunk_size: usize,
    offset: usize,
    index: usize,
    chars_emitted: usize,
    finished: bool,
}

impl ChunkStream {
    /// Creates a stream over `artifact`'s code. A zero `chunk_size` is treated as 1.
    pub fn new(artifact: GeneratedArtifact, chunk_size: usize) -> Self {
        Self {
            artifact,
            chunk_size: chunk_size.max(1),
            offset: 0,
            index: 0,
            chars_emitted: 0,
            finished: false,
        }
    }

    /// The artifact being streamed.
    pub fn artifact(&self) -> &GeneratedArtifact {
        &self.artifact
    }

    /// Consumes the stream, returning the artifact.
    pub fn into_artifact(self) -> GeneratedArtifact {
        self.artifact
    }
}

impl Iterator for ChunkStream {
    type Item = CodeChunk;

    fn next(&mut self) -> Option<CodeChunk> {
        if self.finished {
            return None;
        }

        let code = &self.artifact.code;
        let rest = &code[self.offset..];
        let end = rest
            .char_indices()
            .nth(self.chunk_size)
            .map_or(code.len(), |(index, _)| self.offset + index);
        let content = code[self.offset..end].to_owned();

        self.chars_emitted += content.chars().count();
        self.offset = end;
        self.finished = self.offset >= code.len();

        let chunk = CodeChunk {
            index: self.index,
            content,
            tokens_so_far: (self.chars_emitted / 4) as u64,
            done: self.finished,
        };
        self.index += 1;
        Some(chunk)
    }
}

impl Stream for ChunkStream {
    type Item = CodeChunk;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<CodeChunk>> {
        Poll::Ready(self.get_mut().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::TokenUsage;

    fn artifact(code: &str) -> GeneratedArtifact {
        GeneratedArtifact {
            code: code.to_owned(),
            raw: code.to_owned(),
            usage: TokenUsage::default(),
            model_id: "test-model".to_owned(),
            cost: 0.0,
        }
    }

    #[test]
    fn test_chunks_reassemble_and_finish_once() {
        let code = "x".repeat(250);
        let chunks: Vec<CodeChunk> = ChunkStream::new(artifact(&code), 100).collect();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].content.len(), 50);
        assert_eq!(chunks.iter().filter(|chunk| chunk.done).count(), 1);
        assert!(chunks[2].done);
        assert_eq!(chunks[2].tokens_so_far, 62);
        assert_eq!(
            chunks.iter().map(|chunk| chunk.content.as_str()).collect::<String>(),
            code
        );
    }

    #[test]
    fn test_empty_artifact_yields_single_final_chunk() {
        let mut stream = ChunkStream::new(artifact(""), 100);
        let only = stream.next();

        assert_eq!(only.as_ref().map(|chunk| chunk.content.as_str()), Some(""));
        assert_eq!(only.map(|chunk| chunk.done), Some(true));
        assert_eq!(stream.next(), None);
    }

    #[test]
    fn test_multibyte_characters_are_not_split() {
        let code = "é→😀".repeat(5);
        let chunks: Vec<CodeChunk> = ChunkStream::new(artifact(&code), 4).collect();

        assert!(chunks.iter().all(|chunk| chunk.content.chars().count() <= 4));
        assert_eq!(
            chunks.iter().map(|chunk| chunk.content.as_str()).collect::<String>(),
            code
        );
    }

    #[tokio::test]
    async fn test_polls_as_stream() {
        use futures::StreamExt;

        let chunks: Vec<CodeChunk> =
            StreamExt::collect(ChunkStream::new(artifact("abcdef"), 4)).await;
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "abcd");
        assert!(chunks[1].done);
    }
}
