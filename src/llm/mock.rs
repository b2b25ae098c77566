// ABOUTME: Deterministic mock text generator for development and tests
// ABOUTME: Produces a canned reply and splits it into reproducible word chunks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::time::Duration;

use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use super::{Generation, GenerationRequest, StreamingGeneration, TextGenerator, TokenUsage};
use crate::errors::AppError;

const MOCK_MODEL: &str = "mock-model";

const EMPTY_PROMPT_REPLY: &str = "Mocked completion response.";

const CANNED_REPLY: &str = "Thanks for sharing this! I\u{2019}ve reviewed the details and everything looks good on my end. I like the direction this is heading, and I think with a bit of fine-tuning we can make it even stronger.\n\nLet me know if you\u{2019}d like me to take the next step or if there\u{2019}s anything specific you want me to adjust. Happy to iterate \u{1f44d}";

const MIN_CHUNK_WORDS: usize = 3;
const MAX_CHUNK_WORDS: usize = 12;
/// Every fifth chunk may run up to this many extra words
const LONG_CHUNK_EXTRA_WORDS: usize = 10;
/// Chance of breaking early at a sentence end
const SENTENCE_BREAK_PROBABILITY: f64 = 0.35;

/// Generator returning a fixed reply, streamed in deterministic chunks
#[derive(Debug, Clone, Default)]
pub struct MockTextGenerator {
    chunk_delay: Duration,
}

impl MockTextGenerator {
    /// Create a generator that pauses `chunk_delay` between streamed fragments
    #[must_use]
    pub const fn new(chunk_delay: Duration) -> Self {
        Self { chunk_delay }
    }

    /// Reply text for a prompt
    #[must_use]
    pub fn reply_for(prompt: &str) -> &'static str {
        if prompt.trim().is_empty() {
            EMPTY_PROMPT_REPLY
        } else {
            CANNED_REPLY
        }
    }

    fn usage(prompt: &str, text: &str) -> TokenUsage {
        TokenUsage::new(count_tokens(prompt), count_tokens(text))
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        MOCK_MODEL
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, AppError> {
        let text = Self::reply_for(&request.prompt);
        debug!(
            context_messages = request.messages.len(),
            "Generating mock completion"
        );
        Ok(Generation {
            text: text.to_owned(),
            usage: Self::usage(&request.prompt, text),
            model: MOCK_MODEL.to_owned(),
        })
    }

    async fn generate_stream(
        &self,
        request: &GenerationRequest,
    ) -> Result<StreamingGeneration, AppError> {
        let text = Self::reply_for(&request.prompt);
        let chunks = split_into_chunks(text, &request.prompt);
        let delay = self.chunk_delay;
        debug!(
            chunks = chunks.len(),
            context_messages = request.messages.len(),
            "Streaming mock completion"
        );

        let fragments = async_stream::stream! {
            for chunk in chunks {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                yield Ok(chunk);
            }
        };

        Ok(StreamingGeneration {
            model: MOCK_MODEL.to_owned(),
            usage: Self::usage(&request.prompt, text),
            fragments: Box::pin(fragments),
        })
    }
}

/// Whitespace-separated word count, never less than one
#[must_use]
pub fn count_tokens(text: &str) -> u32 {
    u32::try_from(text.split_whitespace().count())
        .unwrap_or(u32::MAX)
        .max(1)
}

/// Split `text` into word chunks whose concatenation is exactly `text`
///
/// Chunks hold 3 to 12 words; every fifth chunk may hold up to ten more, and a
/// sentence end may close a chunk early. The split is seeded from `prompt` and
/// the text length, so the same inputs always produce the same chunks.
#[must_use]
pub fn split_into_chunks(text: &str, prompt: &str) -> Vec<String> {
    let mut rng = ChaCha8Rng::seed_from_u64(u64::from(hash_seed(&format!(
        "{prompt}:{}",
        text.chars().count()
    ))));

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut word_count = 0;
    let mut chunk_index = 0;
    let mut target_words = next_chunk_size(&mut rng, chunk_index);

    for token in tokenize(text) {
        current.push_str(token);
        if !token.starts_with(char::is_whitespace) {
            word_count += 1;
            let sentence_end = token.ends_with(['.', '!', '?']);
            if sentence_end
                && word_count >= MIN_CHUNK_WORDS
                && rng.gen::<f64>() < SENTENCE_BREAK_PROBABILITY
            {
                chunks.push(std::mem::take(&mut current));
                word_count = 0;
                chunk_index += 1;
                target_words = next_chunk_size(&mut rng, chunk_index);
                continue;
            }
        }

        if word_count >= target_words {
            chunks.push(std::mem::take(&mut current));
            word_count = 0;
            chunk_index += 1;
            target_words = next_chunk_size(&mut rng, chunk_index);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn next_chunk_size(rng: &mut ChaCha8Rng, chunk_index: usize) -> usize {
    let base = rng.gen_range(MIN_CHUNK_WORDS..=MAX_CHUNK_WORDS);
    if chunk_index % 5 == 4 {
        base + rng.gen_range(0..LONG_CHUNK_EXTRA_WORDS)
    } else {
        base
    }
}

fn hash_seed(value: &str) -> u32 {
    value
        .encode_utf16()
        .fold(0_u32, |hash, unit| hash.wrapping_mul(31).wrapping_add(u32::from(unit)))
}

/// Alternating runs of whitespace and non-whitespace
fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let in_space = first.is_whitespace();
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_whitespace() != in_space)
            .map_or(rest.len(), |(i, _)| i);
        let (token, tail) = rest.split_at(end);
        rest = tail;
        Some(token)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[test]
    fn test_count_tokens_minimum_one() {
        assert_eq!(count_tokens(""), 1);
        assert_eq!(count_tokens("   "), 1);
        assert_eq!(count_tokens("one two\n three"), 3);
    }

    #[test]
    fn test_reply_for_blank_prompt() {
        assert_eq!(MockTextGenerator::reply_for("  \n"), EMPTY_PROMPT_REPLY);
        assert_eq!(MockTextGenerator::reply_for("hi"), CANNED_REPLY);
    }

    #[test]
    fn test_chunks_concatenate_to_text() {
        let chunks = split_into_chunks(CANNED_REPLY, "hello");
        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), CANNED_REPLY);
    }

    #[test]
    fn test_chunks_are_deterministic() {
        assert_eq!(
            split_into_chunks(CANNED_REPLY, "same prompt"),
            split_into_chunks(CANNED_REPLY, "same prompt")
        );
    }

    #[test]
    fn test_chunk_word_bounds() {
        for prompt in ["a", "b", "what is new?", "tell me more"] {
            let chunks = split_into_chunks(CANNED_REPLY, prompt);
            let (last, body) = chunks.split_last().unwrap();
            for chunk in body {
                let words = chunk.split_whitespace().count();
                assert!(
                    (MIN_CHUNK_WORDS..MAX_CHUNK_WORDS + LONG_CHUNK_EXTRA_WORDS).contains(&words),
                    "chunk {chunk:?} has {words} words"
                );
            }
            assert!(!last.is_empty());
        }
    }

    #[test]
    fn test_tokenize_preserves_whitespace_runs() {
        let tokens: Vec<_> = tokenize("a  b\n\nc").collect();
        assert_eq!(tokens, vec!["a", "  ", "b", "\n\n", "c"]);
    }

    #[tokio::test]
    async fn test_stream_matches_buffered_text() {
        let generator = MockTextGenerator::default();
        let request = GenerationRequest::new("How am I doing?", Vec::new());

        let buffered = generator.generate(&request).await.unwrap();
        let streaming = generator.generate_stream(&request).await.unwrap();
        let fragments: Vec<String> = streaming
            .fragments
            .map(|fragment| fragment.unwrap())
            .collect()
            .await;

        assert_eq!(fragments.concat(), buffered.text);
        assert_eq!(streaming.usage, buffered.usage);
        assert_eq!(buffered.usage.input_tokens, 4);
        assert_eq!(buffered.model, "mock-model");
    }
}
