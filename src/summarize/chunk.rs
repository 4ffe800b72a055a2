//! Token-window chunking for LLM input.

use std::error::Error;
use tokenizers::Tokenizer;
use tracing::info;

/// Tokenizer used to measure and split article text.
///
/// `Whitespace` counts whitespace-separated words and needs no model files.
/// `HuggingFace` loads a `tokenizer.json` matching the served model, so the
/// windows line up with the model's real context size.
pub enum TextTokenizer {
    Whitespace,
    HuggingFace(Box<Tokenizer>),
}

impl std::fmt::Debug for TextTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextTokenizer::Whitespace => f.write_str("Whitespace"),
            TextTokenizer::HuggingFace(_) => f.write_str("HuggingFace"),
        }
    }
}

impl TextTokenizer {
    /// Load a HuggingFace tokenizer from `path`, or fall back to whitespace
    /// splitting when no path is given.
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn Error>> {
        match path {
            Some(p) => {
                let tokenizer = Tokenizer::from_file(p).map_err(|e| e.to_string())?;
                info!(path = p, "Loaded tokenizer");
                Ok(TextTokenizer::HuggingFace(Box::new(tokenizer)))
            }
            None => Ok(TextTokenizer::Whitespace),
        }
    }
}

/// Split `text` into pieces of at most `max_tokens` tokens.
///
/// Text that already fits is returned unchanged as a single chunk; longer
/// text is cut into consecutive token windows and decoded back to strings
/// (special tokens skipped).
pub fn chunk_text_by_tokens(
    text: &str,
    tokenizer: &TextTokenizer,
    max_tokens: usize,
) -> Result<Vec<String>, Box<dyn Error>> {
    let max_tokens = max_tokens.max(1);
    match tokenizer {
        TextTokenizer::Whitespace => {
            let words: Vec<&str> = text.split_whitespace().collect();
            if words.len() <= max_tokens {
                return Ok(vec![text.to_string()]);
            }
            Ok(words.chunks(max_tokens).map(|w| w.join(" ")).collect())
        }
        TextTokenizer::HuggingFace(tok) => {
            let encoding = tok.encode(text, false).map_err(|e| e.to_string())?;
            let ids = encoding.get_ids();
            if ids.len() <= max_tokens {
                return Ok(vec![text.to_string()]);
            }
            let mut chunks = Vec::with_capacity(ids.len().div_ceil(max_tokens));
            for window in ids.chunks(max_tokens) {
                chunks.push(tok.decode(window, true).map_err(|e| e.to_string())?);
            }
            Ok(chunks)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_single_unchanged_chunk() {
        let text = "  Salmonella  in eggs ";
        let chunks = chunk_text_by_tokens(text, &TextTokenizer::Whitespace, 10).unwrap();
        assert_eq!(chunks, vec![text.to_string()]);
    }

    #[test]
    fn test_long_text_is_windowed() {
        let text = "one two three four five six seven";
        let chunks = chunk_text_by_tokens(text, &TextTokenizer::Whitespace, 3).unwrap();
        assert_eq!(chunks, vec!["one two three", "four five six", "seven"]);
    }

    #[test]
    fn test_exact_fit_is_single_chunk() {
        let chunks = chunk_text_by_tokens("a b c", &TextTokenizer::Whitespace, 3).unwrap();
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_load_without_path_is_whitespace() {
        assert!(matches!(TextTokenizer::load(None).unwrap(), TextTokenizer::Whitespace));
    }

    #[test]
    fn test_load_missing_file_is_error() {
        assert!(TextTokenizer::load(Some("/nonexistent/tokenizer.json")).is_err());
    }
}
