use serde::{Deserialize, Serialize};

/// One unit of tokenized text.
///
/// `start` and `end` are reconstructed by laying the decoded token strings end
/// to end, counted in UTF-16 code units so they index the text the same way a
/// browser does. They only line up with the input when decoding partitions it
/// losslessly; byte-level and normalizing tokenizers drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSpan {
    pub token: String,
    pub id: u32,
    pub start: usize,
    pub end: usize,
}

impl TokenSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Lays decoded tokens end to end starting at offset 0.
pub fn reconstruct_spans<I>(decoded: I) -> Vec<TokenSpan>
where
    I: IntoIterator<Item = (u32, String)>,
{
    let mut pos = 0;
    decoded
        .into_iter()
        .map(|(id, token)| {
            let len = utf16_len(&token);
            let span = TokenSpan {
                token,
                id,
                start: pos,
                end: pos + len,
            };
            pos += len;
            span
        })
        .collect()
}

/// Length of `s` in UTF-16 code units. Characters outside the BMP count twice.
pub fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenStats {
    pub tokens: usize,
    /// Input length in UTF-16 code units.
    pub chars: usize,
    /// tokens / chars as a percentage, rounded to two decimals.
    pub compression_rate: f64,
}

impl TokenStats {
    pub fn new(text: &str, spans: &[TokenSpan]) -> Self {
        let tokens = spans.len();
        let chars = utf16_len(text);
        let compression_rate = if chars == 0 {
            0.0
        } else {
            (tokens as f64 / chars as f64 * 100.0 * 100.0).round() / 100.0
        };

        Self {
            tokens,
            chars,
            compression_rate,
        }
    }

    pub fn rate_display(&self) -> String {
        format!("{:.2}%", self.compression_rate)
    }
}
