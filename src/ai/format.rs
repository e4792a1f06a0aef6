//! Post-processing of generated text.

use regex::Regex;

use crate::ai::topic::Topic;

/// Cleans raw model output before it is shown.
pub struct ResponseFormatter {
    wrapping: Regex,
    newline_runs: Regex,
    code_fence: Regex,
    min_chars: usize,
}

impl ResponseFormatter {
    /// Create a formatter that replaces replies shorter than `min_chars`.
    ///
    /// # Errors
    /// Returns an error if any regex pattern is invalid.
    pub fn new(min_chars: usize) -> Result<Self, regex::Error> {
        Ok(Self {
            wrapping: Regex::new(r#"^["\s]+|["\s]+$"#)?,
            newline_runs: Regex::new(r"\n+")?,
            code_fence: Regex::new(r"```(\w+)?\n([\s\S]*?)```")?,
            min_chars,
        })
    }

    /// Trim, strip wrapping quotes, unescape and collapse newlines, and for
    /// programming replies put each code fence on its own line.
    ///
    /// Applying this to its own output returns the same string.
    #[must_use]
    pub fn clean(&self, raw: &str, topic: Topic) -> String {
        let text = self.wrapping.replace_all(raw.trim(), "");
        let text = text.replace("\\n", "\n");
        let text = self.newline_runs.replace_all(&text, "\n");
        // Unescaped newlines can land at either end; strip once more.
        let mut text = self.wrapping.replace_all(&text, "").into_owned();

        if topic == Topic::Programming {
            let wrapped = self.code_fence.replace_all(&text, |caps: &regex::Captures<'_>| {
                let lang = caps.get(1).map_or("", |m| m.as_str());
                let code = caps.get(2).map_or("", |m| m.as_str()).trim();
                format!("\n```{lang}\n{code}\n```\n")
            });
            text = self
                .newline_runs
                .replace_all(&wrapped, "\n")
                .trim()
                .to_string();
        }

        text
    }

    /// Clean `raw` and fall back to the topic's canned reply when the result
    /// is empty or too short.
    #[must_use]
    pub fn finalize(&self, raw: &str, topic: Topic) -> String {
        let cleaned = self.clean(raw, topic);
        if cleaned.chars().count() < self.min_chars {
            return topic.fallback().to_string();
        }
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formatter() -> ResponseFormatter {
        ResponseFormatter::new(20).unwrap()
    }

    #[test]
    fn test_strips_quotes_and_whitespace() {
        let f = formatter();
        assert_eq!(f.clean("  \"Hello there\" \n", Topic::General), "Hello there");
    }

    #[test]
    fn test_unescapes_and_collapses_newlines() {
        let f = formatter();
        assert_eq!(
            f.clean("line one\\n\\nline two\n\n\nline three", Topic::General),
            "line one\nline two\nline three"
        );
    }

    #[test]
    fn test_wraps_code_fences() {
        let f = formatter();
        let raw = "Here is a loop: ```python\nfor i in range(3):\n    print(i)\n\n```and that's it.";
        assert_eq!(
            f.clean(raw, Topic::Programming),
            "Here is a loop: \n```python\nfor i in range(3):\n    print(i)\n```\nand that's it."
        );
    }

    #[test]
    fn test_fences_left_alone_outside_programming() {
        let f = formatter();
        let raw = "See ```x\ny```z";
        assert_eq!(f.clean(raw, Topic::Math), raw);
    }

    #[test]
    fn test_clean_is_idempotent() {
        let f = formatter();
        let samples = [
            ("\"Photosynthesis is how plants make food.\"", Topic::Science),
            ("Use this:\n```rust\nfn main() {}\n```\nDone.", Topic::Programming),
            ("```js\nlet x = 1;```", Topic::Programming),
            ("a\\n\\nb\n\nc", Topic::General),
            ("\"Plants use sunlight to make food.\\n\"", Topic::General),
            ("\\n\"quoted\" start", Topic::Science),
            ("Try this:\\n```py\nprint(1)```\\n", Topic::Programming),
        ];
        for (raw, topic) in samples {
            let once = f.clean(raw, topic);
            assert_eq!(f.clean(&once, topic), once);
        }
    }

    #[test]
    fn test_escaped_newline_at_edges() {
        let f = formatter();
        assert_eq!(
            f.clean("\"Plants use sunlight to make food.\\n\"", Topic::General),
            "Plants use sunlight to make food."
        );
        assert_eq!(f.clean("\\n\\nHello\\n", Topic::General), "Hello");
    }

    #[test]
    fn test_short_replies_fall_back() {
        let f = formatter();
        assert_eq!(f.finalize("  ", Topic::Math), Topic::Math.fallback());
        assert_eq!(f.finalize("\"ok\"", Topic::Science), Topic::Science.fallback());
        let long = "Photosynthesis is the process plants use.";
        assert_eq!(f.finalize(long, Topic::General), long);
    }
}
