//! Topic classification and per-topic prompt material.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Subject area of a user message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// Software and programming questions.
    Programming,
    /// Mathematics questions.
    Math,
    /// Natural science questions.
    Science,
    /// Everything else.
    General,
}

const PROGRAMMING_KEYWORDS: &[&str] = &[
    "code",
    "program",
    "function",
    "api",
    "variable",
    "loop",
    "array",
    "algorithm",
    "javascript",
    "python",
    "java",
    "react",
    "typescript",
    "database",
    "server",
    "client",
    "frontend",
    "backend",
];

const MATH_KEYWORDS: &[&str] = &[
    "math",
    "equation",
    "number",
    "calculation",
    "formula",
    "geometry",
    "algebra",
    "calculus",
    "statistics",
    "probability",
    "matrix",
];

const SCIENCE_KEYWORDS: &[&str] = &[
    "science",
    "physics",
    "chemistry",
    "biology",
    "experiment",
    "theory",
    "molecule",
    "atom",
    "cell",
    "genetics",
    "evolution",
    "energy",
];

impl Topic {
    /// Precedence order used by [`Topic::classify`].
    pub const PRECEDENCE: [Self; 3] = [Self::Programming, Self::Math, Self::Science];

    /// Classify by case-insensitive substring match; first matching topic wins.
    #[must_use]
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        Self::PRECEDENCE
            .into_iter()
            .find(|topic| topic.keywords().iter().any(|kw| lower.contains(kw)))
            .unwrap_or(Self::General)
    }

    /// Keywords that select this topic. Empty for [`Topic::General`].
    #[must_use]
    pub const fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Programming => PROGRAMMING_KEYWORDS,
            Self::Math => MATH_KEYWORDS,
            Self::Science => SCIENCE_KEYWORDS,
            Self::General => &[],
        }
    }

    /// Instruction prepended to the user text.
    #[must_use]
    pub const fn prompt_prefix(self) -> &'static str {
        match self {
            Self::Programming => {
                "You are an expert programming tutor. Explain the following concept in a clear, step-by-step manner: "
            }
            Self::Math => {
                "You are a mathematics educator. Break down this problem and explain the solution process: "
            }
            Self::Science => {
                "You are a science teacher. Explain this concept with real-world examples: "
            }
            Self::General => {
                "You are an educational assistant. Provide a clear and engaging explanation: "
            }
        }
    }

    /// Canned educational reply used in place of a missing or thin result.
    #[must_use]
    pub const fn fallback(self) -> &'static str {
        match self {
            Self::Programming => {
                "Let's work through this programming question step by step. Start by stating what the code should do, break the problem into small functions, and test each piece on its own before combining them. If you share the code or error you are seeing, I can walk through it with you."
            }
            Self::Math => {
                "Let's approach this math problem methodically. Write down what is given and what you need to find, pick the formula or theorem that links them, and solve one step at a time, checking each result. Share the exact problem and I can go through the solution with you."
            }
            Self::Science => {
                "Great science question! A good way to understand it is to connect the idea to something you can observe in everyday life, then look at the underlying principle that explains it. Tell me which part you would like to explore and I can give real-world examples."
            }
            Self::General => {
                "That's a great question to explore. Let's break it into smaller parts, look at the key ideas behind each one, and connect them with examples. Tell me a little more about what you would like to learn and I can give a clearer explanation."
            }
        }
    }

    /// Stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Programming => "programming",
            Self::Math => "math",
            Self::Science => "science",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_topic_matches() {
        assert_eq!(Topic::classify("How do I write a Python loop?"), Topic::Programming);
        assert_eq!(Topic::classify("Solve this EQUATION"), Topic::Math);
        assert_eq!(Topic::classify("What is photosynthesis in biology?"), Topic::Science);
        assert_eq!(Topic::classify("Tell me about the Roman empire"), Topic::General);
        assert_eq!(Topic::classify(""), Topic::General);
    }

    #[test]
    fn test_precedence() {
        assert_eq!(Topic::classify("explain this math algorithm"), Topic::Programming);
        assert_eq!(Topic::classify("the physics formula for energy"), Topic::Math);
        assert_eq!(Topic::classify("chemistry of an atom"), Topic::Science);
    }

    #[test]
    fn test_substring_matching() {
        // "photosynthesis" contains no keyword, "cells" contains "cell".
        assert_eq!(Topic::classify("What is photosynthesis?"), Topic::General);
        assert_eq!(Topic::classify("plant cells"), Topic::Science);
        // "capital" contains "api".
        assert_eq!(Topic::classify("What is the capital of France?"), Topic::Programming);
    }

    #[test]
    fn test_fallbacks_are_long_enough() {
        for topic in [Topic::Programming, Topic::Math, Topic::Science, Topic::General] {
            assert!(topic.fallback().chars().count() >= 20);
            assert!(topic.prompt_prefix().ends_with(": "));
        }
    }
}
