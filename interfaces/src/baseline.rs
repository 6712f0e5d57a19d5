use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::defs::ThemeModel;
use crate::defs::ThemeReport;

const MAX_THEMES: usize = 5;
const MIN_WORD_CHARS: usize = 5;

/// Keyword-frequency themes over entry titles.
///
/// Only looks at `Title: ` lines when the text has any, otherwise at the whole
/// text. Ties are broken alphabetically so the same input always yields the
/// same themes.
pub struct KeywordThemeModel;

fn title_lines(text: &str) -> Vec<&str> {
    text.lines()
        .filter_map(|line| line.trim_start().strip_prefix("Title: "))
        .collect()
}

fn is_stop_word(word: &str) -> bool {
    matches!(
        word,
        "about" | "after" | "again" | "being" | "could" | "every" | "their" | "there" | "these"
            | "those" | "through" | "under" | "where" | "which" | "while" | "would" | "should"
            | "other" | "still" | "your" | "what" | "with" | "from" | "into" | "than" | "then"
            | "they" | "this" | "that" | "have" | "were" | "will" | "does" | "doing" | "using"
    )
}

pub fn extract_keywords(text: &str, limit: usize) -> Vec<String> {
    let titles = title_lines(text);
    let corpus: Vec<&str> = if titles.is_empty() { vec![text] } else { titles };

    let mut counts: HashMap<String, usize> = HashMap::new();
    for chunk in corpus {
        for raw in chunk.split_whitespace() {
            let word = raw
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if word.chars().count() < MIN_WORD_CHARS || is_stop_word(&word) {
                continue;
            }
            *counts.entry(word).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(word, _)| word).collect()
}

#[async_trait]
impl ThemeModel for KeywordThemeModel {
    fn model_name(&self) -> String {
        "keyword-frequency".to_owned()
    }

    async fn summarize(&self, text: &str) -> Result<ThemeReport> {
        Ok(ThemeReport {
            themes: extract_keywords(text, MAX_THEMES),
            observation: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_only_title_lines_when_present() {
        let text = "Title: Transformers scaling laws\nContent: gradient gradient gradient\n\nTitle: Scaling transformers again\n";
        let keywords = extract_keywords(text, 5);
        assert_eq!(keywords, vec!["scaling", "transformers"]);
    }

    #[test]
    fn ties_break_alphabetically() {
        let keywords = extract_keywords("zebra apple mango", 2);
        assert_eq!(keywords, vec!["apple", "mango"]);
    }

    #[test]
    fn short_and_stop_words_are_ignored() {
        assert!(extract_keywords("the cat sat with those dogs", 5).is_empty());
    }

    #[tokio::test]
    async fn caps_theme_count() {
        let text = "Title: alpha1 bravo2 charlie3 delta4 echo55 foxtrot6 golf77";
        let report = KeywordThemeModel.summarize(text).await.unwrap();
        assert_eq!(report.themes.len(), 5);
        assert!(report.observation.is_none());
    }
}
