//! Heuristic quality checks for a generated script.
//!
//! Overall quality is `0.5 * segment completeness + 0.3 * duration closeness
//! + 0.2 * length`, each term in [0, 1]. Readability and text-to-speech
//! hygiene only produce warnings.

use crate::config::PodcastConfig;
use crate::models::ValidationResult;

const SEGMENT_WEIGHT: f64 = 0.5;
const DURATION_WEIGHT: f64 = 0.3;
const LENGTH_WEIGHT: f64 = 0.2;

/// Duration closeness below this produces a warning.
const DURATION_CLOSENESS_FLOOR: f64 = 0.8;
const MAX_AVERAGE_SENTENCE_WORDS: f64 = 30.0;

#[derive(Debug, Clone)]
pub struct ScriptValidator {
    words_per_minute: f64,
    target_minutes: f64,
    min_word_count: usize,
}

impl ScriptValidator {
    pub fn new(words_per_minute: f64, target_minutes: f64, min_word_count: usize) -> Self {
        Self {
            words_per_minute,
            target_minutes,
            min_word_count,
        }
    }

    pub fn from_config(config: &PodcastConfig) -> Self {
        Self::new(
            config.episode.words_per_minute,
            config.episode.target_length_minutes,
            config.episode.min_word_count,
        )
    }

    pub fn validate(&self, script: &str, segment_names: &[String]) -> ValidationResult {
        let word_count = count_words(script);
        let estimated_duration_minutes = word_count as f64 / self.words_per_minute;

        let lowered = script.to_lowercase();
        let missing_segments: Vec<String> = segment_names
            .iter()
            .filter(|name| !lowered.contains(&name.to_lowercase()))
            .cloned()
            .collect();
        let segment_completeness = if segment_names.is_empty() {
            1.0
        } else {
            (segment_names.len() - missing_segments.len()) as f64 / segment_names.len() as f64
        };

        let duration_closeness = if self.target_minutes > 0.0 {
            (1.0 - (estimated_duration_minutes - self.target_minutes).abs() / self.target_minutes)
                .clamp(0.0, 1.0)
        } else {
            1.0
        };

        let length_score = if self.min_word_count == 0 {
            1.0
        } else {
            (word_count as f64 / self.min_word_count as f64).min(1.0)
        };

        let overall_quality = (SEGMENT_WEIGHT * segment_completeness
            + DURATION_WEIGHT * duration_closeness
            + LENGTH_WEIGHT * length_score)
            .clamp(0.0, 1.0);

        let mut warnings = Vec::new();

        if !missing_segments.is_empty() {
            warnings.push(format!("missing segments: {}", missing_segments.join(", ")));
        }

        if duration_closeness < DURATION_CLOSENESS_FLOOR {
            let diff = estimated_duration_minutes - self.target_minutes;
            let direction = if diff < 0.0 { "shorter" } else { "longer" };
            warnings.push(format!(
                "script {} than target duration by {:.1} minutes",
                direction,
                diff.abs()
            ));
        }

        if word_count < self.min_word_count {
            warnings.push(format!(
                "script has {} words, below the minimum of {}",
                word_count, self.min_word_count
            ));
        }

        if let Some(average) = average_sentence_words(script) {
            if average > MAX_AVERAGE_SENTENCE_WORDS {
                warnings.push(format!(
                    "average sentence is {:.0} words long; long sentences are hard to follow when spoken",
                    average
                ));
            }
        }

        let links = count_links(script);
        if links > 0 {
            warnings.push(format!(
                "script contains {} links or URLs that text-to-speech will read aloud",
                links
            ));
        }

        ValidationResult {
            word_count,
            estimated_duration_minutes,
            segment_completeness,
            missing_segments,
            overall_quality,
            warnings,
        }
    }
}

/// Whitespace-separated tokens with at least one letter or digit.
/// Markdown markers such as `##` or `---` are not words.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace()
        .filter(|token| token.chars().any(char::is_alphanumeric))
        .count()
}

fn average_sentence_words(text: &str) -> Option<f64> {
    let counts: Vec<usize> = text
        .split(['.', '!', '?'])
        .map(count_words)
        .filter(|&n| n > 0)
        .collect();

    if counts.is_empty() {
        return None;
    }
    Some(counts.iter().sum::<usize>() as f64 / counts.len() as f64)
}

fn count_links(text: &str) -> usize {
    text.split_whitespace()
        .filter(|token| token.contains("http://") || token.contains("https://") || token.contains("]("))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments() -> Vec<String> {
        PodcastConfig::default().episode.segments
    }

    fn validator() -> ScriptValidator {
        ScriptValidator::new(150.0, 8.0, 600)
    }

    /// Headers contribute 15 words; the body pads the script to `words` total.
    fn complete_script(words: usize) -> String {
        let mut script: String = segments().iter().map(|s| format!("## {}\n\n", s)).collect();
        script.push_str(&"Publishers signed a new deal. ".repeat((words - 15) / 5));
        script
    }

    #[test]
    fn nine_hundred_words_is_six_minutes() {
        let script = "word ".repeat(900);
        let result = validator().validate(&script, &[]);
        assert_eq!(result.word_count, 900);
        assert_eq!(result.estimated_duration_minutes, 6.0);
    }

    #[test]
    fn on_target_script_scores_full_quality() {
        let result = validator().validate(&complete_script(1200), &segments());

        assert_eq!(result.word_count, 1200);
        assert_eq!(result.estimated_duration_minutes, 8.0);
        assert_eq!(result.segment_completeness, 1.0);
        assert!(result.missing_segments.is_empty());
        assert!((result.overall_quality - 1.0).abs() < 1e-9);
        assert!(result.warnings.is_empty(), "unexpected warnings: {:?}", result.warnings);
    }

    #[test]
    fn short_script_reports_the_shortfall() {
        let result = validator().validate(&complete_script(900), &segments());

        assert!(result
            .warnings
            .iter()
            .any(|w| w == "script shorter than target duration by 2.0 minutes"));
        // 0.5 + 0.3 * 0.75 + 0.2
        assert!((result.overall_quality - 0.925).abs() < 1e-9);
    }

    #[test]
    fn long_script_reports_the_overrun() {
        let result = validator().validate(&complete_script(2400), &segments());
        assert!(result
            .warnings
            .iter()
            .any(|w| w == "script longer than target duration by 8.0 minutes"));
    }

    #[test]
    fn segments_match_case_insensitively() {
        let script = "BREAKING NEWS & MAJOR DEALS\nstuff\nexecutive takeaways\nmore stuff";
        let result = validator().validate(script, &segments());

        assert!((result.segment_completeness - 0.4).abs() < 1e-9);
        assert_eq!(result.missing_segments.len(), 3);
        assert!(result.warnings[0].starts_with("missing segments: Executive Moves"));
    }

    #[test]
    fn empty_script_is_flagged_everywhere() {
        let result = validator().validate("", &segments());
        assert_eq!(result.word_count, 0);
        assert_eq!(result.segment_completeness, 0.0);
        assert_eq!(result.overall_quality, 0.0);
        assert!(result.warnings.iter().any(|w| w.contains("below the minimum of 600")));
    }

    #[test]
    fn markdown_markers_are_not_words() {
        assert_eq!(count_words("## Breaking News\n---\n* one & two"), 4);
    }

    #[test]
    fn long_sentences_and_links_are_warned_about() {
        let rambling = format!("{}.", "word ".repeat(150));
        let script = format!("{} See https://example.com/story and [this](https://x.y).", rambling);
        let result = validator().validate(&script, &[]);

        assert!(result.warnings.iter().any(|w| w.contains("average sentence")));
        assert!(result.warnings.iter().any(|w| w.contains("2 links or URLs")));
    }

    #[test]
    fn validation_is_idempotent() {
        let script = complete_script(700);
        let v = validator();
        assert_eq!(v.validate(&script, &segments()), v.validate(&script, &segments()));
    }
}
