//! crates/sous_core/src/heuristics.rs
//!
//! The natural-language heuristics used by structuring and synchronization.
//! They sit behind `TextHeuristics` so they can be improved or replaced
//! without touching the session machine or the synchronizer.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static QUANTITY_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+(?:[./]\d+)?|\d*[½⅓⅔¼¾⅛])$").unwrap());

static TIMING_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+)(?:\s*(?:-|to)\s*(\d+))?\s*(seconds?|secs?|minutes?|mins?|hours?|hrs?)\b")
        .unwrap()
});

/// Past and gerund forms of cooking verbs mapped to their base form.
const VERB_FORMS: &[(&str, &str)] = &[
    ("chopped", "chop"),
    ("chopping", "chop"),
    ("diced", "dice"),
    ("dicing", "dice"),
    ("minced", "mince"),
    ("mincing", "mince"),
    ("sliced", "slice"),
    ("slicing", "slice"),
    ("grated", "grate"),
    ("grating", "grate"),
    ("peeled", "peel"),
    ("peeling", "peel"),
    ("melted", "melt"),
    ("melting", "melt"),
    ("softened", "soften"),
    ("beaten", "beat"),
    ("beating", "beat"),
    ("whisked", "whisk"),
    ("toasted", "toast"),
    ("crushed", "crush"),
    ("shredded", "shred"),
    ("julienned", "julienne"),
    ("cubed", "cube"),
    ("halved", "halve"),
    ("quartered", "quarter"),
    ("drained", "drain"),
    ("rinsed", "rinse"),
    ("sifted", "sift"),
    ("cooked", "cook"),
    ("boiled", "boil"),
    ("roasted", "roast"),
    ("ground", "grind"),
    ("fried", "fry"),
    ("rolled", "roll"),
    ("trimmed", "trim"),
    ("zested", "zest"),
    ("juiced", "juice"),
    ("mashed", "mash"),
    ("pitted", "pit"),
    ("seeded", "seed"),
    ("stemmed", "stem"),
    ("thawed", "thaw"),
    ("warmed", "warm"),
    ("chilled", "chill"),
    ("divided", "divide"),
    ("soaked", "soak"),
];

/// Doubled endings that belong to the base word ("filled" -> "fill").
const KEPT_DOUBLES: &[char] = &['l', 's', 'f', 'z'];

/// The text heuristics consumed by structuring and synchronization.
pub trait TextHeuristics: Send + Sync {
    /// Whether `word` reads as a quantity ("2", "1/2", "½").
    fn is_quantity(&self, word: &str) -> bool;

    /// Whether `word` is a recognisable preparation verb ("chopped").
    fn is_action_word(&self, word: &str) -> bool;

    /// Base form of a cooking verb, lowercased ("diced" -> "dice").
    fn present_tense(&self, verb: &str) -> String;

    /// The first timing phrase in `text` ("10 minutes"), if any.
    fn detect_timing(&self, text: &str) -> Option<String>;

    /// Seconds for a timing phrase; ranges use their lower bound.
    fn timing_to_seconds(&self, timing: &str) -> Option<u64>;

    /// Whether `content` already states an amount in front of `name`.
    fn has_amount_for(&self, content: &str, name: &str) -> bool;

    /// Byte range of the first case-insensitive whole-word mention of `reference`.
    fn find_mention(&self, content: &str, reference: &str) -> Option<Range<usize>>;
}

/// Regex and lookup-table heuristics tuned for recipe text.
#[derive(Debug, Clone, Copy, Default)]
pub struct CookingHeuristics;

impl TextHeuristics for CookingHeuristics {
    fn is_quantity(&self, word: &str) -> bool {
        QUANTITY_WORD.is_match(word.trim())
    }

    fn is_action_word(&self, word: &str) -> bool {
        let lower = trim_punctuation(word).to_lowercase();
        VERB_FORMS.iter().any(|(form, _)| *form == lower)
    }

    fn present_tense(&self, verb: &str) -> String {
        let lower = verb.trim().to_lowercase();
        if let Some((_, base)) = VERB_FORMS.iter().find(|(form, _)| *form == lower) {
            return base.to_string();
        }
        if let Some(stem) = lower.strip_suffix("ied") {
            if !stem.is_empty() {
                return format!("{}y", stem);
            }
        }
        if let Some(stem) = lower.strip_suffix("ed") {
            if stem.chars().count() >= 2 {
                return undouble(stem);
            }
        }
        lower
    }

    fn detect_timing(&self, text: &str) -> Option<String> {
        TIMING_PHRASE
            .find(text)
            .map(|m| m.as_str().trim().to_string())
    }

    fn timing_to_seconds(&self, timing: &str) -> Option<u64> {
        let caps = TIMING_PHRASE.captures(timing)?;
        let amount: u64 = caps.get(1)?.as_str().parse().ok()?;
        let unit = caps.get(3)?.as_str().to_lowercase();
        let factor = if unit.starts_with('h') {
            3600
        } else if unit.starts_with('m') {
            60
        } else {
            1
        };
        amount.checked_mul(factor)
    }

    fn has_amount_for(&self, content: &str, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let pattern = format!(
            r"(?i)\b\d+(?:[./]\d+)?\s+(?:\S+\s+){{0,3}}?{}\b",
            escape_words(name)
        );
        Regex::new(&pattern)
            .map(|re| re.is_match(content))
            .unwrap_or(false)
    }

    fn find_mention(&self, content: &str, reference: &str) -> Option<Range<usize>> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        let starts_word = reference.chars().next().is_some_and(is_word_char);
        let ends_word = reference.chars().last().is_some_and(is_word_char);
        let pattern = format!(
            "(?i){}{}{}",
            if starts_word { r"\b" } else { "" },
            escape_words(reference),
            if ends_word { r"\b" } else { "" },
        );
        let re = Regex::new(&pattern).ok()?;
        re.find(content).map(|m| m.range())
    }
}

/// Uppercases the first character ("dice" -> "Dice").
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn undouble(stem: &str) -> String {
    let chars: Vec<char> = stem.chars().collect();
    let n = chars.len();
    if n >= 3 {
        let last = chars[n - 1];
        if last == chars[n - 2] && !"aeiou".contains(last) && !KEPT_DOUBLES.contains(&last) {
            return chars[..n - 1].iter().collect();
        }
    }
    stem.to_string()
}

/// Escapes `text` for a regex, letting any run of whitespace match any other.
fn escape_words(text: &str) -> String {
    text.split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+")
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn trim_punctuation(word: &str) -> &str {
    word.trim_matches(|c: char| !c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_tense_lookup_and_rules() {
        let h = CookingHeuristics;
        assert_eq!(h.present_tense("Diced"), "dice");
        assert_eq!(h.present_tense("chopping"), "chop");
        assert_eq!(h.present_tense("stirred"), "stir");
        assert_eq!(h.present_tense("filled"), "fill");
        assert_eq!(h.present_tense("dried"), "dry");
        assert_eq!(h.present_tense("washed"), "wash");
        assert_eq!(h.present_tense("stir"), "stir");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("dice"), "Dice");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_quantity_words() {
        let h = CookingHeuristics;
        assert!(h.is_quantity("2"));
        assert!(h.is_quantity("1/2"));
        assert!(h.is_quantity("0.75"));
        assert!(h.is_quantity("½"));
        assert!(!h.is_quantity("cups"));
    }

    #[test]
    fn test_timing_detection() {
        let h = CookingHeuristics;
        assert_eq!(
            h.detect_timing("Simmer for 10-15 minutes until thick"),
            Some("10-15 minutes".to_string())
        );
        assert_eq!(h.timing_to_seconds("10-15 minutes"), Some(600));
        assert_eq!(h.timing_to_seconds("2 hours"), Some(7200));
        assert_eq!(h.timing_to_seconds("30 secs"), Some(30));
        assert_eq!(h.timing_to_seconds("9999999999999999999 hours"), None);
        assert_eq!(h.detect_timing("Season to taste"), None);
    }

    #[test]
    fn test_amount_detection() {
        let h = CookingHeuristics;
        assert!(h.has_amount_for("Add 2 cups olive oil to the pan", "olive oil"));
        assert!(h.has_amount_for("Add 2 cups of good olive oil", "olive oil"));
        assert!(!h.has_amount_for("Add the olive oil", "olive oil"));
        assert!(!h.has_amount_for("Add the olive oil", ""));
    }

    #[test]
    fn test_find_mention_is_whole_word() {
        let h = CookingHeuristics;
        assert_eq!(h.find_mention("Add the Oil and oilcloth", "oil"), Some(8..11));
        assert_eq!(h.find_mention("Add the oilcloth", "oil"), None);
        assert_eq!(h.find_mention("anything", "  "), None);
    }
}
