//! crates/sous_core/src/parsing.rs
//!
//! Turns a raw ingredient line into typed tokens and typed tokens into a
//! `StructuredIngredient`. Both the interactive manual-parsing flow and the
//! training-data import go through `ManualParsing::from_tokens`, so the same
//! token assignment always structures the same way.

use crate::domain::{
    ManualParsing, Preparation, RecipeStep, StepIngredientRef, StructuredIngredient, Token,
    TokenType, FALLBACK_INGREDIENT_NAME,
};
use crate::heuristics::{capitalize, TextHeuristics};
use crate::session::timer::MAX_TIMER_SECS;
use crate::units::{find_unit, resolve_unit};
use regex::Regex;
use std::sync::LazyLock;

static FIRST_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());

static FRACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(\d+)\s+)?(\d+)/(\d+)").unwrap());

//=========================================================================================
// Segmentation
//=========================================================================================

/// Splits a line on whitespace into unassigned tokens. Separating commas are dropped.
pub fn segment(raw: &str) -> Vec<Token> {
    raw.split_whitespace()
        .map(|word| word.trim_end_matches(','))
        .filter(|word| !word.is_empty())
        .map(|word| Token::new(word, TokenType::Unassigned))
        .collect()
}

/// Segments `raw` and guesses a type for every token.
///
/// Leading numbers are quantities, a known unit right after them is the unit,
/// anything after the first comma is description (or action when it is a known
/// preparation verb), and the rest is the ingredient name.
pub fn auto_assign(raw: &str, heuristics: &dyn TextHeuristics) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut after_comma = false;
    let mut in_name = false;
    let mut unit_seen = false;

    for word in raw.split_whitespace() {
        let ends_clause = word.ends_with(',');
        let text = word.trim_end_matches(',');
        if text.is_empty() {
            after_comma |= ends_clause;
            continue;
        }

        let token_type = if after_comma {
            if heuristics.is_action_word(text) {
                TokenType::Action
            } else {
                TokenType::Description
            }
        } else if !in_name && !unit_seen && heuristics.is_quantity(text) {
            TokenType::Quantity
        } else if !in_name && !unit_seen && find_unit(text).is_some() {
            unit_seen = true;
            TokenType::Unit
        } else if !in_name && heuristics.is_action_word(text) {
            TokenType::Action
        } else {
            in_name = true;
            TokenType::Ingredient
        };

        tokens.push(Token::new(text, token_type));
        after_comma |= ends_clause;
    }
    tokens
}

/// Keeps every human-assigned type and fills the unassigned ones from `auto_assign`.
pub fn fill_unassigned(tokens: &[Token], heuristics: &dyn TextHeuristics) -> Vec<Token> {
    let line = tokens
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let guesses = auto_assign(&line, heuristics);
    tokens
        .iter()
        .enumerate()
        .map(|(i, token)| match token.token_type {
            TokenType::Unassigned => Token::new(
                token.text.clone(),
                guesses
                    .get(i)
                    .filter(|g| g.text == token.text)
                    .map(|g| g.token_type)
                    .unwrap_or(TokenType::Ingredient),
            ),
            _ => token.clone(),
        })
        .collect()
}

//=========================================================================================
// Structuring
//=========================================================================================

/// Space-joins the texts of every token of `token_type`, in original order.
fn join_type(tokens: &[Token], token_type: TokenType) -> String {
    tokens
        .iter()
        .filter(|t| t.token_type == token_type)
        .map(|t| t.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reads a quantity: mixed numbers and fractions ("1 1/2", "1/2"), vulgar
/// fractions ("½"), otherwise the first numeric substring.
pub fn parse_quantity(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Some(caps) = FRACTION.captures(text) {
        let whole: f64 = caps
            .get(1)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0.0);
        let numerator: f64 = caps[2].parse().ok()?;
        let denominator: f64 = caps[3].parse().ok()?;
        if denominator != 0.0 {
            return Some(whole + numerator / denominator);
        }
    }
    let vulgar = text.chars().find_map(vulgar_fraction);
    let leading = FIRST_NUMBER
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok());
    match (leading, vulgar) {
        (Some(whole), Some(fraction)) => Some(whole + fraction),
        (Some(number), None) => Some(number),
        (None, fraction) => fraction,
    }
}

fn vulgar_fraction(c: char) -> Option<f64> {
    match c {
        '½' => Some(0.5),
        '⅓' => Some(1.0 / 3.0),
        '⅔' => Some(2.0 / 3.0),
        '¼' => Some(0.25),
        '¾' => Some(0.75),
        '⅛' => Some(0.125),
        _ => None,
    }
}

/// Builds the structured record for `original_text` from a typed token list.
pub fn structure(original_text: &str, tokens: &[Token]) -> StructuredIngredient {
    ManualParsing::from_tokens(original_text, tokens).structured
}

impl ManualParsing {
    /// Derives every field of a manual parsing from its token assignment.
    pub fn from_tokens(original_text: &str, tokens: &[Token]) -> Self {
        let quantity = join_type(tokens, TokenType::Quantity);
        let unit = join_type(tokens, TokenType::Unit);
        let ingredient = join_type(tokens, TokenType::Ingredient);
        let description = join_type(tokens, TokenType::Description);
        let action = join_type(tokens, TokenType::Action);

        let preparation = if !action.is_empty() {
            Some(Preparation {
                name: action.clone(),
                requires_step: true,
            })
        } else if !description.is_empty() {
            Some(Preparation {
                name: description.clone(),
                requires_step: false,
            })
        } else {
            None
        };

        let structured = StructuredIngredient {
            original_text: original_text.to_string(),
            quantity: parse_quantity(&quantity),
            unit: resolve_unit(&unit),
            ingredient_name: ingredient.clone(),
            preparation,
        };

        Self {
            quantity,
            unit,
            ingredient,
            description,
            action,
            parts: tokens.to_vec(),
            structured,
        }
    }

    /// Display text for the ingredient: its own original text or a generic name.
    pub fn display_text(&self) -> String {
        let original = self.structured.original_text.trim();
        if !original.is_empty() {
            original.to_string()
        } else if !self.ingredient.is_empty() {
            self.ingredient.clone()
        } else {
            FALLBACK_INGREDIENT_NAME.to_string()
        }
    }

    /// Seeds a recipe step from the parsing's action ("diced" -> "Dice the onion").
    ///
    /// Returns `None` when no action was assigned.
    pub fn seed_step(
        &self,
        step_id: impl Into<String>,
        ingredient_id: impl Into<String>,
        heuristics: &dyn TextHeuristics,
    ) -> Option<RecipeStep> {
        let action = self.action.trim();
        if action.is_empty() {
            return None;
        }
        let verb = action
            .split_whitespace()
            .map(|word| heuristics.present_tense(word))
            .collect::<Vec<_>>()
            .join(" ");
        let name = if self.ingredient.trim().is_empty() {
            FALLBACK_INGREDIENT_NAME.to_string()
        } else {
            self.ingredient.trim().to_string()
        };
        let timing = heuristics
            .detect_timing(&self.description)
            .or_else(|| heuristics.detect_timing(action));

        Some(RecipeStep {
            id: step_id.into(),
            content: format!("{} the {}", capitalize(&verb), name),
            ingredients: vec![StepIngredientRef {
                ingredient_id: ingredient_id.into(),
                display_text: name,
                is_first_mention: true,
            }],
            timing,
        })
    }
}

/// Timer length suggested by a step's timing phrase. The lower bound of a
/// range is used; lengths a step timer would refuse give `None`.
pub fn step_timer_secs(step: &RecipeStep, heuristics: &dyn TextHeuristics) -> Option<u64> {
    let secs = heuristics.timing_to_seconds(step.timing.as_deref()?)?;
    (1..=MAX_TIMER_SECS).contains(&secs).then_some(secs)
}
