//! crates/sous_core/src/sync.rs
//!
//! Keeps step text in line with edited ingredients: the first step that
//! mentions an ingredient gets its full amount ("2 cups olive oil"), later
//! steps only its name.

use crate::domain::{Ingredient, RecipeIngredient, RecipeStep, StepIngredientRef};
use crate::heuristics::TextHeuristics;
use std::collections::{HashMap, HashSet};

/// Lowercases and collapses whitespace.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Finds the current ingredient a step reference points at.
///
/// An exact id wins; otherwise the reference text is compared against every
/// candidate's name, then display text, then original text.
pub fn resolve_reference<'a>(
    reference: &StepIngredientRef,
    ingredients: &'a [RecipeIngredient],
) -> Option<&'a RecipeIngredient> {
    if let Some(found) = ingredients.iter().find(|i| i.id == reference.ingredient_id) {
        return Some(found);
    }
    let wanted = normalize(&reference.display_text);
    if wanted.is_empty() {
        return None;
    }
    ingredients
        .iter()
        .find(|i| i.ingredient.name().is_some_and(|n| normalize(n) == wanted))
        .or_else(|| {
            ingredients
                .iter()
                .find(|i| normalize(&i.display_text) == wanted)
        })
        .or_else(|| {
            ingredients
                .iter()
                .find(|i| normalize(i.ingredient.original_text()) == wanted)
        })
}

/// The key first mentions are tracked under.
fn mention_key(ingredient: &RecipeIngredient) -> String {
    match ingredient.ingredient.name() {
        Some(name) => normalize(name),
        None => normalize(ingredient.display_or_fallback()),
    }
}

/// Rewrites one mention of `ingredient` inside `content`.
fn rewrite_mention(
    content: &str,
    reference: &StepIngredientRef,
    ingredient: &RecipeIngredient,
    first_mention: bool,
    heuristics: &dyn TextHeuristics,
) -> String {
    let (full, short) = match &ingredient.ingredient {
        Ingredient::Structured(s) if s.is_low_confidence() => return content.to_string(),
        Ingredient::Structured(s) => (
            s.full_specification(),
            s.ingredient_name.trim().to_string(),
        ),
        Ingredient::Unstructured(_) => {
            let display = ingredient.display_or_fallback().to_string();
            (display.clone(), display)
        }
    };

    if content.to_lowercase().contains(&full.to_lowercase())
        || heuristics.has_amount_for(content, &short)
    {
        return content.to_string();
    }
    if !first_mention && heuristics.find_mention(content, &short).is_some() {
        return content.to_string();
    }

    let replacement = if first_mention { full } else { short };
    match heuristics.find_mention(content, &reference.display_text) {
        Some(range) => {
            let mut rewritten = String::with_capacity(content.len() + replacement.len());
            rewritten.push_str(&content[..range.start]);
            rewritten.push_str(&replacement);
            rewritten.push_str(&content[range.end..]);
            rewritten
        }
        None => content.to_string(),
    }
}

/// Re-synchronizes every step's text against the current ingredient list.
///
/// Rewriting starts from `original_content[step.id]` when present, so running
/// this again with the same ingredients yields the same steps. Steps missing
/// from the map are rewritten from their current content.
pub fn resync(
    steps: &[RecipeStep],
    ingredients: &[RecipeIngredient],
    original_content: &HashMap<String, String>,
    heuristics: &dyn TextHeuristics,
) -> Vec<RecipeStep> {
    let mut mentioned: HashSet<String> = HashSet::new();

    steps
        .iter()
        .map(|step| {
            let mut content = original_content
                .get(&step.id)
                .cloned()
                .unwrap_or_else(|| step.content.clone());
            let mut references = Vec::with_capacity(step.ingredients.len());

            for reference in &step.ingredients {
                let Some(ingredient) = resolve_reference(reference, ingredients) else {
                    references.push(reference.clone());
                    continue;
                };
                let first_mention = mentioned.insert(mention_key(ingredient));
                content = rewrite_mention(
                    &content,
                    reference,
                    ingredient,
                    first_mention,
                    heuristics,
                );
                references.push(StepIngredientRef {
                    ingredient_id: ingredient.id.clone(),
                    display_text: reference.display_text.clone(),
                    is_first_mention: first_mention,
                });
            }

            RecipeStep {
                id: step.id.clone(),
                content,
                ingredients: references,
                timing: step.timing.clone(),
            }
        })
        .collect()
}

/// Snapshot of step contents keyed by step id, taken before any sync pass.
pub fn original_content_map(steps: &[RecipeStep]) -> HashMap<String, String> {
    steps
        .iter()
        .map(|s| (s.id.clone(), s.content.clone()))
        .collect()
}
