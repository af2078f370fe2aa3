//! crates/sous_core/src/domain.rs
//!
//! Defines the pure, core data structures for recipes, ingredients and the
//! manual-parsing training records. Session types live in `crate::session`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Literal used when an ingredient has neither display nor original text.
pub const FALLBACK_INGREDIENT_NAME: &str = "ingredient";

//=========================================================================================
// Recipes
//=========================================================================================

/// The slice of a recipe a cooking session needs to know about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeRef {
    pub id: String,
    pub title: String,
    pub step_count: usize,
}

/// A reference from a step's text to one of the recipe's ingredients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepIngredientRef {
    pub ingredient_id: String,
    /// The text the step originally used to mention the ingredient.
    pub display_text: String,
    #[serde(default)]
    pub is_first_mention: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeStep {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub ingredients: Vec<StepIngredientRef>,
    #[serde(default)]
    pub timing: Option<String>,
}

//=========================================================================================
// Ingredients
//=========================================================================================

/// A measurement unit with its singular and plural spellings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub value: String,
    pub display_name: String,
    pub plural_name: String,
}

impl Unit {
    /// Picks the spelling that agrees with `quantity`. A missing quantity reads as singular.
    pub fn name_for(&self, quantity: Option<f64>) -> &str {
        match quantity {
            Some(q) if (q - 1.0).abs() > f64::EPSILON => &self.plural_name,
            _ => &self.display_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preparation {
    pub name: String,
    /// True when the preparation is an action that deserves its own recipe step.
    pub requires_step: bool,
}

/// An ingredient line decomposed into quantity, unit, name and preparation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredIngredient {
    pub original_text: String,
    pub quantity: Option<f64>,
    pub unit: Option<Unit>,
    pub ingredient_name: String,
    pub preparation: Option<Preparation>,
}

impl StructuredIngredient {
    /// A record whose name came out empty cannot be trusted for text rewriting.
    pub fn is_low_confidence(&self) -> bool {
        self.ingredient_name.trim().is_empty()
    }

    /// "2 cups olive oil": quantity, agreeing unit and base name, skipping missing parts.
    pub fn full_specification(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(3);
        if let Some(quantity) = self.quantity {
            parts.push(format_quantity(quantity));
        }
        if let Some(unit) = &self.unit {
            parts.push(unit.name_for(self.quantity).to_string());
        }
        if !self.ingredient_name.trim().is_empty() {
            parts.push(self.ingredient_name.trim().to_string());
        }
        parts.join(" ")
    }
}

/// Either a parsed ingredient or the raw line the user typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Ingredient {
    Structured(StructuredIngredient),
    Unstructured(String),
}

impl Ingredient {
    pub fn original_text(&self) -> &str {
        match self {
            Ingredient::Structured(s) => &s.original_text,
            Ingredient::Unstructured(raw) => raw,
        }
    }

    /// The base name, when there is one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Ingredient::Structured(s) if !s.is_low_confidence() => Some(s.ingredient_name.trim()),
            _ => None,
        }
    }
}

/// An ingredient as held by the recipe editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeIngredient {
    pub id: String,
    #[serde(default)]
    pub display_text: String,
    pub ingredient: Ingredient,
}

impl RecipeIngredient {
    /// Display text, falling back to the original text and then to a generic name.
    pub fn display_or_fallback(&self) -> &str {
        let display = self.display_text.trim();
        if !display.is_empty() {
            return display;
        }
        let original = self.ingredient.original_text().trim();
        if !original.is_empty() {
            return original;
        }
        FALLBACK_INGREDIENT_NAME
    }
}

/// Renders a quantity without a trailing ".0" and with at most two decimals.
pub fn format_quantity(quantity: f64) -> String {
    if quantity.fract() == 0.0 {
        return format!("{}", quantity as i64);
    }
    let text = format!("{:.2}", quantity);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

//=========================================================================================
// Manual parsing (training records)
//=========================================================================================

/// The role a token plays in an ingredient line.
///
/// Reading is case-insensitive and treats an empty string as unassigned, so
/// labels written by older clients ("Quantity", "") still load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum TokenType {
    Quantity,
    Unit,
    Ingredient,
    Description,
    Action,
    #[default]
    Unassigned,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenType::Quantity => "quantity",
            TokenType::Unit => "unit",
            TokenType::Ingredient => "ingredient",
            TokenType::Description => "description",
            TokenType::Action => "action",
            TokenType::Unassigned => "unassigned",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown token type '{0}'")]
pub struct ParseError(pub String);

impl FromStr for TokenType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quantity" => Ok(TokenType::Quantity),
            "unit" => Ok(TokenType::Unit),
            "ingredient" => Ok(TokenType::Ingredient),
            "description" => Ok(TokenType::Description),
            "action" => Ok(TokenType::Action),
            "unassigned" | "" => Ok(TokenType::Unassigned),
            other => Err(ParseError(other.to_string())),
        }
    }
}

impl TryFrom<String> for TokenType {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    #[serde(rename = "type", default)]
    pub token_type: TokenType,
}

impl Token {
    pub fn new(text: impl Into<String>, token_type: TokenType) -> Self {
        Self {
            text: text.into(),
            token_type,
        }
    }
}

/// A user's token assignment together with everything derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualParsing {
    pub quantity: String,
    pub unit: String,
    pub ingredient: String,
    pub description: String,
    pub action: String,
    pub parts: Vec<Token>,
    pub structured: StructuredIngredient,
}

/// One stored training record. Immutable once saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualParsingExample {
    pub id: String,
    pub original_text: String,
    pub manual_parsing: ManualParsing,
    pub timestamp: DateTime<Utc>,
}

/// What the user agreed to have recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataCollectionPreferences {
    #[serde(default = "enabled")]
    pub manual_parsing_enabled: bool,
    #[serde(default = "enabled")]
    pub session_history_enabled: bool,
}

fn enabled() -> bool {
    true
}

impl Default for DataCollectionPreferences {
    fn default() -> Self {
        Self {
            manual_parsing_enabled: true,
            session_history_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cup() -> Unit {
        Unit {
            value: "cup".to_string(),
            display_name: "cup".to_string(),
            plural_name: "cups".to_string(),
        }
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(2.0), "2");
        assert_eq!(format_quantity(0.5), "0.5");
        assert_eq!(format_quantity(1.25), "1.25");
        assert_eq!(format_quantity(1.0 / 3.0), "0.33");
    }

    #[test]
    fn test_full_specification_pluralizes_unit() {
        let two = StructuredIngredient {
            original_text: "2 cups olive oil".to_string(),
            quantity: Some(2.0),
            unit: Some(cup()),
            ingredient_name: "olive oil".to_string(),
            preparation: None,
        };
        assert_eq!(two.full_specification(), "2 cups olive oil");

        let one = StructuredIngredient {
            quantity: Some(1.0),
            ..two.clone()
        };
        assert_eq!(one.full_specification(), "1 cup olive oil");

        let bare = StructuredIngredient {
            quantity: None,
            unit: None,
            ..two
        };
        assert_eq!(bare.full_specification(), "olive oil");
    }

    #[test]
    fn test_display_fallbacks() {
        let ingredient = RecipeIngredient {
            id: "i1".to_string(),
            display_text: "  ".to_string(),
            ingredient: Ingredient::Unstructured("a pinch of salt".to_string()),
        };
        assert_eq!(ingredient.display_or_fallback(), "a pinch of salt");

        let empty = RecipeIngredient {
            id: "i2".to_string(),
            display_text: String::new(),
            ingredient: Ingredient::Unstructured(String::new()),
        };
        assert_eq!(empty.display_or_fallback(), FALLBACK_INGREDIENT_NAME);
    }

    #[test]
    fn test_token_type_serialization() {
        let token = Token::new("cups", TokenType::Unit);
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, r#"{"text":"cups","type":"unit"}"#);

        let missing_type: Token = serde_json::from_str(r#"{"text":"salt"}"#).unwrap();
        assert_eq!(missing_type.token_type, TokenType::Unassigned);
    }

    #[test]
    fn test_ingredient_is_tagged() {
        let json = serde_json::to_value(Ingredient::Unstructured("salt".to_string())).unwrap();
        assert_eq!(json["kind"], "unstructured");
        assert_eq!(json["value"], "salt");
    }

    #[test]
    fn test_token_type_from_str() {
        assert_eq!("Unit".parse::<TokenType>(), Ok(TokenType::Unit));
        assert_eq!("".parse::<TokenType>(), Ok(TokenType::Unassigned));
        assert!("garnish".parse::<TokenType>().is_err());
    }

    #[test]
    fn test_token_type_reads_loosely() {
        let token: Token = serde_json::from_str(r#"{"text":"2","type":"Quantity"}"#).unwrap();
        assert_eq!(token.token_type, TokenType::Quantity);

        let blank: Token = serde_json::from_str(r#"{"text":"fresh","type":""}"#).unwrap();
        assert_eq!(blank.token_type, TokenType::Unassigned);

        let err = serde_json::from_str::<Token>(r#"{"text":"x","type":"garnish"}"#).unwrap_err();
        assert!(err.to_string().contains("unknown token type 'garnish'"));
    }
}
