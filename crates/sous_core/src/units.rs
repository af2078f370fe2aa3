//! crates/sous_core/src/units.rs
//!
//! The table of known measurement units.

use crate::domain::Unit;

struct KnownUnit {
    value: &'static str,
    singular: &'static str,
    plural: &'static str,
    aliases: &'static [&'static str],
}

const KNOWN_UNITS: &[KnownUnit] = &[
    KnownUnit {
        value: "cup",
        singular: "cup",
        plural: "cups",
        aliases: &["c"],
    },
    KnownUnit {
        value: "tablespoon",
        singular: "tablespoon",
        plural: "tablespoons",
        aliases: &["tbsp", "tbsps", "tbs", "tbl"],
    },
    KnownUnit {
        value: "teaspoon",
        singular: "teaspoon",
        plural: "teaspoons",
        aliases: &["tsp", "tsps"],
    },
    KnownUnit {
        value: "ounce",
        singular: "ounce",
        plural: "ounces",
        aliases: &["oz"],
    },
    KnownUnit {
        value: "fluid_ounce",
        singular: "fluid ounce",
        plural: "fluid ounces",
        aliases: &["fl oz", "fl. oz."],
    },
    KnownUnit {
        value: "pound",
        singular: "pound",
        plural: "pounds",
        aliases: &["lb", "lbs"],
    },
    KnownUnit {
        value: "gram",
        singular: "gram",
        plural: "grams",
        aliases: &["g", "gr"],
    },
    KnownUnit {
        value: "kilogram",
        singular: "kilogram",
        plural: "kilograms",
        aliases: &["kg", "kgs"],
    },
    KnownUnit {
        value: "milliliter",
        singular: "milliliter",
        plural: "milliliters",
        aliases: &["ml", "millilitre", "millilitres"],
    },
    KnownUnit {
        value: "liter",
        singular: "liter",
        plural: "liters",
        aliases: &["l", "litre", "litres"],
    },
    KnownUnit {
        value: "pint",
        singular: "pint",
        plural: "pints",
        aliases: &["pt"],
    },
    KnownUnit {
        value: "quart",
        singular: "quart",
        plural: "quarts",
        aliases: &["qt"],
    },
    KnownUnit {
        value: "gallon",
        singular: "gallon",
        plural: "gallons",
        aliases: &["gal"],
    },
    KnownUnit {
        value: "pinch",
        singular: "pinch",
        plural: "pinches",
        aliases: &[],
    },
    KnownUnit {
        value: "dash",
        singular: "dash",
        plural: "dashes",
        aliases: &[],
    },
    KnownUnit {
        value: "clove",
        singular: "clove",
        plural: "cloves",
        aliases: &[],
    },
    KnownUnit {
        value: "can",
        singular: "can",
        plural: "cans",
        aliases: &[],
    },
    KnownUnit {
        value: "package",
        singular: "package",
        plural: "packages",
        aliases: &["pkg"],
    },
    KnownUnit {
        value: "stick",
        singular: "stick",
        plural: "sticks",
        aliases: &[],
    },
    KnownUnit {
        value: "slice",
        singular: "slice",
        plural: "slices",
        aliases: &[],
    },
    KnownUnit {
        value: "piece",
        singular: "piece",
        plural: "pieces",
        aliases: &["pc", "pcs"],
    },
    KnownUnit {
        value: "bunch",
        singular: "bunch",
        plural: "bunches",
        aliases: &[],
    },
    KnownUnit {
        value: "handful",
        singular: "handful",
        plural: "handfuls",
        aliases: &[],
    },
];

/// Looks `text` up by value, singular, plural or alias, ignoring case and a trailing dot.
pub fn find_unit(text: &str) -> Option<Unit> {
    let needle = text.trim().trim_end_matches('.').to_lowercase();
    if needle.is_empty() {
        return None;
    }
    KNOWN_UNITS
        .iter()
        .find(|u| {
            u.value == needle
                || u.singular == needle
                || u.plural == needle
                || u.aliases.iter().any(|a| a.trim_end_matches('.') == needle)
        })
        .map(|u| Unit {
            value: u.value.to_string(),
            display_name: u.singular.to_string(),
            plural_name: u.plural.to_string(),
        })
}

/// A known unit, or one synthesized with naive pluralization.
pub fn resolve_unit(text: &str) -> Option<Unit> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    find_unit(text).or_else(|| {
        let plural_name = if text.ends_with('s') {
            text.to_string()
        } else {
            format!("{}s", text)
        };
        Some(Unit {
            value: text.to_lowercase(),
            display_name: text.to_string(),
            plural_name,
        })
    })
}
