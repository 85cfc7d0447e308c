use convert_case::{Case, Casing};

/// Maps `fields` keys onto association names and foreign keys.
///
/// The reducer never hard-codes a naming convention; it asks the resolver.
pub trait NameResolver: Send + Sync {
    /// Singular form of a (possibly plural) key: "orders" -> "order"
    fn singular(&self, key: &str) -> String;

    /// Does `key` name the has-many association called `association`?
    fn matches_has_many(&self, key: &str, association: &str) -> bool;

    /// Does `key` name the belongs-to association stored in `foreign_key`?
    fn matches_belongs_to(&self, key: &str, foreign_key: &str) -> bool;
}

/// Conventions used by camelCase JSON APIs over ORM-style schemas:
/// - `orders` or `lineItems` match associations named `orders` / `line_items`
/// - `user` or `users` match a belongs-to foreign key `userId`
/// - plural keys are singularised with common English rules
#[derive(Debug, Clone, Copy, Default)]
pub struct ConventionalNames;

const UNCOUNTABLE: &[&str] = &[
    "data",
    "equipment",
    "information",
    "metadata",
    "news",
    "series",
    "species",
];

const IRREGULAR: &[(&str, &str)] = &[
    ("people", "person"),
    ("children", "child"),
    ("men", "man"),
    ("women", "woman"),
    ("mice", "mouse"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("geese", "goose"),
];

impl ConventionalNames {
    fn singular_word(word: &str) -> String {
        let lower = word.to_ascii_lowercase();

        if UNCOUNTABLE.contains(&lower.as_str()) {
            return word.to_string();
        }

        if let Some((_, singular)) = IRREGULAR.iter().find(|(plural, _)| *plural == lower) {
            return match word.chars().next() {
                Some(first) if first.is_ascii_uppercase() => singular.to_case(Case::Pascal),
                _ => singular.to_string(),
            };
        }

        if lower.len() > 3 && lower.ends_with("ies") {
            return format!("{}y", &word[..word.len() - 3]);
        }
        if ["sses", "xes", "ches", "shes", "zzes"]
            .iter()
            .any(|suffix| lower.ends_with(suffix))
        {
            return word[..word.len() - 2].to_string();
        }
        if ["ss", "us", "is"].iter().any(|suffix| lower.ends_with(suffix)) {
            return word.to_string();
        }
        if lower.len() > 1 && lower.ends_with('s') {
            return word[..word.len() - 1].to_string();
        }
        word.to_string()
    }
}

impl NameResolver for ConventionalNames {
    fn singular(&self, key: &str) -> String {
        // only the last word of a compound name is inflected
        let split = key
            .char_indices()
            .filter(|(_, c)| c.is_ascii_uppercase() || *c == '_')
            .map(|(index, c)| if c == '_' { index + 1 } else { index })
            .last()
            .unwrap_or(0);
        let (head, last) = key.split_at(split);
        format!("{}{}", head, Self::singular_word(last))
    }

    fn matches_has_many(&self, key: &str, association: &str) -> bool {
        key == association || key == association.to_case(Case::Camel)
    }

    fn matches_belongs_to(&self, key: &str, foreign_key: &str) -> bool {
        foreign_key == format!("{}Id", key) || foreign_key == format!("{}Id", self.singular(key))
    }
}
