/// Keyword-rule classifier for search phrases.
///
/// Rule groups are evaluated in declaration order and the first group with a
/// keyword contained in the phrase decides the category. The phrase is padded
/// with a space on each side before matching, so a keyword written with
/// surrounding spaces (" или ") only matches a whole word. Reordering the table
/// changes results: "цена ремонта под ключ" is Price only because the price
/// group comes before the commercial one.
use crate::model::Category;

/// One ordered entry of a rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleGroup {
    pub category: Category,
    /// Lower-case substrings of the space-padded phrase; any hit selects `category`.
    pub keywords: &'static [&'static str],
}

pub const PRICE_KEYWORDS: &[&str] = &[
    "цена", "цены", "стоимость", "стоит", "сколько", "прайс", "расценк", "недорог", "дешев",
];

pub const COMMERCIAL_KEYWORDS: &[&str] = &[
    "купить", "заказать", "заказ", "услуг", "под ключ", "доставк", "магазин", "нанять",
    "вызвать", "компани", "фирм", "мастер",
];

pub const INFORMATIONAL_KEYWORDS: &[&str] = &[
    " как ", "что такое", "своими руками", "почему", "зачем", "инструкци", " совет ", " советы ",
    " советов ", "этапы", "пошагов", "руководств",
];

pub const COMPARISON_KEYWORDS: &[&str] = &[
    " или ", " vs ", "сравнен", "лучше", "какой выбрать", "какую выбрать", "отзыв", "рейтинг",
    "разница", "отличи",
];

/// Default table: price, commercial, informational, comparison.
pub const DEFAULT_RULES: &[RuleGroup] = &[
    RuleGroup {
        category: Category::Price,
        keywords: PRICE_KEYWORDS,
    },
    RuleGroup {
        category: Category::Commercial,
        keywords: COMMERCIAL_KEYWORDS,
    },
    RuleGroup {
        category: Category::Informational,
        keywords: INFORMATIONAL_KEYWORDS,
    },
    RuleGroup {
        category: Category::Comparison,
        keywords: COMPARISON_KEYWORDS,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    /// Phrase mentions the configured city. Always false for informational phrases.
    pub local: bool,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<RuleGroup>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_RULES)
    }
}

impl Classifier {
    pub fn new(rules: &[RuleGroup]) -> Self {
        Self {
            rules: rules.to_vec(),
        }
    }

    pub fn classify(&self, phrase: &str, city: &str) -> Classification {
        let text = normalize(phrase);
        let padded = format!(" {text} ");

        let category = self
            .rules
            .iter()
            .find(|group| group.keywords.iter().any(|kw| padded.contains(kw)))
            .map(|group| group.category)
            .unwrap_or(Category::Other);

        let local = category != Category::Informational && mentions_city(&text, city);

        Classification { category, local }
    }
}

/// Dedup key for a phrase: trimmed, inner whitespace collapsed, lower-cased.
pub fn normalize(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn mentions_city(normalized_phrase: &str, city: &str) -> bool {
    let city = normalize(city);
    !city.is_empty() && normalized_phrase.contains(&city)
}
