//! Category mapping for imported category text

use super::record::DEFAULT_CATEGORY;

/// Known top-level categories, in match priority order
pub const CATEGORIES: &[&str] = &[
    "Food",
    "Transportation",
    "Entertainment",
    "Housing",
    "Utilities",
    "Healthcare",
    "Shopping",
    "Other",
];

const SUBCATEGORIES: &[(&str, &[&str])] = &[
    ("Food", &["Groceries", "Restaurant", "Fast Food", "Coffee"]),
    ("Transportation", &["Fuel", "Public Transit", "Taxi", "Car Maintenance"]),
];

/// Result of mapping free text onto the category list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMatch {
    pub category: String,
    /// "Category: Subcategory" detail, when one was recognized or preserved
    pub detail: Option<String>,
}

impl CategoryMatch {
    fn plain(category: &str) -> Self {
        Self {
            category: category.to_string(),
            detail: None,
        }
    }

    pub fn details(&self) -> Option<Vec<String>> {
        self.detail.as_ref().map(|d| vec![d.clone()])
    }
}

/// Map raw category text to a known category
///
/// Accepts plain text ("groceries at REWE"), category names ("Food") and
/// array-like cells exported by other tools (`['Food: Groceries']`).
/// Unknown non-empty text maps to Other and keeps the text as detail.
pub fn map_category(text: &str) -> CategoryMatch {
    let text = text.trim();
    if text.is_empty() {
        return CategoryMatch::plain(DEFAULT_CATEGORY);
    }

    if let Some(found) = parse_array_cell(text) {
        return found;
    }

    let lower = text.to_lowercase();
    for category in CATEGORIES {
        if lower.contains(&category.to_lowercase()) {
            return CategoryMatch::plain(category);
        }

        let subcategories = SUBCATEGORIES
            .iter()
            .find(|(parent, _)| parent == category)
            .map(|(_, subs)| *subs)
            .unwrap_or(&[]);

        for sub in subcategories {
            if lower.contains(&sub.to_lowercase()) {
                return CategoryMatch {
                    category: category.to_string(),
                    detail: Some(format!("{}: {}", category, sub)),
                };
            }
        }
    }

    CategoryMatch {
        category: DEFAULT_CATEGORY.to_string(),
        detail: Some(format!("{}: {}", DEFAULT_CATEGORY, text)),
    }
}

fn parse_array_cell(text: &str) -> Option<CategoryMatch> {
    if !(text.starts_with('[') && text.ends_with(']')) {
        return None;
    }
    let items: Vec<String> = serde_json::from_str(&text.replace('\'', "\"")).ok()?;
    let first = items.into_iter().next()?;
    let category = first.split(':').next().unwrap_or("").trim();
    let category = if category.is_empty() { DEFAULT_CATEGORY } else { category };
    Some(CategoryMatch {
        category: category.to_string(),
        detail: Some(first.clone()),
    })
}
