//! Class label interpretation
//!
//! Detector class names combine a fruit and a ripeness keyword
//! ("Banana Ripe", "mango_overripe", "Fresh Banana"). Quality status and
//! ripeness are read from the keyword; the fruit type is what remains.

use fqs_common::models::{QualityStatus, Ripeness};

/// Ripeness keywords removable from a class name, single words
const KEYWORDS: &[&str] = &[
    "overripe",
    "over-ripe",
    "half-ripe",
    "underripe",
    "unripe",
    "ripe",
    "rotten",
    "fresh",
];

/// Map a class label to its quality status and ripeness
///
/// Keywords are checked in a fixed order so that "unripe" and "overripe"
/// are not mistaken for "ripe".
pub fn parse_label(class_name: &str) -> (QualityStatus, Ripeness) {
    let lower = class_name.to_lowercase();

    if lower.contains("unripe") {
        (QualityStatus::Unripe, Ripeness::Unripe)
    } else if lower.contains("overripe") || lower.contains("over-ripe") {
        (QualityStatus::Overripe, Ripeness::Overripe)
    } else if lower.contains("half-ripe") || lower.contains("half ripe") {
        (QualityStatus::Ripe, Ripeness::HalfRipe)
    } else if lower.contains("ripe") {
        (QualityStatus::Ripe, Ripeness::Ripe)
    } else if lower.contains("rotten") {
        (QualityStatus::Rotten, Ripeness::Overripe)
    } else if lower.contains("fresh") {
        (QualityStatus::Fresh, Ripeness::Ripe)
    } else {
        (QualityStatus::Unknown, Ripeness::Unknown)
    }
}

fn is_keyword(word: &str) -> bool {
    let lower = word.to_lowercase();
    KEYWORDS.contains(&lower.as_str())
}

fn is_half_ripe(first: &str, second: &str) -> bool {
    first.eq_ignore_ascii_case("half") && second.eq_ignore_ascii_case("ripe")
}

/// Fruit name with the ripeness keyword stripped
///
/// A trailing keyword wins over a leading one; single-word names are
/// returned unchanged. Underscores count as word separators.
pub fn fruit_type(class_name: &str) -> String {
    let words: Vec<&str> = class_name
        .split(|c: char| c.is_whitespace() || c == '_')
        .filter(|w| !w.is_empty())
        .collect();

    let n = words.len();
    if n <= 1 {
        return class_name.trim().to_string();
    }

    let kept: &[&str] = if n > 2 && is_half_ripe(words[n - 2], words[n - 1]) {
        &words[..n - 2]
    } else if is_keyword(words[n - 1]) && !(n == 2 && is_half_ripe(words[0], words[1])) {
        &words[..n - 1]
    } else if n > 2 && is_half_ripe(words[0], words[1]) {
        &words[2..]
    } else if is_keyword(words[0]) {
        &words[1..]
    } else {
        return class_name.trim().to_string();
    };

    kept.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label_keyword_order() {
        assert_eq!(parse_label("Banana Unripe"), (QualityStatus::Unripe, Ripeness::Unripe));
        assert_eq!(parse_label("Mango Overripe"), (QualityStatus::Overripe, Ripeness::Overripe));
        assert_eq!(parse_label("mango over-ripe"), (QualityStatus::Overripe, Ripeness::Overripe));
        assert_eq!(parse_label("Cacao Half-Ripe"), (QualityStatus::Ripe, Ripeness::HalfRipe));
        assert_eq!(parse_label("cacao half ripe"), (QualityStatus::Ripe, Ripeness::HalfRipe));
        assert_eq!(parse_label("Pineapple Ripe"), (QualityStatus::Ripe, Ripeness::Ripe));
        assert_eq!(parse_label("Rotten Apple"), (QualityStatus::Rotten, Ripeness::Overripe));
        assert_eq!(parse_label("Fresh Banana"), (QualityStatus::Fresh, Ripeness::Ripe));
        assert_eq!(parse_label("Class_42"), (QualityStatus::Unknown, Ripeness::Unknown));
    }

    #[test]
    fn test_fruit_type_trailing_keyword() {
        assert_eq!(fruit_type("Banana Ripe"), "Banana");
        assert_eq!(fruit_type("Cashew Overripe"), "Cashew");
        assert_eq!(fruit_type("mango_unripe"), "mango");
        assert_eq!(fruit_type("Cacao Half Ripe"), "Cacao");
        assert_eq!(fruit_type("Dragon Fruit Ripe"), "Dragon Fruit");
    }

    #[test]
    fn test_fruit_type_leading_keyword() {
        assert_eq!(fruit_type("Fresh Banana"), "Banana");
        assert_eq!(fruit_type("Rotten Apple"), "Apple");
        assert_eq!(fruit_type("Half Ripe Mango"), "Mango");
    }

    #[test]
    fn test_fruit_type_without_keyword() {
        assert_eq!(fruit_type("Banana"), "Banana");
        assert_eq!(fruit_type("Ripe"), "Ripe");
        assert_eq!(fruit_type("Passion Fruit"), "Passion Fruit");
        assert_eq!(fruit_type("Half Ripe"), "Half Ripe");
        assert_eq!(fruit_type("Class_42"), "Class_42");
    }
}
