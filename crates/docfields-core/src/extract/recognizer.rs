//! Named-entity recogniser seam and label mapping.

use crate::error::NerError;

use super::EntityKind;

/// A span labelled by a recogniser, with byte offsets into the input.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSpan {
    pub label: String,
    pub start: usize,
    pub end: usize,
}

/// A trained named-entity recogniser.
pub trait EntityRecognizer: Send + Sync {
    fn name(&self) -> &str;

    /// Label spans in `text`.
    fn recognize(&self, text: &str) -> Result<Vec<LabeledSpan>, NerError>;
}

/// Map a model label onto an entity kind; unmapped labels yield `None`.
///
/// BIO/BIOES prefixes (`B-`, `I-`, `E-`, `S-`, `L-`, `U-`) are ignored.
pub fn kind_for_label(label: &str) -> Option<EntityKind> {
    let bare = match label.split_once('-') {
        Some((prefix, rest)) if matches!(prefix, "B" | "I" | "E" | "S" | "L" | "U") => rest,
        _ => label,
    };

    match bare.to_ascii_uppercase().as_str() {
        "DATE" | "TIME" => Some(EntityKind::Date),
        "MONEY" | "AMOUNT" => Some(EntityKind::Amount),
        "PHONE" | "TEL" => Some(EntityKind::Phone),
        "EMAIL" => Some(EntityKind::Email),
        "ID" | "ID_CARD" | "INVOICE_NUMBER" => Some(EntityKind::Identifier),
        "ORG" | "ORGANIZATION" => Some(EntityKind::Organization),
        "PER" | "PERSON" => Some(EntityKind::Person),
        "LOC" | "GPE" | "LOCATION" => Some(EntityKind::Location),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_table() {
        assert_eq!(kind_for_label("DATE"), Some(EntityKind::Date));
        assert_eq!(kind_for_label("TIME"), Some(EntityKind::Date));
        assert_eq!(kind_for_label("B-MONEY"), Some(EntityKind::Amount));
        assert_eq!(kind_for_label("I-PER"), Some(EntityKind::Person));
        assert_eq!(kind_for_label("GPE"), Some(EntityKind::Location));
        assert_eq!(kind_for_label("org"), Some(EntityKind::Organization));
        assert_eq!(kind_for_label("ID_CARD"), Some(EntityKind::Identifier));
    }

    #[test]
    fn test_unmapped_labels_dropped() {
        assert_eq!(kind_for_label("O"), None);
        assert_eq!(kind_for_label("NORP"), None);
        assert_eq!(kind_for_label("B-MISC"), None);
        assert_eq!(kind_for_label(""), None);
    }
}
