//! Regex entity strategy.

use super::patterns::patterns_for;
use super::{Entity, EntityKind};
use crate::text::{parse_amount, parse_date};

/// Kinds the regex library can find.
const REGEX_KINDS: [EntityKind; 5] = [
    EntityKind::Date,
    EntityKind::Amount,
    EntityKind::Phone,
    EntityKind::Email,
    EntityKind::Identifier,
];

/// Find entities with the fixed pattern library.
///
/// Output is sorted by start offset; within a kind no two entities overlap.
pub fn find_entities(text: &str) -> Vec<Entity> {
    let mut entities = Vec::new();

    for kind in REGEX_KINDS {
        let mut spans = Vec::new();
        for re in patterns_for(kind) {
            for m in re.find_iter(text) {
                if kind != EntityKind::Email && !digit_bounded(text, m.start(), m.end()) {
                    continue;
                }
                if !is_valid(kind, m.as_str()) {
                    continue;
                }
                spans.push((m.start(), m.end()));
            }
        }
        entities.extend(
            resolve_overlaps(spans)
                .into_iter()
                .map(|(start, end)| Entity::new(kind, &text[start..end], start, end)),
        );
    }

    // "2024.01" inside "2024.01.15" is not an amount
    let dates: Vec<(usize, usize)> = entities
        .iter()
        .filter(|e| e.kind == EntityKind::Date)
        .map(|e| (e.start, e.end))
        .collect();
    entities.retain(|e| {
        e.kind != EntityKind::Amount || !dates.iter().any(|&(s, end)| e.start < end && s < e.end)
    });

    sort_entities(&mut entities);
    entities
}

/// Keep the longest span, then the earliest, dropping anything overlapping
/// an already kept span. Returned spans are in text order.
pub fn resolve_overlaps(mut spans: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    spans.sort_by(|a, b| (b.1 - b.0).cmp(&(a.1 - a.0)).then(a.0.cmp(&b.0)));

    let mut kept: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        if kept.iter().all(|&(s, e)| end <= s || e <= start) {
            kept.push((start, end));
        }
    }
    kept.sort();
    kept
}

/// Text order, then longer first, then kind.
pub fn sort_entities(entities: &mut [Entity]) {
    entities.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then(b.end.cmp(&a.end))
            .then(a.kind.cmp(&b.kind))
    });
}

fn is_valid(kind: EntityKind, text: &str) -> bool {
    match kind {
        EntityKind::Date => parse_date(text).is_some(),
        EntityKind::Amount => parse_amount(text).is_some(),
        _ => true,
    }
}

/// The match is not glued to more digits on either side.
fn digit_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(|c| c.is_ascii_digit()) && !after.is_some_and(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(entities: &[Entity], kind: EntityKind) -> Vec<&str> {
        entities
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.text.as_str())
            .collect()
    }

    #[test]
    fn test_sample_document() {
        let text = "发票号码：INV-2024-001\n日期：2024-01-15\n金额：￥1,234.56\n电话：13800138000\n邮箱：test@example.com";
        let entities = find_entities(text);

        assert_eq!(texts(&entities, EntityKind::Date), vec!["2024-01-15"]);
        assert_eq!(texts(&entities, EntityKind::Amount), vec!["￥1,234.56"]);
        assert_eq!(texts(&entities, EntityKind::Phone), vec!["13800138000"]);
        assert_eq!(texts(&entities, EntityKind::Email), vec!["test@example.com"]);
        assert_eq!(texts(&entities, EntityKind::Identifier), vec!["INV-2024-001"]);
    }

    #[test]
    fn test_overlap_prefers_longest_then_earliest() {
        assert_eq!(resolve_overlaps(vec![(5, 9), (3, 12), (10, 14)]), vec![(3, 12)]);
        assert_eq!(resolve_overlaps(vec![(4, 8), (2, 6), (10, 12)]), vec![(2, 6), (10, 12)]);
        assert_eq!(resolve_overlaps(vec![(0, 4), (0, 4)]), vec![(0, 4)]);
    }

    #[test]
    fn test_currency_amount_beats_plain_match() {
        let entities = find_entities("Total 1234.56元");
        assert_eq!(texts(&entities, EntityKind::Amount), vec!["1234.56元"]);
    }

    #[test]
    fn test_invalid_dates_dropped() {
        let entities = find_entities("on 2024-13-45 and 31.02.2024");
        assert!(texts(&entities, EntityKind::Date).is_empty());
    }

    #[test]
    fn test_date_not_read_as_amount() {
        let entities = find_entities("issued 2024.01.15");
        assert_eq!(texts(&entities, EntityKind::Date), vec!["2024.01.15"]);
        assert!(texts(&entities, EntityKind::Amount).is_empty());
    }

    #[test]
    fn test_digits_inside_longer_numbers_ignored() {
        let entities = find_entities("id 110101199003071234");
        assert!(texts(&entities, EntityKind::Phone).is_empty());
        assert_eq!(texts(&entities, EntityKind::Identifier), vec!["110101199003071234"]);
    }

    #[test]
    fn test_empty_text() {
        assert!(find_entities("").is_empty());
        assert!(find_entities("   \n ").is_empty());
    }

    #[test]
    fn test_deterministic() {
        let text = "2024/03/01 ¥ 99.00 tel 010-12345678 AB-77";
        assert_eq!(find_entities(text), find_entities(text));
    }
}
