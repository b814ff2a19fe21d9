//! Regex library for the fallback entity strategy.

use lazy_static::lazy_static;
use regex::Regex;

use super::EntityKind;

lazy_static! {
    // Dates
    pub static ref DATE_ISO: Regex = Regex::new(
        r"\d{4}[-/.]\d{1,2}[-/.]\d{1,2}"
    ).unwrap();

    pub static ref DATE_CJK: Regex = Regex::new(
        r"\d{4}\s*年\s*\d{1,2}\s*月\s*\d{1,2}\s*日"
    ).unwrap();

    pub static ref DATE_DMY: Regex = Regex::new(
        r"\d{1,2}[./\-]\d{1,2}[./\-]\d{4}"
    ).unwrap();

    // Amounts
    pub static ref AMOUNT_PREFIXED: Regex = Regex::new(
        r"(?:[￥¥$€£]|\b(?:RMB|CNY|USD|EUR|GBP|PLN)\b)\s*-?\d+(?:[,，]\d{3})*(?:\.\d{1,2})?"
    ).unwrap();

    pub static ref AMOUNT_SUFFIXED: Regex = Regex::new(
        r"\d+(?:[,，]\d{3})*(?:[.,]\d{1,2})?\s*(?:元|圆|zł|PLN|EUR|USD|RMB|CNY|€)"
    ).unwrap();

    pub static ref AMOUNT_PLAIN: Regex = Regex::new(
        r"\d{1,3}(?:\.\d{3})+,\d{2}|\d{1,3}(?:[,， \u{00a0}]?\d{3})*[.,]\d{2}"
    ).unwrap();

    // Phones
    pub static ref PHONE_MOBILE: Regex = Regex::new(
        r"1[3-9]\d{9}"
    ).unwrap();

    pub static ref PHONE_LANDLINE: Regex = Regex::new(
        r"0\d{2,3}-\d{7,8}"
    ).unwrap();

    pub static ref PHONE_INTERNATIONAL: Regex = Regex::new(
        r"\+\d{1,3}[\s-]?\d{2,4}(?:[\s-]?\d{2,4}){2,3}"
    ).unwrap();

    // Email
    pub static ref EMAIL: Regex = Regex::new(
        r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}"
    ).unwrap();

    // Identifiers
    pub static ref NATIONAL_ID: Regex = Regex::new(
        r"\d{17}[\dXx]"
    ).unwrap();

    pub static ref DOCUMENT_NUMBER: Regex = Regex::new(
        r"[A-Za-z]{2,}-\d+(?:-\d+)*"
    ).unwrap();
}

/// Patterns for one entity kind, in no particular precedence.
pub fn patterns_for(kind: EntityKind) -> Vec<&'static Regex> {
    match kind {
        EntityKind::Date => vec![&*DATE_ISO, &*DATE_CJK, &*DATE_DMY],
        EntityKind::Amount => vec![&*AMOUNT_PREFIXED, &*AMOUNT_SUFFIXED, &*AMOUNT_PLAIN],
        EntityKind::Phone => vec![&*PHONE_MOBILE, &*PHONE_LANDLINE, &*PHONE_INTERNATIONAL],
        EntityKind::Email => vec![&*EMAIL],
        EntityKind::Identifier => vec![&*NATIONAL_ID, &*DOCUMENT_NUMBER],
        EntityKind::Organization | EntityKind::Person | EntityKind::Location => Vec::new(),
    }
}
