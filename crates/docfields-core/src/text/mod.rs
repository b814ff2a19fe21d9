//! Text cleaning and value normalisation.

mod clean;
mod dictionary;
mod normalize;

pub use clean::{clean_text, TextCleaner};
pub use dictionary::TermDictionary;
pub use normalize::{normalize_value, parse_amount, parse_date};
