pub mod dates;
pub mod entities;
pub mod intent;

pub use dates::resolve_date;
pub use entities::{city_to_airport_code, extract_entities, Entities, PriceRange};
pub use intent::{calculate_confidence, classify_intent, Intent};

/// Trim and collapse runs of whitespace into single spaces.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize("  find\tflights \n from  JFK "), "find flights from JFK");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize("  Book   2 passengers  ");
        assert_eq!(normalize(&once), once);
    }
}
