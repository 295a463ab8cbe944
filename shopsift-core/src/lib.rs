//! Shopsift Core - Data Types
//!
//! Pure data structures shared by every shopsift crate: the semantic filter
//! intent, the capability descriptor, endpoint filter clauses, filter specs,
//! reduced product records, batch bookkeeping, errors and configuration.
//! No I/O lives here.

use chrono::{DateTime, Utc};

mod batch;
mod capability;
mod clause;
mod config;
mod error;
mod filter_spec;
mod health;
mod intent;
mod product;

pub use batch::*;
pub use capability::*;
pub use clause::*;
pub use config::*;
pub use error::*;
pub use filter_spec::*;
pub use health::*;
pub use intent::*;
pub use product::*;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Upper-case the first letter of each whitespace-separated word and
/// lower-case the rest: `"navy BLUE"` becomes `"Navy Blue"`.
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("shirts"), "Shirts");
        assert_eq!(title_case("navy BLUE"), "Navy Blue");
        assert_eq!(title_case("  t-shirt  "), "T-shirt");
        assert_eq!(title_case(""), "");
    }
}
