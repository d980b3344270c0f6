use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// News categories offered for topic discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Technology,
    Business,
    Food,
    Entertainment,
    Sports,
    Tourism,
    /// Free-text query
    Others,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Technology,
        Category::Business,
        Category::Food,
        Category::Entertainment,
        Category::Sports,
        Category::Tourism,
        Category::Others,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Technology => "Technology",
            Category::Business => "Business",
            Category::Food => "Food",
            Category::Entertainment => "Entertainment",
            Category::Sports => "Sports",
            Category::Tourism => "Tourism",
            Category::Others => "others",
        }
    }

    /// Search query for the category; `Others` needs a user query
    pub fn query(&self) -> Option<&'static str> {
        match self {
            Category::Others => None,
            other => Some(other.as_str()),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| {
                let names: Vec<_> = Category::ALL.iter().map(|c| c.as_str()).collect();
                format!("Unknown category: {} (expected one of {})", s, names.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("technology".parse::<Category>().unwrap(), Category::Technology);
        assert_eq!(" Sports ".parse::<Category>().unwrap(), Category::Sports);
        assert_eq!("OTHERS".parse::<Category>().unwrap(), Category::Others);
        assert!("weather".parse::<Category>().is_err());
    }

    #[test]
    fn test_others_has_no_query() {
        assert_eq!(Category::Food.query(), Some("Food"));
        assert_eq!(Category::Others.query(), None);
    }
}
