//! Topic discovery from news headlines.
//!
//! A category (or a free-text query) is searched against a news feed and the
//! resulting headlines are offered as loop topics.

mod category;
mod source;

pub use category::Category;
pub use source::{
    parse_rss_titles, Candidate, GoogleNewsSource, TopicError, TopicSource, DEFAULT_LIMIT,
};
