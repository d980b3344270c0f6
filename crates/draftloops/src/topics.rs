//! Choosing the loop topic: given directly, or picked from news headlines.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use dialoguer::{FuzzySelect, Input, Select};

use draftloops_topics::{Candidate, Category, TopicSource, DEFAULT_LIMIT};

#[derive(Args, Debug, Default)]
pub struct TopicArgs {
    /// Topic to write about
    #[arg(short, long, conflicts_with_all = ["category", "query"])]
    pub topic: Option<String>,

    /// News category to pick a headline from
    #[arg(short, long)]
    pub category: Option<Category>,

    /// Free-text news search (implies the "others" category)
    #[arg(short, long)]
    pub query: Option<String>,

    /// Take the first headline instead of prompting
    #[arg(long)]
    pub first: bool,

    /// Print matching headlines and exit
    #[arg(long)]
    pub list_topics: bool,
}

impl TopicArgs {
    pub fn is_direct(&self) -> bool {
        self.topic.is_some()
    }
}

/// Resolve the topic to write about.
///
/// Returns `None` when headlines were only listed.
pub async fn resolve_topic(args: &TopicArgs, source: &dyn TopicSource) -> Result<Option<String>> {
    if let Some(ref topic) = args.topic {
        return Ok(Some(topic.trim().to_string()));
    }

    let category = match (args.category, &args.query) {
        (Some(category), _) => category,
        (None, Some(_)) => Category::Others,
        (None, None) => pick_category()?,
    };

    let query = match (&args.query, category.query()) {
        (Some(query), _) => query.clone(),
        (None, Some(query)) => query.to_string(),
        (None, None) => Input::<String>::new()
            .with_prompt("Search news for")
            .interact_text()?,
    };

    let candidates = source
        .search(&query, category, DEFAULT_LIMIT)
        .await
        .with_context(|| format!("Failed to fetch headlines for {:?}", query))?;

    if args.list_topics {
        print_candidates(&candidates);
        return Ok(None);
    }

    if args.first {
        let first = candidates
            .first()
            .context("No headlines to choose from")?;
        return Ok(Some(first.title.clone()));
    }

    let items: Vec<&str> = candidates.iter().map(|c| c.title.as_str()).collect();
    let selection = FuzzySelect::new()
        .with_prompt("Select a topic")
        .items(&items)
        .default(0)
        .interact()?;

    Ok(Some(candidates[selection].title.clone()))
}

fn pick_category() -> Result<Category> {
    let items: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
    let selection = Select::new()
        .with_prompt("Select a news category")
        .items(&items)
        .default(0)
        .interact()?;
    Ok(Category::ALL[selection])
}

fn print_candidates(candidates: &[Candidate]) {
    for (i, candidate) in candidates.iter().enumerate() {
        println!(
            "{} {} {}",
            format!("{}.", i + 1).dimmed(),
            candidate.title,
            format!("[{}]", candidate.category).dimmed()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use draftloops_topics::TopicError;
    use std::sync::Mutex;

    /// Records queries and answers with fixed headlines
    struct FixedSource {
        queries: Mutex<Vec<(String, Category)>>,
    }

    impl FixedSource {
        fn new() -> Self {
            Self {
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TopicSource for FixedSource {
        async fn search(
            &self,
            query: &str,
            category: Category,
            limit: usize,
        ) -> Result<Vec<Candidate>, TopicError> {
            self.queries
                .lock()
                .unwrap()
                .push((query.to_string(), category));
            Ok(["First headline", "Second headline"]
                .iter()
                .take(limit)
                .map(|t| Candidate {
                    title: t.to_string(),
                    category,
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_direct_topic_skips_search() {
        let source = FixedSource::new();
        let args = TopicArgs {
            topic: Some(" Quantum Computing ".into()),
            ..Default::default()
        };

        let topic = resolve_topic(&args, &source).await.unwrap();
        assert_eq!(topic.as_deref(), Some("Quantum Computing"));
        assert!(source.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_category_first_headline() {
        let source = FixedSource::new();
        let args = TopicArgs {
            category: Some(Category::Technology),
            first: true,
            ..Default::default()
        };

        let topic = resolve_topic(&args, &source).await.unwrap();
        assert_eq!(topic.as_deref(), Some("First headline"));
        assert_eq!(
            source.queries.lock().unwrap()[0],
            ("Technology".to_string(), Category::Technology)
        );
    }

    #[tokio::test]
    async fn test_query_implies_others() {
        let source = FixedSource::new();
        let args = TopicArgs {
            query: Some("fusion energy".into()),
            list_topics: true,
            ..Default::default()
        };

        let topic = resolve_topic(&args, &source).await.unwrap();
        assert!(topic.is_none());
        assert_eq!(
            source.queries.lock().unwrap()[0],
            ("fusion energy".to_string(), Category::Others)
        );
    }
}
