use serde::{Deserialize, Serialize};

/// A named persona the oracle is asked to play
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub instruction: String,
}

impl Role {
    pub fn new(name: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instruction: instruction.into(),
        }
    }

    /// The content generator
    pub fn writer() -> Self {
        Self::new(
            "Writer",
            "You are a writer who creates engaging and informative content. \
             You analyze news topics and create detailed, well-structured articles \
             with relevant analysis and background information. \
             You polish your writing based on feedback and provide refined versions. \
             Do not add external resources, reference lists or links.",
        )
    }

    pub fn seo_reviewer() -> Self {
        Self::reviewer(
            "SEO",
            "an SEO expert who reviews content for search optimization",
            "keyword usage, structure, and visibility",
        )
    }

    pub fn ethics_reviewer() -> Self {
        Self::reviewer(
            "Ethics",
            "a legal and ethics expert who reviews content for compliance and potential harm",
            "legal exposure, fairness, and factual responsibility",
        )
    }

    pub fn style_reviewer() -> Self {
        Self::reviewer(
            "Style",
            "a writing style expert who reviews content for clarity and engagement",
            "tone, flow, and clarity",
        )
    }

    /// SEO, Ethics, Style in that order
    pub fn default_panel() -> Vec<Role> {
        vec![
            Self::seo_reviewer(),
            Self::ethics_reviewer(),
            Self::style_reviewer(),
        ]
    }

    /// Rater for a single quality dimension
    pub fn rater(dimension: &str) -> Self {
        Self::new(
            format!("Rater ({})", dimension),
            format!(
                "You are a strict content evaluator. Rate the content you are given on \
                 {dimension} only, on a scale from 0 to 100 where 100 is flawless. \
                 Respond with a bare number and nothing else.",
                dimension = dimension
            ),
        )
    }

    /// Reviewer instruction with a labeled opening line and exactly three bullets
    pub fn reviewer(name: &str, persona: &str, focus: &str) -> Self {
        Self::new(
            name,
            format!(
                "You are {persona}. Provide concise, actionable feedback in exactly 3 bullet \
                 points about {focus}. Begin with '{name} Review:' on its own line and write \
                 nothing after the third bullet.",
                persona = persona,
                focus = focus,
                name = name
            ),
        )
    }

    /// The opening line a reviewer is told to start with
    pub fn review_label(&self) -> String {
        format!("{} Review:", self.name)
    }
}
