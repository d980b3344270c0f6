/// Prompt templates for the writer
pub struct WriterPrompts;

impl WriterPrompts {
    /// First draft of an article on `topic`
    pub fn initial(topic: &str) -> String {
        format!(
            r#"Write detailed content about this topic: {topic}

Include relevant analysis and background information. Do not add any additional resources or links."#,
            topic = topic,
        )
    }

    /// Revision of `previous_content` guided by the evaluation `report`
    pub fn revision(
        topic: &str,
        previous_content: &str,
        report: &str,
        previous_unchanged: bool,
    ) -> String {
        let nudge = if previous_unchanged {
            "\n\nYour last revision was identical to an earlier version. Make substantive changes this time."
        } else {
            ""
        };

        format!(
            r#"Revise the previous content about "{topic}" given the evaluation report below.

## Previous Content
{content}

## Evaluation Report
{report}

Address the scores and reviewer feedback, summarizing the most important points for yourself before rewriting. Produce the complete improved article, not a list of changes.{nudge}"#,
            topic = topic,
            content = previous_content,
            report = report,
            nudge = nudge,
        )
    }
}

/// Prompt templates for the evaluators
pub struct ReviewPrompts;

impl ReviewPrompts {
    /// Payload sent to every critique role
    pub fn critique(content: &str) -> String {
        format!("Review the following content:\n\n{}", content)
    }

    /// Payload sent to a dimension rater
    pub fn rating(content: &str) -> String {
        format!("Content to rate:\n\n{}", content)
    }
}
