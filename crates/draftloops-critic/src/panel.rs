use draftloops_oracle::{Oracle, OracleConfig, OracleError};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{ReviewPrompts, Role};

/// Feedback from one critique role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Critique {
    pub role: String,
    pub feedback: String,
    /// The oracle refused this role's request; `feedback` is empty
    #[serde(default)]
    pub rejected: bool,
}

impl Critique {
    pub fn new(role: impl Into<String>, feedback: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            feedback: feedback.into(),
            rejected: false,
        }
    }

    pub fn rejected(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            feedback: String::new(),
            rejected: true,
        }
    }
}

/// A fixed, ordered set of reviewer roles
pub struct CritiquePanel<'a> {
    oracle: &'a dyn Oracle,
    roles: &'a [Role],
}

impl<'a> CritiquePanel<'a> {
    pub fn new(oracle: &'a dyn Oracle, roles: &'a [Role]) -> Self {
        Self { oracle, roles }
    }

    /// Ask every role for feedback on `content`, once each, concurrently.
    ///
    /// Results follow role order. A rejected role contributes empty feedback;
    /// any other failure fails the whole panel with the first such error in
    /// role order.
    pub async fn critique(
        &self,
        content: &str,
        config: &OracleConfig,
    ) -> Result<Vec<Critique>, OracleError> {
        let payload = ReviewPrompts::critique(content);

        debug!(roles = self.roles.len(), "Running critique panel");

        let calls = self
            .roles
            .iter()
            .map(|role| self.oracle.complete(&role.instruction, &payload, config));
        let responses = join_all(calls).await;

        let mut critiques = Vec::with_capacity(self.roles.len());
        for (role, response) in self.roles.iter().zip(responses) {
            match response {
                Ok(completion) => critiques.push(Critique::new(&role.name, completion.text.trim())),
                Err(e) if e.is_rejected() => {
                    warn!(role = %role.name, error = %e, "Reviewer rejected, leaving section empty");
                    critiques.push(Critique::rejected(&role.name));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(critiques)
    }
}
