use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::step::Step;

/// One recorded agent run.
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Episode {
    pub id: String,
    /// Steps in strict chronological order.
    pub steps: Vec<Step>,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

impl Episode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            steps: Vec::new(),
            details: BTreeMap::new(),
        }
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn push_step(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn action_count(&self) -> usize {
        self.steps.iter().filter(|step| step.is_action()).count()
    }
}
