//! The task for one conversation turn.
//!
//! A `Task` is created once when a turn starts and is read-only afterwards.

use serde::{Deserialize, Serialize};

use crate::id::{generate_turn_id, now_ms};

/// The user's request plus the context the generation prompt needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: String,
    goal: String,
    information: Option<String>,
    tools: Option<String>,
    created_at: i64,
}

impl Task {
    /// Create a task for the given goal.
    pub fn new(goal: impl Into<String>) -> Self {
        let goal = goal.into();
        Self {
            id: generate_turn_id(&goal),
            goal,
            information: None,
            tools: None,
            created_at: now_ms(),
        }
    }

    /// Attach a description of the resources to explore (database, documents, ...).
    pub fn with_information(mut self, information: impl Into<String>) -> Self {
        self.information = Some(information.into());
        self
    }

    /// Attach the signatures of tools the generated code may call.
    pub fn with_tools(mut self, tools: impl Into<String>) -> Self {
        self.tools = Some(tools.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn information(&self) -> Option<&str> {
        self.information.as_deref()
    }

    pub fn tools(&self) -> Option<&str> {
        self.tools.as_deref()
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }
}
