//! Generation prompt builder.
//!
//! The sentinel phrase the model is told to emit is the same string the
//! executor matches against, so the two cannot drift apart.

use serde::{Deserialize, Serialize};

use crate::artifact::{DEFAULT_SENTINEL, SUMMARY_FIELD};
use crate::domain::Task;
use crate::llm::CompletionRequest;
use crate::validation::{FeedbackFormatter, RoundFeedback};

/// Few-shot example shown to the generation model unless the profile replaces it.
pub const DEFAULT_EXAMPLE: &str = r#"**Information**
mysql database, ip: 192.168.50.189, port: 3306, user: root, password: test, database: taobao

**HasTools**
def execute_sql_query(sql_query: Annotated[str, 'sql statement', True],
                      host: Annotated[str, 'database host', True],
                      port: Annotated[str, 'database port', True],
                      user: Annotated[str, 'user name', True],
                      password: Annotated[str, 'password', True],
                      database: Annotated[str, 'database name', True]
                      ):

**Question**
Explore the table structure of the given database

**CreateTools**
```python
import execute_sql_query
def show_tables(host, port, user, password, database):
    # SQL query to retrieve table information
    sql_query = "SHOW TABLES"
    tables = execute_sql_query(sql_query, host=host, port=port, user=user, password=password, database=database)

    if tables:
        for table in tables:
            table_name = table[0]
            print("Table:", table_name)

            # SQL query to describe table structure
            describe_query = "DESCRIBE " + table_name
            table_structure = execute_sql_query(describe_query, host=host, port=port, user=user, password=password, database=database)
            if table_structure:
                for field in table_structure:
                    print(field)
            print("\n")
```

**Solution**
```python
host = '192.168.50.189'
port = 3306
user = 'root'
password = 'test'
database = 'taobao'
show_tables(host, port, user, password, database)
```"#;

/// Who the generation model plays and what it is for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentProfile {
    pub role: String,
    pub goal: String,

    /// Short description for display; blank falls back to `goal`.
    pub desc: String,

    pub constraints: Vec<String>,

    /// Worked example rendered under `## Example`; blank omits the section.
    pub examples: String,
}

impl AgentProfile {
    pub fn description(&self) -> &str {
        if self.desc.trim().is_empty() { &self.goal } else { &self.desc }
    }
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self {
            role: "Discoverer".to_string(),
            goal: "Explore the provided resources (databases, documents, ...) by writing Python tools and a \
                   solution that uses them, based on the tools already available."
                .to_string(),
            desc: "Explores the provided databases, documents and other resources.".to_string(),
            constraints: vec![
                "You may create new tools or use the existing ones to solve the problem.".to_string(),
                "Only use connection details given in the information section.".to_string(),
            ],
            examples: DEFAULT_EXAMPLE.to_string(),
        }
    }
}

/// Assembles generation requests.
#[derive(Debug, Clone)]
pub struct GenerationPrompt {
    profile: AgentProfile,
    sentinel: String,
    max_tokens: u32,
    model: Option<String>,
}

impl Default for GenerationPrompt {
    fn default() -> Self {
        Self::new(AgentProfile::default(), DEFAULT_SENTINEL)
    }
}

impl GenerationPrompt {
    pub fn new(profile: AgentProfile, sentinel: impl Into<String>) -> Self {
        Self {
            profile,
            sentinel: sentinel.into(),
            max_tokens: 4096,
            model: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// System instruction: profile, constraints, answer format, sentinel rule.
    pub fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are a {}.\n\n## Goal\n\n{}\n\n",
            self.profile.role, self.profile.goal
        );

        if !self.profile.constraints.is_empty() {
            prompt.push_str("## Constraints\n\n");
            for (i, constraint) in self.profile.constraints.iter().enumerate() {
                prompt.push_str(&format!("{}. {}\n", i + 1, constraint));
            }
            prompt.push('\n');
        }

        let examples = self.profile.examples.trim();
        if !examples.is_empty() {
            prompt.push_str(&format!("## Example\n\n{}\n\n", examples));
        }

        prompt.push_str("## Response Format\n\n");
        prompt.push_str(&format!(
            "Respond with a single JSON object: {{\"{}\": \"<your complete answer, including all code>\"}}\n",
            SUMMARY_FIELD
        ));
        prompt.push_str(&format!(
            "If you cannot produce a correct answer, set \"{}\" to exactly: {}\n",
            SUMMARY_FIELD, self.sentinel
        ));

        prompt
    }

    /// Human message: task context, question, previous round feedback.
    pub fn user_message(&self, task: &Task, feedback: Option<&RoundFeedback>) -> String {
        let mut message = String::new();

        if let Some(information) = task.information() {
            message.push_str(&format!("## Information\n\n{}\n\n", information));
        }

        if let Some(tools) = task.tools() {
            message.push_str(&format!("## Available Tools\n\n{}\n\n", tools));
        }

        message.push_str(&format!("## Question\n\n{}\n", task.goal()));

        if let Some(feedback) = feedback {
            message.push('\n');
            message.push_str(&FeedbackFormatter::new().format_for_prompt(feedback));
        }

        message
    }

    /// Full request for one generation round.
    pub fn build_request(&self, task: &Task, feedback: Option<&RoundFeedback>) -> CompletionRequest {
        CompletionRequest::new(self.system_prompt())
            .with_human_message(self.user_message(task, feedback))
            .with_max_tokens(self.max_tokens)
            .with_model(self.model.clone())
    }
}
