use serde::{Deserialize, Serialize};

/// Speaker of one rendered conversation turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Human,
    Gpt,
    FunctionCall,
    Observation,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Human => "human",
            Role::Gpt => "gpt",
            Role::FunctionCall => "function_call",
            Role::Observation => "observation",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub from: Role,
    pub value: String,
}

impl Turn {
    pub fn new(from: Role, value: impl Into<String>) -> Self {
        Self {
            from,
            value: value.into(),
        }
    }
}

/// Output record for one rendered episode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireRecord {
    pub id: String,
    pub system: String,
    pub conversations: Vec<Turn>,
}
