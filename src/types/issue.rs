use serde::{Deserialize, Serialize};

/// One row of the issues query.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct IssueNode {
    pub id: String,
    pub url: Option<String>,
    #[serde(rename = "sourceRule")]
    pub source_rule: Option<SourceRule>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "type")]
    pub issue_type: Option<String>,
    pub status: String,
    pub severity: String,
    #[serde(rename = "entitySnapshot")]
    pub entity_snapshot: Option<EntitySnapshot>,
}

/// The rule that raised an issue (a control, configuration rule or event rule).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SourceRule {
    #[serde(rename = "__typename", default)]
    pub typename: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
    pub name: Option<String>,
}
