mod counts;
mod issue;
mod resource;
mod severity;
mod vulnerability;

pub use counts::{GroupedCount, IssuesCounts};
pub use issue::{EntitySnapshot, IssueNode, SourceRule};
pub use resource::ResourceNode;
pub use severity::Severity;
pub use vulnerability::{RelatedIssueAnalytics, VulnerabilityNode, VulnerableAsset};
