use serde::{Deserialize, Serialize};

/// A cloud or version-control resource; only its Wiz id is queried.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ResourceNode {
    pub id: String,
}
