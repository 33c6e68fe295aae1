//! # References
//!
//! Cross-resource references declared in specs as `*Ref.from.name`.

use serde::{Deserialize, Serialize};

/// Reference to another custom resource by name
///
/// ```yaml
/// restAPIRef:
///   from:
///     name: my-rest-api
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceReference {
    pub from: ReferenceTarget,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceTarget {
    pub name: String,
    /// Defaults to the referencing resource's namespace
    #[serde(default)]
    pub namespace: Option<String>,
}

impl ResourceReference {
    pub fn to(name: &str) -> Self {
        Self {
            from: ReferenceTarget {
                name: name.to_string(),
                namespace: None,
            },
        }
    }
}
