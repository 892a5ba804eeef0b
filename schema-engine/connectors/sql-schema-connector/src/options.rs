use serde::{Deserialize, Serialize};
use sql_schema_model::NodePath;

/// Settings of a translation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslatorOptions {
    /// When false, foreign keys and unique indexes are not created.
    pub allow_create_constraints: bool,
    /// Column paths whose values are carried over a type change even when the types are not
    /// convertible.
    pub enforced_conversions: Vec<NodePath>,
}

impl Default for TranslatorOptions {
    fn default() -> Self {
        TranslatorOptions {
            allow_create_constraints: true,
            enforced_conversions: Vec::new(),
        }
    }
}

impl TranslatorOptions {
    pub fn is_conversion_enforced(&self, column: &NodePath) -> bool {
        self.enforced_conversions.contains(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn options_deserialize_with_defaults() {
        let options: TranslatorOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, TranslatorOptions::default());
        assert!(options.allow_create_constraints);

        let options: TranslatorOptions = serde_json::from_str(
            r#"{ "allowCreateConstraints": false, "enforcedConversions": ["Tables/Cat/Columns/Age"] }"#,
        )
        .unwrap();

        assert!(!options.allow_create_constraints);
        assert!(options.is_conversion_enforced(&NodePath::column("Cat", "Age")));
    }
}
