//! Extracted paper metadata, as written to `<id>.json`

use serde::{Deserialize, Deserializer, Serialize};

/// One hypothesis or research question with its variables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hypothesis {
    /// "hypothesis" or "research question"
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    /// Independent variable(s), comma separated
    pub iv: String,
    pub iv_description: String,
    /// Dependent variable(s), comma separated
    pub dv: String,
    pub dv_description: String,
    pub method: String,
    pub result: String,
    pub conclusion: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperInfo {
    #[serde(default, deserialize_with = "list_or_empty")]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub summary: String,
    /// Hypotheses or research questions; empty when the paper states none
    #[serde(default, deserialize_with = "list_or_empty")]
    pub content: Vec<Hypothesis>,
}

impl PaperInfo {
    pub fn hypothesis_count(&self) -> u64 {
        self.content.len() as u64
    }
}

/// Models answer "none" as `""` or `null` instead of `[]`.
fn list_or_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrScalar<T> {
        List(Vec<T>),
        Scalar(serde_json::Value),
    }

    match Option::<ListOrScalar<T>>::deserialize(deserializer)? {
        Some(ListOrScalar::List(v)) => Ok(v),
        Some(ListOrScalar::Scalar(serde_json::Value::String(s))) if s.trim().is_empty() => {
            Ok(Vec::new())
        }
        Some(ListOrScalar::Scalar(other)) => Err(serde::de::Error::custom(format!(
            "expected a list, got {other}"
        ))),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_field_renamed() {
        let h: Hypothesis =
            serde_json::from_str(r#"{"type": "hypothesis", "iv": "trust", "dv": "use"}"#).unwrap();
        assert_eq!(h.kind, "hypothesis");
        assert_eq!(h.method, "");

        let out = serde_json::to_value(&h).unwrap();
        assert_eq!(out["type"], "hypothesis");
        assert!(out.get("kind").is_none());
    }

    #[test]
    fn empty_string_content_is_empty_list() {
        let info: PaperInfo =
            serde_json::from_str(r#"{"keywords": ["a"], "summary": "s", "content": ""}"#).unwrap();
        assert!(info.content.is_empty());
        assert_eq!(info.hypothesis_count(), 0);
    }

    #[test]
    fn null_and_missing_lists() {
        let info: PaperInfo = serde_json::from_str(r#"{"content": null}"#).unwrap();
        assert!(info.keywords.is_empty());
        assert!(info.content.is_empty());
    }

    #[test]
    fn non_list_content_rejected() {
        let err = serde_json::from_str::<PaperInfo>(r#"{"content": 5}"#).unwrap_err();
        assert!(err.to_string().contains("expected a list"));
    }
}
