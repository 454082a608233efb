//! Query-string model for the proxy routes.
//!
//! Keys follow the bracket conventions browsers and HTTP clients use:
//! repeated `key=v` or `key[]=v` form a list, `key[sub]=v` or `key.sub=v`
//! form a nested object, a single `key=v` is a scalar.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Value};
use url::form_urlencoded;

use crate::error::{Result, ValidationIssue, WizError};
use crate::filters::{AssetTags, RelatedEntity};

static KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<base>[^\[\].]+)(?:\[(?P<sub>[^\]]*)\]|\.(?P<dot>.+))?$")
        .expect("query key pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Scalar(String),
    List(Vec<String>),
    Object(BTreeMap<String, Vec<String>>),
}

impl ParamValue {
    fn kind(&self) -> &'static str {
        match self {
            ParamValue::Scalar(_) => "string",
            ParamValue::List(_) => "array",
            ParamValue::Object(_) => "object",
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct QueryParams {
    values: BTreeMap<String, ParamValue>,
}

impl QueryParams {
    pub fn parse(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            params.insert(&key, value.into_owned());
        }
        params
    }

    fn insert(&mut self, raw_key: &str, value: String) {
        let (base, sub) = match KEY_PATTERN.captures(raw_key) {
            Some(caps) => {
                let base = caps["base"].to_string();
                let sub = caps
                    .name("sub")
                    .or_else(|| caps.name("dot"))
                    .map(|m| m.as_str().to_string());
                (base, sub)
            }
            None => (raw_key.to_string(), None),
        };

        let entry = self.values.remove(&base);
        let merged = match (entry, sub) {
            (None, None) => ParamValue::Scalar(value),
            (None, Some(sub)) if sub.is_empty() => ParamValue::List(vec![value]),
            (None, Some(sub)) => ParamValue::Object(BTreeMap::from([(sub, vec![value])])),
            (Some(ParamValue::Scalar(first)), None) => ParamValue::List(vec![first, value]),
            (Some(ParamValue::Scalar(first)), Some(sub)) if sub.is_empty() => {
                ParamValue::List(vec![first, value])
            }
            (Some(ParamValue::List(mut list)), None) => {
                list.push(value);
                ParamValue::List(list)
            }
            (Some(ParamValue::List(mut list)), Some(sub)) if sub.is_empty() => {
                list.push(value);
                ParamValue::List(list)
            }
            (Some(ParamValue::Object(mut map)), Some(sub)) => {
                map.entry(sub).or_default().push(value);
                ParamValue::Object(map)
            }
            // Mixing plain and keyed forms yields an object; the plain values
            // are kept under the empty key.
            (Some(ParamValue::Object(mut map)), None) => {
                map.entry(String::new()).or_default().push(value);
                ParamValue::Object(map)
            }
            (Some(ParamValue::Scalar(first)), Some(sub)) => ParamValue::Object(BTreeMap::from([
                (String::new(), vec![first]),
                (sub, vec![value]),
            ])),
            (Some(ParamValue::List(list)), Some(sub)) => {
                ParamValue::Object(BTreeMap::from([(String::new(), list), (sub, vec![value])]))
            }
        };
        self.values.insert(base, merged);
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }
}

/// Reads typed fields from [`QueryParams`], collecting every shape mismatch
/// so they are reported together.
pub struct ParamReader<'a> {
    params: &'a QueryParams,
    issues: Vec<ValidationIssue>,
}

impl<'a> ParamReader<'a> {
    pub fn new(params: &'a QueryParams) -> Self {
        Self {
            params,
            issues: Vec::new(),
        }
    }

    /// A single non-empty string.
    pub fn string(&mut self, key: &str) -> Option<String> {
        match self.params.get(key)? {
            ParamValue::Scalar(s) if !s.is_empty() => Some(s.clone()),
            ParamValue::Scalar(_) => None,
            other => {
                self.issues
                    .push(ValidationIssue::invalid_type(key, "string", other.kind()));
                None
            }
        }
    }

    /// One or more strings, from a scalar or a list.
    pub fn string_list(&mut self, key: &str) -> Vec<String> {
        match self.params.get(key) {
            None => Vec::new(),
            Some(ParamValue::Scalar(s)) => non_empty(std::slice::from_ref(s)),
            Some(ParamValue::List(list)) => non_empty(list),
            Some(other) => {
                self.issues
                    .push(ValidationIssue::invalid_type(key, "array", other.kind()));
                Vec::new()
            }
        }
    }

    pub fn raw(&self, key: &str) -> Option<&'a ParamValue> {
        self.params.get(key)
    }

    pub fn finish(self) -> Result<()> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(WizError::Validation {
                issues: self.issues,
            })
        }
    }
}

fn non_empty(values: &[String]) -> Vec<String> {
    values.iter().filter(|v| !v.is_empty()).cloned().collect()
}

fn json_string_array(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(String::from))
        .collect()
}

/// `relatedEntity` carries JSON of the form `{"ids": [...]}`.
pub fn parse_related_entity(raw: &str) -> Result<RelatedEntity> {
    let invalid = |details: Value| WizError::InvalidRequest {
        message: "Invalid relatedEntity format".to_string(),
        details: Some(details),
    };

    let value: Value =
        serde_json::from_str(raw).map_err(|e| invalid(json!({ "cause": e.to_string() })))?;

    let Some(object) = value.as_object() else {
        return Err(invalid(json!({ "cause": "expected a JSON object" })));
    };

    match object.get("ids") {
        None | Some(Value::Null) => Ok(RelatedEntity::default()),
        Some(ids) => json_string_array(ids)
            .map(|ids| RelatedEntity { ids })
            .ok_or_else(|| invalid(json!({ "cause": "ids must be an array of strings" }))),
    }
}

/// `assetTags.containsAny`, given in bracket/dotted form or as a JSON object.
pub fn parse_asset_tags(value: Option<&ParamValue>) -> Result<AssetTags> {
    let invalid = || WizError::invalid_request("Invalid assetTags format");

    match value {
        None => Ok(AssetTags::default()),
        Some(ParamValue::Object(map)) => Ok(AssetTags {
            contains_any: map
                .get("containsAny")
                .map(|v| non_empty(v))
                .unwrap_or_default(),
        }),
        Some(ParamValue::Scalar(raw)) => {
            let value: Value = serde_json::from_str(raw).map_err(|_| invalid())?;
            let Some(object) = value.as_object() else {
                return Err(invalid());
            };
            match object.get("containsAny") {
                None | Some(Value::Null) => Ok(AssetTags::default()),
                Some(tags) => json_string_array(tags)
                    .map(|contains_any| AssetTags { contains_any })
                    .ok_or_else(invalid),
            }
        }
        Some(ParamValue::List(_)) => Err(invalid()),
    }
}

/// `providerUniqueId` is a bare string, a JSON array of strings, or a list.
/// Any other structured value is rejected.
pub fn parse_provider_unique_ids(value: &ParamValue) -> Result<Vec<String>> {
    let invalid = || {
        WizError::invalid_request("Invalid providerUniqueId format. Expected an array of strings.")
    };

    match value {
        ParamValue::Scalar(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(parsed @ Value::Array(_)) => json_string_array(&parsed).ok_or_else(invalid),
            Ok(Value::Object(_)) => Err(invalid()),
            _ => Ok(non_empty(std::slice::from_ref(raw))),
        },
        ParamValue::List(list) => Ok(non_empty(list)),
        ParamValue::Object(_) => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WizErrorType;

    #[test]
    fn test_repeated_keys_form_a_list() {
        let params = QueryParams::parse("project=a&project=b&search=x&ids[]=1&ids[]=2");
        assert_eq!(
            params.get("project"),
            Some(&ParamValue::List(vec!["a".into(), "b".into()]))
        );
        assert_eq!(params.get("search"), Some(&ParamValue::Scalar("x".into())));
        assert_eq!(
            params.get("ids"),
            Some(&ParamValue::List(vec!["1".into(), "2".into()]))
        );
    }

    #[test]
    fn test_bracket_and_dotted_keys_form_objects() {
        let params =
            QueryParams::parse("assetTags%5BcontainsAny%5D=t1&assetTags.containsAny=t2&x[y]=1");
        let Some(ParamValue::Object(map)) = params.get("assetTags") else {
            panic!("expected object");
        };
        assert_eq!(map["containsAny"], vec!["t1".to_string(), "t2".to_string()]);
        assert!(matches!(params.get("x"), Some(ParamValue::Object(_))));
    }

    #[test]
    fn test_reader_collects_all_issues() {
        let params = QueryParams::parse("after=a&after=b&search[x]=1");
        let mut reader = ParamReader::new(&params);
        assert_eq!(reader.string("after"), None);
        assert!(reader.string_list("search").is_empty());

        let Err(WizError::Validation { issues }) = reader.finish() else {
            panic!("expected validation error");
        };
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].path, vec!["after".to_string()]);
        assert_eq!(issues[0].message, "Expected string, received array");
    }

    #[test]
    fn test_reader_skips_empty_values() {
        let params = QueryParams::parse("search=&project=&project=p");
        let mut reader = ParamReader::new(&params);
        assert_eq!(reader.string("search"), None);
        assert_eq!(reader.string_list("project"), vec!["p".to_string()]);
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn test_related_entity() {
        let entity = parse_related_entity(r#"{"ids":["a","b"]}"#).unwrap();
        assert_eq!(entity.ids, vec!["a".to_string(), "b".to_string()]);
        assert!(parse_related_entity("{}").unwrap().is_empty());

        for bad in ["not-json", "[1]", r#"{"ids":[1]}"#, r#"{"ids":"a"}"#] {
            let err = parse_related_entity(bad).unwrap_err();
            assert_eq!(err.kind(), WizErrorType::InvalidRequest, "{bad}");
            assert_eq!(err.to_string(), "Invalid relatedEntity format");
        }
    }

    #[test]
    fn test_provider_unique_ids() {
        let json_array = ParamValue::Scalar(r#"["a","b"]"#.into());
        assert_eq!(
            parse_provider_unique_ids(&json_array).unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );

        let bare = ParamValue::Scalar("a".into());
        assert_eq!(parse_provider_unique_ids(&bare).unwrap(), vec!["a".to_string()]);

        let list = ParamValue::List(vec!["a".into(), "b".into()]);
        assert_eq!(parse_provider_unique_ids(&list).unwrap().len(), 2);

        for bad in [
            ParamValue::Scalar(r#"{"x":1}"#.into()),
            ParamValue::Scalar(r#"["a",1]"#.into()),
            ParamValue::Object(BTreeMap::from([("test".to_string(), vec![String::new()])])),
        ] {
            let err = parse_provider_unique_ids(&bad).unwrap_err();
            assert_eq!(err.kind(), WizErrorType::InvalidRequest);
        }
    }

    #[test]
    fn test_asset_tags_from_json_and_brackets() {
        let json = ParamValue::Scalar(r#"{"containsAny":["t1"]}"#.into());
        assert_eq!(parse_asset_tags(Some(&json)).unwrap().contains_any, vec!["t1".to_string()]);

        let object = ParamValue::Object(BTreeMap::from([(
            "containsAny".to_string(),
            vec!["t2".to_string()],
        )]));
        assert_eq!(parse_asset_tags(Some(&object)).unwrap().contains_any, vec!["t2".to_string()]);

        assert!(parse_asset_tags(None).unwrap().is_empty());
        assert!(parse_asset_tags(Some(&ParamValue::Scalar("nope".into()))).is_err());
    }
}
