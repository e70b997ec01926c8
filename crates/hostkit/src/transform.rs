//! Record transformations applied before a record becomes a host

use crate::error::Result;
use crate::model::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A caller-supplied record rewrite, run in registration order
pub type Transform = Box<dyn Fn(Record) -> Result<Record> + Send + Sync>;

/// Declarative field rewrites, as written in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldTransform {
    /// Uppercase a string field
    Uppercase { field: String },
    /// Lowercase a string field
    Lowercase { field: String },
    /// Move a field to a new key
    Rename { from: String, to: String },
    /// Always set a field
    Set { field: String, value: Value },
    /// Set a field only when it is missing, null or an empty string
    Default { field: String, value: Value },
}

impl FieldTransform {
    pub fn apply(&self, mut record: Record) -> Record {
        match self {
            Self::Uppercase { field } => {
                if let Some(Value::String(s)) = record.get_mut(field) {
                    *s = s.to_uppercase();
                }
            }
            Self::Lowercase { field } => {
                if let Some(Value::String(s)) = record.get_mut(field) {
                    *s = s.to_lowercase();
                }
            }
            Self::Rename { from, to } => {
                if let Some(value) = record.remove(from) {
                    record.insert(to.clone(), value);
                }
            }
            Self::Set { field, value } => {
                record.insert(field.clone(), value.clone());
            }
            Self::Default { field, value } => {
                let unset = match record.get(field) {
                    None | Some(Value::Null) => true,
                    Some(Value::String(s)) => s.is_empty(),
                    Some(_) => false,
                };
                if unset {
                    record.insert(field.clone(), value.clone());
                }
            }
        }
        record
    }

    pub fn into_transform(self) -> Transform {
        Box::new(move |record| Ok(self.apply(record)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_field_transforms() {
        let r = record(json!({"name": "sw1", "Host": "10.0.0.1", "platform": "", "site": "Hq"}));

        let r = FieldTransform::Uppercase { field: "name".into() }.apply(r);
        let r = FieldTransform::Lowercase { field: "site".into() }.apply(r);
        let r = FieldTransform::Rename {
            from: "Host".into(),
            to: "hostname".into(),
        }
        .apply(r);
        let r = FieldTransform::Default {
            field: "platform".into(),
            value: json!("ios"),
        }
        .apply(r);
        let r = FieldTransform::Set {
            field: "managed".into(),
            value: json!(true),
        }
        .apply(r);

        assert_eq!(r["name"], json!("SW1"));
        assert_eq!(r["site"], json!("hq"));
        assert_eq!(r["hostname"], json!("10.0.0.1"));
        assert!(!r.contains_key("Host"));
        assert_eq!(r["platform"], json!("ios"));
        assert_eq!(r["managed"], json!(true));
    }

    #[test]
    fn test_default_keeps_existing_value() {
        let r = record(json!({"platform": "nxos"}));
        let r = FieldTransform::Default {
            field: "platform".into(),
            value: json!("ios"),
        }
        .apply(r);
        assert_eq!(r["platform"], json!("nxos"));
    }

    #[test]
    fn test_deserialize_tagged() {
        let t: FieldTransform =
            serde_json::from_value(json!({"kind": "rename", "from": "ip", "to": "hostname"}))
                .unwrap();
        assert_eq!(
            t,
            FieldTransform::Rename {
                from: "ip".into(),
                to: "hostname".into()
            }
        );
    }
}
