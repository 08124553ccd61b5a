//! Row projection for fetched documents.

use chrono::{DateTime, Local, Utc};
use chrono_tz::Tz;
use serde_json::Value as JsonValue;

use super::{Row, Settings};
use crate::alias::{IDENTITY_FIELD, ID_ALIAS};
use crate::ast::{SelectFunction, SelectItem};
use crate::store::Document;
use crate::value::date_like;

/// Output shape of `toDate`: `MM/DD/YY HH:MM:SS`, 24-hour clock.
pub const DATE_FORMAT: &str = "%m/%d/%y %H:%M:%S";

/// Format an instant in the given zone, or the local zone when `None`.
pub fn format_date(ts: DateTime<Utc>, timezone: Option<Tz>) -> String {
    match timezone {
        Some(tz) => ts.with_timezone(&tz).format(DATE_FORMAT).to_string(),
        None => ts.with_timezone(&Local).format(DATE_FORMAT).to_string(),
    }
}

pub(crate) fn project(doc: &Document, select: &[SelectItem], settings: &Settings) -> Row {
    let mut row = Row::new();

    for item in select {
        match item {
            SelectItem::Wildcard => {
                if settings.include_id {
                    row.insert(ID_ALIAS.to_string(), JsonValue::String(doc.id.clone()));
                }
                row.extend(doc.fields.clone());
            }
            SelectItem::Field(name) => {
                // absent fields are omitted, not nulled
                if let Some(value) = doc.get(name) {
                    row.insert(item.label(), value);
                }
            }
            SelectItem::Function {
                function: SelectFunction::ToDate,
                argument,
            } => {
                let value = match doc.get(argument) {
                    Some(value) => match date_like(&value) {
                        Some(ts) => JsonValue::String(format_date(ts, settings.timezone)),
                        None => value,
                    },
                    None => JsonValue::Null,
                };
                row.insert(item.label(), value);
            }
            SelectItem::Function {
                function: SelectFunction::PrettyJson,
                argument,
            } => {
                let value = if argument == "*" || argument == IDENTITY_FIELD {
                    Some(whole_document(doc))
                } else {
                    doc.get(argument)
                };
                let rendered = match value {
                    Some(value) => JsonValue::String(
                        serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()),
                    ),
                    None => JsonValue::Null,
                };
                row.insert(item.label(), rendered);
            }
            SelectItem::CountAll => {}
        }
    }

    row
}

fn whole_document(doc: &Document) -> JsonValue {
    let mut whole = Row::new();
    whole.insert(ID_ALIAS.to_string(), JsonValue::String(doc.id.clone()));
    whole.extend(doc.fields.clone());
    JsonValue::Object(whole)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SelectFunction;
    use serde_json::json;

    fn doc() -> Document {
        let fields = json!({
            "name": "Ada",
            "createdAt": "2024-03-01T15:04:05Z",
            "stamp": {"_seconds": 0, "_nanoseconds": 0},
            "nickname": "not a date",
            "meta": {"a": 1}
        });
        Document::new("u1", fields.as_object().cloned().unwrap())
    }

    fn utc() -> Settings {
        Settings {
            timezone: Some(chrono_tz::UTC),
            ..Settings::default()
        }
    }

    fn func(function: SelectFunction, argument: &str) -> SelectItem {
        SelectItem::Function {
            function,
            argument: argument.to_string(),
        }
    }

    #[test]
    fn test_fields_and_identity() {
        let select = vec![
            SelectItem::Field(IDENTITY_FIELD.to_string()),
            SelectItem::Field("name".to_string()),
            SelectItem::Field("missing".to_string()),
        ];
        let row = project(&doc(), &select, &utc());
        assert_eq!(row.get("id"), Some(&json!("u1")));
        assert_eq!(row.get("name"), Some(&json!("Ada")));
        assert!(!row.contains_key("missing"));
        let keys: Vec<&String> = row.keys().collect();
        assert_eq!(keys, vec!["id", "name"]);
    }

    #[test]
    fn test_wildcard() {
        let row = project(&doc(), &[SelectItem::Wildcard], &utc());
        assert!(!row.contains_key("id"));
        assert_eq!(row.len(), 5);

        let settings = Settings {
            include_id: true,
            ..utc()
        };
        let row = project(&doc(), &[SelectItem::Wildcard], &settings);
        assert_eq!(row.keys().next().map(String::as_str), Some("id"));
    }

    #[test]
    fn test_to_date() {
        let select = vec![
            func(SelectFunction::ToDate, "createdAt"),
            func(SelectFunction::ToDate, "stamp"),
            func(SelectFunction::ToDate, "nickname"),
            func(SelectFunction::ToDate, "missing"),
        ];
        let row = project(&doc(), &select, &utc());
        assert_eq!(row["toDate(createdAt)"], json!("03/01/24 15:04:05"));
        assert_eq!(row["toDate(stamp)"], json!("01/01/70 00:00:00"));
        assert_eq!(row["toDate(nickname)"], json!("not a date"));
        assert_eq!(row["toDate(missing)"], JsonValue::Null);
    }

    #[test]
    fn test_to_date_in_zone() {
        let settings = Settings {
            timezone: Some(chrono_tz::America::New_York),
            ..Settings::default()
        };
        let row = project(&doc(), &[func(SelectFunction::ToDate, "createdAt")], &settings);
        assert_eq!(row["toDate(createdAt)"], json!("03/01/24 10:04:05"));
    }

    #[test]
    fn test_pretty_json() {
        let row = project(&doc(), &[func(SelectFunction::PrettyJson, "meta")], &utc());
        assert_eq!(row["prettyJson(meta)"], json!("{\n  \"a\": 1\n}"));

        let row = project(&doc(), &[func(SelectFunction::PrettyJson, "missing")], &utc());
        assert_eq!(row["prettyJson(missing)"], JsonValue::Null);
    }

    #[test]
    fn test_pretty_json_whole_row() {
        for argument in ["*", IDENTITY_FIELD] {
            let item = func(SelectFunction::PrettyJson, argument);
            let label = item.label();
            let row = project(&doc(), &[item], &utc());
            let rendered = row[&label].as_str().unwrap();
            let parsed: JsonValue = serde_json::from_str(rendered).unwrap();
            assert_eq!(parsed["id"], json!("u1"));
            assert_eq!(parsed["name"], json!("Ada"));
            assert!(rendered.contains('\n'));
        }
    }
}
