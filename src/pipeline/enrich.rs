//! Metadata enrichment: stamp provenance into the reserved `_meta` key.

use crate::config::ExtractionOptions;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Reserved top-level key owned by the pipeline.
pub const META_KEY: &str = "_meta";

/// Key used to wrap a record whose top level is not an object.
pub const WRAP_KEY: &str = "dados";

/// Where a record came from and how it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    #[serde(rename = "fonte_arquivo")]
    pub source_filename: String,
    #[serde(rename = "data_processamento", serialize_with = "rfc3339_millis")]
    pub processed_at: DateTime<Utc>,
    #[serde(rename = "opcoes")]
    pub options: ExtractionOptions,
}

impl Provenance {
    /// Provenance stamped with the current UTC time.
    pub fn now(source_filename: impl Into<String>, options: ExtractionOptions) -> Self {
        Self {
            source_filename: source_filename.into(),
            processed_at: Utc::now(),
            options,
        }
    }
}

impl Provenance {
    /// The `_meta` object for this provenance.
    pub fn to_meta(&self) -> Value {
        json!({
            "fonte_arquivo": self.source_filename,
            "data_processamento": format_timestamp(&self.processed_at),
            "opcoes": {
                "first_page_only": self.options.first_page_only,
                "page_limit": self.options.page_limit,
            },
        })
    }
}

/// RFC 3339, UTC, millisecond precision, `Z` suffix.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn rfc3339_millis<S: serde::Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_timestamp(ts))
}

/// Attach `_meta` to `record`.
///
/// An existing `_meta` is overwritten; every other key is left alone. A
/// record that is not an object is wrapped as `{"dados": record}` first.
pub fn enrich(record: Value, provenance: &Provenance) -> Value {
    let mut map = match record {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert(WRAP_KEY.to_string(), other);
            map
        }
    };
    map.insert(META_KEY.to_string(), provenance.to_meta());
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn provenance() -> Provenance {
        Provenance {
            source_filename: "fatura_agosto.pdf".into(),
            processed_at: Utc.with_ymd_and_hms(2024, 8, 20, 13, 5, 9).unwrap(),
            options: ExtractionOptions::default(),
        }
    }

    #[test]
    fn adds_meta_without_touching_fields() {
        let out = enrich(json!({"total": 100}), &provenance());
        assert_eq!(out["total"], json!(100));
        assert_eq!(out.as_object().unwrap().len(), 2);
        assert_eq!(
            out["_meta"],
            json!({
                "fonte_arquivo": "fatura_agosto.pdf",
                "data_processamento": "2024-08-20T13:05:09.000Z",
                "opcoes": { "first_page_only": true, "page_limit": null }
            })
        );
    }

    #[test]
    fn overwrites_hallucinated_meta() {
        let out = enrich(json!({"_meta": "inventado", "a": 1}), &provenance());
        assert_eq!(out["a"], json!(1));
        assert_eq!(out["_meta"]["fonte_arquivo"], "fatura_agosto.pdf");
    }

    #[test]
    fn wraps_non_object_records() {
        let out = enrich(json!([1, 2]), &provenance());
        assert_eq!(out["dados"], json!([1, 2]));
        assert!(out["_meta"].is_object());

        let out = enrich(Value::Null, &provenance());
        assert_eq!(out["dados"], Value::Null);
    }

    #[test]
    fn meta_matches_serialised_provenance() {
        let p = Provenance {
            options: ExtractionOptions::with_page_limit(3).unwrap(),
            ..provenance()
        };
        assert_eq!(p.to_meta(), serde_json::to_value(&p).unwrap());
        assert_eq!(enrich(json!({}), &p)["_meta"]["opcoes"]["page_limit"], json!(3));
    }

    #[test]
    fn now_uses_utc() {
        let p = Provenance::now("x.pdf", ExtractionOptions::all_pages());
        let meta = serde_json::to_value(&p).unwrap();
        assert!(meta["data_processamento"].as_str().unwrap().ends_with('Z'));
        assert_eq!(meta["opcoes"]["first_page_only"], json!(false));
    }
}
