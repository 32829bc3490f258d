//! Firestore REST API 타입 정의 및 값 변환

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::store::{Document, Fields};

/// 문서 객체
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirestoreDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
}

impl FirestoreDocument {
    /// `projects/.../documents/{collection}/{id}` 에서 마지막 세그먼트
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }

    pub fn into_document(self) -> Document {
        let id = self.id().to_string();
        let data = decode_fields(&self.fields);
        Document { id, data }
    }
}

/// 목록 조회 응답
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<FirestoreDocument>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// runQuery 응답 항목 (결과가 없으면 document 없이 readTime만 옴)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryResponseItem {
    #[serde(default)]
    pub document: Option<FirestoreDocument>,
    #[serde(default)]
    pub read_time: Option<String>,
}

/// 에러 응답
#[derive(Debug, Clone, Deserialize)]
pub struct FirestoreErrorBody {
    pub error: FirestoreErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FirestoreErrorDetail {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

/// 필드 동등 조건 structuredQuery 본문
pub fn equality_query(collection_id: &str, field: &str, value: &Value) -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": collection_id }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": field },
                    "op": "EQUAL",
                    "value": encode_value(value)
                }
            }
        }
    })
}

/// JSON 값 → Firestore 타입 값
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                // integerValue는 문자열로 전송
                json!({ "integerValue": i.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64().unwrap_or_default() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

pub fn encode_fields(fields: &Fields) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect()
}

/// Firestore 타입 값 → JSON 값
pub fn decode_value(value: &Value) -> Value {
    let Some(obj) = value.as_object() else {
        return Value::Null;
    };

    if let Some(s) = obj.get("stringValue") {
        return s.clone();
    }
    if let Some(v) = obj.get("integerValue") {
        return match v {
            Value::String(s) => s.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
            other => other.clone(),
        };
    }
    if let Some(v) = obj.get("doubleValue") {
        return v.clone();
    }
    if let Some(v) = obj.get("booleanValue") {
        return v.clone();
    }
    if let Some(v) = obj.get("timestampValue") {
        return v.clone();
    }
    if let Some(v) = obj.get("referenceValue") {
        return v.clone();
    }
    if let Some(v) = obj.get("arrayValue") {
        let items = v
            .get("values")
            .and_then(|values| values.as_array())
            .map(|values| values.iter().map(decode_value).collect())
            .unwrap_or_default();
        return Value::Array(items);
    }
    if let Some(v) = obj.get("mapValue") {
        let fields = v
            .get("fields")
            .and_then(|f| f.as_object())
            .map(decode_fields)
            .unwrap_or_default();
        return Value::Object(fields);
    }
    Value::Null
}

pub fn decode_fields(fields: &Map<String, Value>) -> Fields {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), decode_value(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_status_record_fields() {
        let fields = json!({
            "key": "proj1::국내비독점 [라이브]::lezhin",
            "timestamp": 1_700_000_000_000i64,
            "tags": ["a"],
            "meta": { "ok": true }
        });
        let encoded = encode_fields(fields.as_object().unwrap());
        assert_eq!(encoded["key"], json!({ "stringValue": "proj1::국내비독점 [라이브]::lezhin" }));
        assert_eq!(encoded["timestamp"], json!({ "integerValue": "1700000000000" }));
        assert_eq!(encoded["tags"], json!({ "arrayValue": { "values": [{ "stringValue": "a" }] } }));
        assert_eq!(decode_fields(&encoded), *fields.as_object().unwrap());
    }

    #[test]
    fn test_document_from_rest_payload() {
        let doc: FirestoreDocument = serde_json::from_value(json!({
            "name": "projects/demo/databases/(default)/documents/launchStatuses/abc123",
            "fields": {
                "status": { "stringValue": "pending" },
                "timestamp": { "timestampValue": "2024-03-01T00:00:00Z" },
                "note": { "nullValue": null }
            },
            "createTime": "2024-03-01T00:00:00Z"
        }))
        .unwrap();

        let doc = doc.into_document();
        assert_eq!(doc.id, "abc123");
        assert_eq!(doc.field_str("status"), Some("pending"));
        assert_eq!(doc.data["note"], Value::Null);
        assert_eq!(doc.field_str("timestamp"), Some("2024-03-01T00:00:00Z"));
    }

    #[test]
    fn test_equality_query_shape() {
        let body = equality_query("launchStatuses", "key", &json!("proj1-lezhin"));
        let filter = &body["structuredQuery"]["where"]["fieldFilter"];
        assert_eq!(filter["op"], "EQUAL");
        assert_eq!(filter["field"]["fieldPath"], "key");
        assert_eq!(filter["value"]["stringValue"], "proj1-lezhin");
        assert_eq!(body["structuredQuery"]["from"][0]["collectionId"], "launchStatuses");
    }
}
