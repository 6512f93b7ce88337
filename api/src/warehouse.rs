use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::WarehouseConfig;
use crate::upstream::UpstreamError;

const SERVICE: &str = "warehouse";
const MAX_RESULTS: u32 = 1_000;

/// One named query parameter in the warehouse wire format. Values always
/// travel as strings; the warehouse casts them using the declared type.
#[derive(Debug, Clone, Serialize)]
pub struct QueryParameter {
    name: &'static str,
    #[serde(rename = "parameterType")]
    parameter_type: ParameterType,
    #[serde(rename = "parameterValue")]
    parameter_value: ParameterValue,
}

#[derive(Debug, Clone, Serialize)]
struct ParameterType {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Clone, Serialize)]
struct ParameterValue {
    value: String,
}

impl QueryParameter {
    pub fn string(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            parameter_type: ParameterType { kind: "STRING" },
            parameter_value: ParameterValue {
                value: value.into(),
            },
        }
    }

    pub fn int64(name: &'static str, value: i64) -> Self {
        Self {
            name,
            parameter_type: ParameterType { kind: "INT64" },
            parameter_value: ParameterValue {
                value: value.to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a str,
    use_legacy_sql: bool,
    parameter_mode: &'a str,
    query_parameters: &'a [QueryParameter],
    timeout_ms: u64,
    max_results: u32,
}

/// Synchronous query response. Cells arrive positionally under `rows[].f[].v`
/// and are matched to column names through `schema.fields` by index.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Vec<TableRow>,
}

#[derive(Debug, Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<TableField>,
}

#[derive(Debug, Deserialize)]
struct TableField {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    #[serde(default)]
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    #[serde(default)]
    v: Value,
}

/// Client for the warehouse's synchronous query endpoint.
#[derive(Clone)]
pub struct WarehouseClient {
    base_url: String,
    project: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl WarehouseClient {
    pub fn new(config: &WarehouseConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("hearth-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build HTTP client");
        Self {
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
            project: config.project.clone(),
            timeout: config.timeout,
            http,
        }
    }

    /// Run a parameterized SQL query and return rows keyed by column name.
    /// Cell values come back exactly as the warehouse sent them (usually
    /// strings); callers own the coercion.
    pub async fn query(
        &self,
        sql: &str,
        params: &[QueryParameter],
    ) -> Result<Vec<Map<String, Value>>, UpstreamError> {
        let url = format!("{}/projects/{}/queries", self.base_url, self.project);
        let request = QueryRequest {
            query: sql,
            use_legacy_sql: false,
            parameter_mode: "NAMED",
            query_parameters: params,
            timeout_ms: self.timeout.as_millis() as u64,
            max_results: MAX_RESULTS,
        };
        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|err| UpstreamError::from_reqwest(SERVICE, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                service: SERVICE,
                status: status.as_u16(),
            });
        }
        let decoded: QueryResponse = response
            .json()
            .await
            .map_err(|_| UpstreamError::Decode { service: SERVICE })?;
        if !decoded.job_complete {
            return Err(UpstreamError::Protocol {
                service: SERVICE,
                detail: "query did not complete within the warehouse deadline".to_string(),
            });
        }
        Ok(flatten_rows(&decoded))
    }
}

/// Zip positional cells with schema field names. Ragged rows are padded with
/// nulls; cells beyond the schema are dropped.
fn flatten_rows(response: &QueryResponse) -> Vec<Map<String, Value>> {
    let fields = response
        .schema
        .as_ref()
        .map(|schema| schema.fields.as_slice())
        .unwrap_or(&[]);
    response
        .rows
        .iter()
        .map(|row| {
            let mut record = Map::new();
            for (index, field) in fields.iter().enumerate() {
                let value = row
                    .f
                    .get(index)
                    .map(|cell| cell.v.clone())
                    .unwrap_or(Value::Null);
                record.insert(field.name.clone(), value);
            }
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(raw: Value) -> QueryResponse {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn rows_are_keyed_by_schema_field_names() {
        let response = decode(json!({
            "jobComplete": true,
            "schema": {"fields": [{"name": "month", "type": "STRING"}, {"name": "value", "type": "FLOAT64"}]},
            "rows": [
                {"f": [{"v": "2026-07"}, {"v": "482500.0"}]},
                {"f": [{"v": "2026-08"}, {"v": "479900.0"}]}
            ]
        }));
        let rows = flatten_rows(&response);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["month"], json!("2026-07"));
        assert_eq!(rows[1]["value"], json!("479900.0"));
    }

    #[test]
    fn ragged_rows_pad_with_null() {
        let response = decode(json!({
            "jobComplete": true,
            "schema": {"fields": [{"name": "a"}, {"name": "b"}]},
            "rows": [{"f": [{"v": "1"}]}, {"f": [{"v": "1"}, {"v": "2"}, {"v": "3"}]}]
        }));
        let rows = flatten_rows(&response);
        assert_eq!(rows[0]["b"], Value::Null);
        // Cell beyond the schema is dropped.
        assert_eq!(rows[1].len(), 2);
    }

    #[test]
    fn missing_schema_yields_empty_records() {
        let response = decode(json!({"jobComplete": true, "rows": [{"f": [{"v": "x"}]}]}));
        let rows = flatten_rows(&response);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_empty());
    }

    #[test]
    fn parameters_serialize_in_wire_format() {
        let param = QueryParameter::int64("months", 12);
        let encoded = serde_json::to_value(&param).unwrap();
        assert_eq!(
            encoded,
            json!({
                "name": "months",
                "parameterType": {"type": "INT64"},
                "parameterValue": {"value": "12"}
            })
        );
    }
}
