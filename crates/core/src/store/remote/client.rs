use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FieldError, RecordFailure, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operator {
    EqualTo,
    Contains,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub field_name: String,
    pub operator: Operator,
    pub values: Vec<Value>,
}

impl Condition {
    pub fn equal_to(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field_name: field.to_string(),
            operator: Operator::EqualTo,
            values: vec![value.into()],
        }
    }

    pub fn contains(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field_name: field.to_string(),
            operator: Operator::Contains,
            values: vec![value.into()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupOperator {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionGroup {
    pub operator: GroupOperator,
    pub conditions: Vec<Condition>,
}

impl ConditionGroup {
    pub fn any(conditions: Vec<Condition>) -> Self {
        Self {
            operator: GroupOperator::Or,
            conditions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBy {
    pub field_name: String,
    pub sort_type: SortDirection,
}

/// Projection, filtering and ordering for a record fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordQuery {
    pub fields: Vec<String>,
    #[serde(rename = "where", skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub where_groups: Vec<ConditionGroup>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderBy>,
}

impl RecordQuery {
    pub fn select(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|field| field.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn group(mut self, group: ConditionGroup) -> Self {
        self.where_groups.push(group);
        self
    }

    pub fn order(mut self, field: &str, direction: SortDirection) -> Self {
        self.order_by.push(OrderBy {
            field_name: field.to_string(),
            sort_type: direction,
        });
        self
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    results: Vec<RecordResult>,
}

#[derive(Debug, Deserialize)]
struct RecordResult {
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<RecordFieldError>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordFieldError {
    #[serde(default)]
    field_label: Option<String>,
    message: String,
}

#[derive(Debug, Serialize)]
struct WriteRequest<'a> {
    records: &'a [Value],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRequest<'a> {
    record_ids: &'a [u64],
}

pub struct RecordClient {
    base_url: String,
    api_key: Option<String>,
    http: Client,
}

impl RecordClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, StoreError> {
        let http = Client::builder()
            .user_agent(concat!("taskflow/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(base_url, api_key, http))
    }

    pub fn with_client(base_url: impl Into<String>, api_key: Option<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            http,
        }
    }

    fn records_url(&self, table: &str) -> String {
        format!(
            "{}/tables/{}/records",
            self.base_url.trim_end_matches('/'),
            table
        )
    }

    pub async fn fetch_records<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &RecordQuery,
    ) -> Result<Vec<T>, StoreError> {
        let url = format!("{}/query", self.records_url(table));
        let response: ApiResponse<Vec<T>> = self.send(Method::POST, &url, query).await?;
        if !response.success {
            return Err(StoreError::Unavailable(
                response
                    .message
                    .unwrap_or_else(|| format!("failed to fetch {} records", table)),
            ));
        }
        Ok(response.data.unwrap_or_default())
    }

    pub async fn create_records(
        &self,
        table: &str,
        records: &[Value],
    ) -> Result<Option<Value>, StoreError> {
        let url = self.records_url(table);
        let response = self
            .send(Method::POST, &url, &WriteRequest { records })
            .await?;
        first_success(table, "create", response)
    }

    pub async fn update_records(
        &self,
        table: &str,
        records: &[Value],
    ) -> Result<Option<Value>, StoreError> {
        let url = self.records_url(table);
        let response = self
            .send(Method::PATCH, &url, &WriteRequest { records })
            .await?;
        first_success(table, "update", response)
    }

    pub async fn delete_records(
        &self,
        table: &str,
        record_ids: &[u64],
    ) -> Result<Option<Value>, StoreError> {
        let url = self.records_url(table);
        let response = self
            .send(Method::DELETE, &url, &DeleteRequest { record_ids })
            .await?;
        first_success(table, "delete", response)
    }

    async fn send<B, T>(&self, method: Method, url: &str, body: &B) -> Result<T, StoreError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!(%method, url, "record api request");
        let mut request = self.http.request(method, url).json(body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ApiResponse<Value>>(&text)
                .ok()
                .and_then(|body| body.message)
                .unwrap_or(text);
            return Err(StoreError::Unavailable(format!("{}: {}", status, message)));
        }

        serde_json::from_str(&text).map_err(|err| StoreError::Protocol(err.to_string()))
    }
}

/// Report every rejected record and hand back the first accepted one.
fn first_success(
    table: &str,
    action: &str,
    response: BatchResponse,
) -> Result<Option<Value>, StoreError> {
    if !response.success {
        return Err(StoreError::Unavailable(response.message.unwrap_or_else(|| {
            format!("failed to {} {} records", action, table)
        })));
    }

    let mut failures = Vec::new();
    let mut accepted = Vec::new();
    for (index, result) in response.results.into_iter().enumerate() {
        if result.success {
            accepted.push(result.data);
            continue;
        }
        let failure = RecordFailure {
            index,
            message: result.message,
            fields: result
                .errors
                .into_iter()
                .map(|error| {
                    FieldError::new(error.field_label.unwrap_or_default(), error.message)
                })
                .collect(),
        };
        tracing::error!(table, action, failure = %failure, "record rejected");
        failures.push(failure);
    }

    if accepted.is_empty() && !failures.is_empty() {
        return Err(StoreError::Batch(failures));
    }
    Ok(accepted.into_iter().next().flatten())
}
