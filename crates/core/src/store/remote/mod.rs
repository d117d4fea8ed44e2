mod client;
mod mapping;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::config::RemoteConfig;
use crate::error::{StoreError, TaskError, TaskResult, ValidationErrors};
use crate::form::TITLE_FIELD;
use crate::model::{NewTask, SortKey, StatusFilter, Task, TaskId, TaskPatch};
use crate::pipeline;

use super::TaskStore;

pub use client::{
    Condition, ConditionGroup, GroupOperator, Operator, OrderBy, RecordClient, RecordQuery,
    SortDirection,
};

/// Task store backed by a hosted record table.
pub struct RemoteTaskStore {
    client: RecordClient,
    table: String,
}

impl RemoteTaskStore {
    pub fn new(config: RemoteConfig) -> Result<Self, StoreError> {
        let client = RecordClient::new(config.base_url, config.api_key)?;
        Ok(Self::with_client(client, config.table))
    }

    pub fn with_client(client: RecordClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    fn base_query(&self) -> RecordQuery {
        RecordQuery::select(mapping::TASK_FIELDS)
    }

    async fn fetch(&self, query: RecordQuery) -> TaskResult<Vec<Task>> {
        let values: Vec<Value> = self.client.fetch_records(&self.table, &query).await?;
        Ok(mapping::decode_tasks(values)?)
    }

    async fn require(&self, id: TaskId) -> TaskResult<Task> {
        self.get_by_id(id).await?.ok_or(TaskError::NotFound(id))
    }
}

#[async_trait]
impl TaskStore for RemoteTaskStore {
    async fn get_all(&self) -> TaskResult<Vec<Task>> {
        let query = self
            .base_query()
            .order(mapping::CREATED_AT, SortDirection::Desc);
        self.fetch(query).await
    }

    async fn get_by_id(&self, id: TaskId) -> TaskResult<Option<Task>> {
        let query = self
            .base_query()
            .filter(Condition::equal_to(mapping::ID, id));
        Ok(self.fetch(query).await?.into_iter().next())
    }

    async fn create(&self, data: NewTask) -> TaskResult<Task> {
        if data.title.trim().is_empty() {
            return Err(ValidationErrors::single(TITLE_FIELD, "Task title is required").into());
        }

        let record = mapping::new_record(&data, Utc::now());
        let created = self
            .client
            .create_records(&self.table, &[record])
            .await?
            .ok_or_else(|| StoreError::Protocol("create returned no record".into()))?;
        let task = mapping::decode_task(created)?;
        tracing::debug!(task_id = task.id, table = self.table.as_str(), "created remote task");
        Ok(task)
    }

    async fn update(&self, id: TaskId, patch: TaskPatch) -> TaskResult<Task> {
        if matches!(&patch.title, Some(title) if title.trim().is_empty()) {
            return Err(ValidationErrors::single(TITLE_FIELD, "Task title is required").into());
        }

        let current = self.require(id).await?;
        if patch.is_empty() {
            return Ok(current);
        }

        let record = mapping::patch_record(&current, &patch, Utc::now());
        let updated = self
            .client
            .update_records(&self.table, &[record])
            .await?
            .ok_or_else(|| StoreError::Protocol("update returned no record".into()))?;
        let task = mapping::decode_task(updated)?;
        tracing::debug!(task_id = id, completed = task.completed, "updated remote task");
        Ok(task)
    }

    async fn delete(&self, id: TaskId) -> TaskResult<Task> {
        let current = self.require(id).await?;
        self.client.delete_records(&self.table, &[id]).await?;
        tracing::debug!(task_id = id, "deleted remote task");
        Ok(current)
    }

    async fn search(&self, query: &str) -> TaskResult<Vec<Task>> {
        let needle = query.trim();
        if needle.is_empty() {
            return self.get_all().await;
        }

        let query = self
            .base_query()
            .group(ConditionGroup::any(vec![
                Condition::contains(mapping::TITLE, needle),
                Condition::contains(mapping::DESCRIPTION, needle),
            ]))
            .order(mapping::CREATED_AT, SortDirection::Desc);
        self.fetch(query).await
    }

    async fn filter(&self, status: StatusFilter, sort: SortKey) -> TaskResult<Vec<Task>> {
        let mut query = self.base_query();
        match status {
            StatusFilter::All => {}
            StatusFilter::Active => {
                query = query.filter(Condition::equal_to(mapping::COMPLETED, false));
            }
            StatusFilter::Completed => {
                query = query.filter(Condition::equal_to(mapping::COMPLETED, true));
            }
        }
        query = query.order(mapping::sort_field(sort), SortDirection::Asc);

        // Server order is a hint only: priority sorts as text there and nulls are unplaced.
        let mut tasks = self.fetch(query).await?;
        pipeline::sort_tasks(&mut tasks, sort);
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const QUERY_PATH: &str = "/tables/task/records/query";
    const RECORDS_PATH: &str = "/tables/task/records";

    fn store(server: &ServerGuard) -> RemoteTaskStore {
        RemoteTaskStore::new(RemoteConfig {
            base_url: server.url(),
            api_key: Some("test-key".into()),
            table: "task".into(),
        })
        .unwrap()
    }

    fn record(id: u64, title: &str, completed: bool) -> serde_json::Value {
        json!({
            "Id": id,
            "title": title,
            "description": "",
            "priority": "medium",
            "due_date": null,
            "completed": completed,
            "created_at": format!("2024-05-0{}T08:00:00Z", id),
            "completed_at": if completed { json!("2024-05-09T08:00:00Z") } else { json!(null) }
        })
    }

    async fn mock_lookup(
        server: &mut ServerGuard,
        id: u64,
        data: serde_json::Value,
    ) -> mockito::Mock {
        server
            .mock("POST", QUERY_PATH)
            .match_body(Matcher::PartialJson(json!({
                "where": [{"fieldName": "Id", "operator": "EqualTo", "values": [id]}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"success": true, "data": data}).to_string())
            .create_async()
            .await
    }

    #[tokio::test]
    async fn get_all_sends_projection_and_decodes_records() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", QUERY_PATH)
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({
                "fields": ["Id", "title", "description", "priority", "due_date", "completed", "created_at", "completed_at"],
                "orderBy": [{"fieldName": "created_at", "sortType": "DESC"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"success": true, "data": [record(2, "Walk dog", true), record(1, "Buy milk", false)]})
                    .to_string(),
            )
            .create_async()
            .await;

        let tasks = store(&server).get_all().await.unwrap();

        mock.assert_async().await;
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "Walk dog");
        assert!(tasks[0].completed_at.is_some());
        assert_eq!(tasks[1].completed_at, None);
    }

    #[tokio::test]
    async fn failed_envelope_is_reported_as_unavailable() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", QUERY_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":false,"message":"table offline"}"#)
            .create_async()
            .await;

        let err = store(&server).get_all().await.unwrap_err();
        match err {
            TaskError::Store(StoreError::Unavailable(message)) => {
                assert_eq!(message, "table offline")
            }
            other => panic!("expected unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn http_error_status_is_reported_as_unavailable() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", QUERY_PATH)
            .with_status(503)
            .with_body(r#"{"success":false,"message":"maintenance"}"#)
            .create_async()
            .await;

        let err = store(&server).get_all().await.unwrap_err();
        assert!(matches!(
            err,
            TaskError::Store(StoreError::Unavailable(ref m)) if m.contains("maintenance")
        ));
    }

    #[tokio::test]
    async fn get_by_id_returns_none_for_empty_result() {
        let mut server = Server::new_async().await;
        let _mock = mock_lookup(&mut server, 7, json!([])).await;

        assert_eq!(store(&server).get_by_id(7).await.unwrap(), None);
    }

    #[tokio::test]
    async fn create_posts_storage_record_and_returns_first_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", RECORDS_PATH)
            .match_body(Matcher::PartialJson(json!({
                "records": [{"title": "Buy milk", "completed": false, "completed_at": null, "priority": "medium"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "success": true,
                    "results": [
                        {"success": false, "message": "shadow copy rejected"},
                        {"success": true, "data": record(1, "Buy milk", false)}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let task = store(&server)
            .create(NewTask::titled("  Buy milk "))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(task.id, 1);
        assert!(!task.completed);
        assert_eq!(task.completed_at, None);
    }

    #[tokio::test]
    async fn create_rejects_blank_title_without_a_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", RECORDS_PATH)
            .expect(0)
            .create_async()
            .await;

        let err = store(&server).create(NewTask::titled(" ")).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, TaskError::Validation(_)));
    }

    #[tokio::test]
    async fn rejected_create_surfaces_batch_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", RECORDS_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "success": true,
                    "results": [{"success": false, "errors": [{"fieldLabel": "title", "message": "too long"}]}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let err = store(&server).create(NewTask::titled("x")).await.unwrap_err();
        assert!(matches!(err, TaskError::Store(StoreError::Batch(ref f)) if f.len() == 1));
    }

    #[tokio::test]
    async fn update_derives_completed_at_from_current_record() {
        let mut server = Server::new_async().await;
        let _lookup = mock_lookup(&mut server, 1, json!([record(1, "Buy milk", false)])).await;
        let update = server
            .mock("PATCH", RECORDS_PATH)
            .match_body(Matcher::PartialJson(json!({
                "records": [{"Id": 1, "completed": true}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"success": true, "results": [{"success": true, "data": record(1, "Buy milk", true)}]})
                    .to_string(),
            )
            .create_async()
            .await;

        let task = store(&server)
            .update(1, TaskPatch::completion(true))
            .await
            .unwrap();

        update.assert_async().await;
        assert!(task.completed);
        assert!(task.completed_at.is_some());
    }

    #[tokio::test]
    async fn empty_patch_returns_current_record_without_writing() {
        let mut server = Server::new_async().await;
        let lookup = mock_lookup(&mut server, 1, json!([record(1, "Buy milk", false)])).await;
        let update = server
            .mock("PATCH", RECORDS_PATH)
            .expect(0)
            .create_async()
            .await;

        let task = store(&server).update(1, TaskPatch::default()).await.unwrap();

        lookup.assert_async().await;
        update.assert_async().await;
        let current = mapping::decode_task(record(1, "Buy milk", false)).unwrap();
        assert_eq!(task, current);
    }

    #[tokio::test]
    async fn update_and_delete_of_missing_task_fail_with_not_found() {
        let mut server = Server::new_async().await;
        let _lookup = mock_lookup(&mut server, 99, json!([])).await;
        let writes = server
            .mock("DELETE", RECORDS_PATH)
            .expect(0)
            .create_async()
            .await;

        let remote = store(&server);
        let err = remote.delete(99).await.unwrap_err();
        assert!(matches!(err, TaskError::NotFound(99)));
        let err = remote.update(99, TaskPatch::completion(true)).await.unwrap_err();
        assert!(matches!(err, TaskError::NotFound(99)));
        writes.assert_async().await;
    }

    #[tokio::test]
    async fn delete_returns_the_removed_record() {
        let mut server = Server::new_async().await;
        let _lookup = mock_lookup(&mut server, 2, json!([record(2, "Walk dog", false)])).await;
        let delete = server
            .mock("DELETE", RECORDS_PATH)
            .match_body(Matcher::Json(json!({"recordIds": [2]})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"success": true, "results": [{"success": true}]}).to_string())
            .create_async()
            .await;

        let removed = store(&server).delete(2).await.unwrap();

        delete.assert_async().await;
        assert_eq!(removed.title, "Walk dog");
    }

    #[tokio::test]
    async fn search_sends_or_group_over_title_and_description() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", QUERY_PATH)
            .match_body(Matcher::PartialJson(json!({
                "whereGroups": [{
                    "operator": "OR",
                    "conditions": [
                        {"fieldName": "title", "operator": "Contains", "values": ["milk"]},
                        {"fieldName": "description", "operator": "Contains", "values": ["milk"]}
                    ]
                }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"success": true, "data": [record(1, "Buy milk", false)]}).to_string())
            .create_async()
            .await;

        let found = store(&server).search(" milk ").await.unwrap();

        mock.assert_async().await;
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn filter_applies_status_clause_and_shared_ordering() {
        let mut server = Server::new_async().await;
        let mut low = record(1, "low", false);
        low["priority"] = json!("low");
        let mut high = record(2, "high", false);
        high["priority"] = json!("high");
        let mock = server
            .mock("POST", QUERY_PATH)
            .match_body(Matcher::PartialJson(json!({
                "where": [{"fieldName": "completed", "operator": "EqualTo", "values": [false]}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"success": true, "data": [low, high]}).to_string())
            .create_async()
            .await;

        let tasks = store(&server)
            .filter(StatusFilter::Active, SortKey::Priority)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            tasks.iter().map(|task| task.id).collect::<Vec<_>>(),
            vec![2, 1]
        );
    }
}
