use super::{Gateway, GatewayError};
use crate::{
    config::Connection,
    jobs::{Job, JobId, RunHandle, RunId, RunState},
    uc::{ObjectKind, SchemaName, UcObject},
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use std::{collections::BTreeMap, time::Duration};
use tracing::{debug, trace};

const JOBS_PAGE_SIZE: &str = "100";

/// Databricks REST API client for the jobs and Unity Catalog endpoints
pub struct DatabricksGateway {
    client: Client,
    host: String,
    token: String,
    profile: Option<String>,
    timeout: Duration,
}

impl DatabricksGateway {
    /// # Errors
    ///
    /// Returns `GatewayError::Transport` if the HTTP client cannot be built
    pub fn new(connection: &Connection, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            host: connection.host.clone(),
            token: connection.token.clone(),
            profile: connection.profile.clone(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.host)
    }

    /// `/api/2.1/unity-catalog/<collection>/<full_name>`, with the name encoded
    fn object_url(&self, object: &UcObject) -> Result<Url, GatewayError> {
        let collection = match object.kind {
            ObjectKind::Catalog => "catalogs",
            ObjectKind::Schema => "schemas",
            ObjectKind::Table | ObjectKind::View => "tables",
        };
        let mut url = Url::parse(&self.url(&format!("/api/2.1/unity-catalog/{collection}")))
            .map_err(|e| GatewayError::Transport(format!("invalid host '{}': {e}", self.host)))?;
        url.path_segments_mut()
            .map_err(|()| GatewayError::Transport(format!("invalid host '{}'", self.host)))?
            .push(&object.full_name());
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<String, GatewayError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(&e))?;
        trace!(%status, body_len = body.len(), "response");

        if status.is_success() {
            Ok(body)
        } else {
            Err(map_status(status, &body, self.profile.as_deref()))
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        debug!(path, "GET");
        let body = self.send(self.client.get(self.url(path)).query(query)).await?;
        decode(&body)
    }

    /// Follow `next_page_token` until the listing is exhausted
    async fn paginate<P, T>(
        &self,
        path: &str,
        query: &[(&str, String)],
        split: impl Fn(P) -> (Vec<T>, Option<String>),
    ) -> Result<Vec<T>, GatewayError>
    where
        P: DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut params = query.to_vec();
            if let Some(token) = page_token.take() {
                params.push(("page_token", token));
            }
            let (page, next) = split(self.get(path, &params).await?);
            items.extend(page);
            match next {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(items)
    }

    fn transport_error(&self, err: &reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout(self.timeout.as_secs())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

#[derive(Deserialize)]
struct ApiError {
    error_code: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct JobsPage {
    #[serde(default)]
    jobs: Vec<BaseJob>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct BaseJob {
    job_id: JobId,
    settings: Option<JobSettings>,
}

#[derive(Deserialize)]
struct JobSettings {
    name: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct RunNow {
    run_id: RunId,
}

#[derive(Deserialize)]
struct Run {
    #[serde(default)]
    state: RunStatus,
}

#[derive(Deserialize, Default)]
struct RunStatus {
    life_cycle_state: Option<String>,
    result_state: Option<String>,
}

#[derive(Deserialize)]
struct Me {
    #[serde(rename = "userName")]
    user_name: String,
}

#[derive(Deserialize)]
struct CatalogsPage {
    #[serde(default)]
    catalogs: Vec<CatalogInfo>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct CatalogInfo {
    name: String,
    owner: Option<String>,
}

#[derive(Deserialize)]
struct SchemasPage {
    #[serde(default)]
    schemas: Vec<SchemaInfo>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct SchemaInfo {
    name: String,
    catalog_name: String,
    owner: Option<String>,
}

#[derive(Deserialize)]
struct TablesPage {
    #[serde(default)]
    tables: Vec<TableInfo>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct TableInfo {
    name: String,
    catalog_name: String,
    schema_name: String,
    owner: Option<String>,
    table_type: Option<String>,
}

impl From<TableInfo> for UcObject {
    fn from(info: TableInfo) -> Self {
        let schema = SchemaName {
            catalog: info.catalog_name,
            schema: info.schema_name,
        };
        let table = Self::table(&schema, info.name, info.owner);
        match info.table_type {
            Some(table_type) => table.with_table_type(table_type),
            None => table,
        }
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, GatewayError> {
    serde_json::from_str(body).map_err(|e| GatewayError::Decode(e.to_string()))
}

/// Map a non-2xx response onto the error taxonomy, keeping the server's
/// message verbatim
pub(crate) fn map_status(status: StatusCode, body: &str, profile: Option<&str>) -> GatewayError {
    let (code, message) = match serde_json::from_str::<ApiError>(body) {
        Ok(err) => (err.error_code, err.message),
        Err(_) => (None, None),
    };
    let message = message
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP {status}"));

    match status {
        StatusCode::UNAUTHORIZED => {
            let login = profile.map_or_else(
                || "databricks auth login".to_string(),
                |p| format!("databricks auth login --profile {p}"),
            );
            GatewayError::Auth(format!("{message}. Re-authenticate with:\n  $ {login}"))
        }
        StatusCode::FORBIDDEN => GatewayError::PermissionDenied(message),
        StatusCode::NOT_FOUND => GatewayError::NotFound(message),
        _ => GatewayError::Api {
            status: status.as_u16(),
            code,
            message,
        },
    }
}

/// Collapse the life-cycle and result states of a run
pub(crate) fn map_run_state(life_cycle: Option<&str>, result: Option<&str>) -> RunState {
    match life_cycle.unwrap_or_default() {
        "RUNNING" | "TERMINATING" => RunState::Running,
        "TERMINATED" => match result.unwrap_or_default() {
            "SUCCESS" | "SUCCESS_WITH_FAILURES" => RunState::Succeeded,
            "CANCELED" => RunState::Cancelled,
            _ => RunState::Failed,
        },
        "SKIPPED" => RunState::Cancelled,
        "INTERNAL_ERROR" => RunState::Failed,
        _ => RunState::Pending,
    }
}

#[async_trait]
impl Gateway for DatabricksGateway {
    async fn list_jobs(&self) -> Result<Vec<Job>, GatewayError> {
        let jobs = self
            .paginate(
                "/api/2.1/jobs/list",
                &[("limit", JOBS_PAGE_SIZE.to_string())],
                |page: JobsPage| (page.jobs, page.next_page_token),
            )
            .await?;

        Ok(jobs
            .into_iter()
            .filter_map(|job| {
                let settings = job.settings?;
                let name = settings.name.filter(|n| !n.is_empty())?;
                Some(Job {
                    id: job.job_id,
                    name,
                    tags: settings.tags,
                })
            })
            .collect())
    }

    async fn trigger_run(&self, job_id: JobId) -> Result<RunHandle, GatewayError> {
        let request = self
            .client
            .post(self.url("/api/2.1/jobs/run-now"))
            .json(&json!({ "job_id": job_id }));
        let run: RunNow = decode(&self.send(request).await?)?;
        Ok(RunHandle::pending(job_id, run.run_id))
    }

    async fn get_run_state(&self, run_id: RunId) -> Result<RunState, GatewayError> {
        let run: Run = self
            .get("/api/2.1/jobs/runs/get", &[("run_id", run_id.to_string())])
            .await?;
        Ok(map_run_state(
            run.state.life_cycle_state.as_deref(),
            run.state.result_state.as_deref(),
        ))
    }

    async fn current_user(&self) -> Result<String, GatewayError> {
        let me: Me = self.get("/api/2.0/preview/scim/v2/Me", &[]).await?;
        Ok(me.user_name)
    }

    async fn list_catalogs(&self) -> Result<Vec<UcObject>, GatewayError> {
        let catalogs = self
            .paginate(
                "/api/2.1/unity-catalog/catalogs",
                &[],
                |page: CatalogsPage| (page.catalogs, page.next_page_token),
            )
            .await?;
        Ok(catalogs
            .into_iter()
            .map(|c| UcObject::catalog(c.name, c.owner))
            .collect())
    }

    async fn list_schemas(&self, catalog: &str) -> Result<Vec<UcObject>, GatewayError> {
        let schemas = self
            .paginate(
                "/api/2.1/unity-catalog/schemas",
                &[("catalog_name", catalog.to_string())],
                |page: SchemasPage| (page.schemas, page.next_page_token),
            )
            .await?;
        Ok(schemas
            .into_iter()
            .map(|s| UcObject::schema(s.catalog_name, s.name, s.owner))
            .collect())
    }

    async fn list_tables(
        &self,
        catalog: &str,
        schema: &str,
    ) -> Result<Vec<UcObject>, GatewayError> {
        let tables = self
            .paginate(
                "/api/2.1/unity-catalog/tables",
                &[
                    ("catalog_name", catalog.to_string()),
                    ("schema_name", schema.to_string()),
                ],
                |page: TablesPage| (page.tables, page.next_page_token),
            )
            .await?;
        Ok(tables.into_iter().map(UcObject::from).collect())
    }

    async fn set_owner(&self, object: &UcObject, principal: &str) -> Result<(), GatewayError> {
        let url = self.object_url(object)?;
        debug!(%url, principal, "PATCH owner");
        self.send(self.client.patch(url).json(&json!({ "owner": principal })))
            .await?;
        Ok(())
    }

    async fn delete_object(&self, object: &UcObject, force: bool) -> Result<(), GatewayError> {
        let url = self.object_url(object)?;
        debug!(%url, force, "DELETE");
        let mut request = self.client.delete(url);
        if force && object.kind != ObjectKind::Table && object.kind != ObjectKind::View {
            request = request.query(&[("force", "true")]);
        }
        self.send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn gateway(host: &str) -> DatabricksGateway {
        let connection = Connection {
            host: host.to_string(),
            token: "dapi-test".to_string(),
            profile: Some("prod".to_string()),
        };
        DatabricksGateway::new(&connection, Duration::from_secs(30)).unwrap()
    }

    #[test]
    fn test_map_run_state_life_cycle() {
        for pending in ["PENDING", "QUEUED", "BLOCKED", "WAITING_FOR_RETRY"] {
            assert_eq!(map_run_state(Some(pending), None), RunState::Pending);
        }
        assert_eq!(map_run_state(Some("RUNNING"), None), RunState::Running);
        assert_eq!(map_run_state(Some("TERMINATING"), None), RunState::Running);
        assert_eq!(map_run_state(Some("SKIPPED"), None), RunState::Cancelled);
        assert_eq!(map_run_state(Some("INTERNAL_ERROR"), None), RunState::Failed);
        assert_eq!(map_run_state(None, None), RunState::Pending);
    }

    #[test]
    fn test_map_run_state_terminated() {
        let terminated = |result| map_run_state(Some("TERMINATED"), Some(result));
        assert_eq!(terminated("SUCCESS"), RunState::Succeeded);
        assert_eq!(terminated("SUCCESS_WITH_FAILURES"), RunState::Succeeded);
        assert_eq!(terminated("CANCELED"), RunState::Cancelled);
        assert_eq!(terminated("FAILED"), RunState::Failed);
        assert_eq!(terminated("TIMEDOUT"), RunState::Failed);
        assert_eq!(map_run_state(Some("TERMINATED"), None), RunState::Failed);
    }

    #[test]
    fn test_map_status_keeps_message() {
        let body = r#"{"error_code":"RESOURCE_CONFLICT","message":"Table is locked by another operation"}"#;
        assert_eq!(
            map_status(StatusCode::CONFLICT, body, None),
            GatewayError::Api {
                status: 409,
                code: Some("RESOURCE_CONFLICT".into()),
                message: "Table is locked by another operation".into(),
            }
        );
        let err = map_status(StatusCode::BAD_REQUEST, body, None);
        assert_eq!(err.to_string(), "Table is locked by another operation");
    }

    #[test]
    fn test_map_status_taxonomy() {
        let body = r#"{"message":"nope"}"#;
        assert_eq!(
            map_status(StatusCode::FORBIDDEN, body, None),
            GatewayError::PermissionDenied("nope".into())
        );
        assert_eq!(
            map_status(StatusCode::NOT_FOUND, body, None),
            GatewayError::NotFound("nope".into())
        );
        match map_status(StatusCode::UNAUTHORIZED, body, Some("prod")) {
            GatewayError::Auth(msg) => assert!(msg.contains("databricks auth login --profile prod")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_map_status_without_json_body() {
        match map_status(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>", None) {
            GatewayError::Api { status, code, message } => {
                assert_eq!(status, 502);
                assert!(code.is_none());
                assert!(message.contains("502"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_object_url() {
        let gw = gateway("https://adb-1.azuredatabricks.net");
        let schema: SchemaName = "main.sales".parse().unwrap();

        let table = UcObject::table(&schema, "t1", None);
        assert_eq!(
            gw.object_url(&table).unwrap().as_str(),
            "https://adb-1.azuredatabricks.net/api/2.1/unity-catalog/tables/main.sales.t1"
        );

        let schema = UcObject::schema("main", "sales", None);
        assert_eq!(
            gw.object_url(&schema).unwrap().path(),
            "/api/2.1/unity-catalog/schemas/main.sales"
        );

        let odd = UcObject::table(&"main.sales".parse().unwrap(), "my table", None);
        assert!(gw.object_url(&odd).unwrap().path().ends_with("main.sales.my%20table"));
    }

    #[test]
    fn test_decode_jobs_page() {
        let body = r#"{
            "jobs": [
                {"job_id": 1, "settings": {"name": "python-etl", "tags": {"team": "data"}}},
                {"job_id": 2, "settings": {}},
                {"job_id": 3}
            ],
            "has_more": true,
            "next_page_token": "abc"
        }"#;
        let page: JobsPage = decode(body).unwrap();
        assert_eq!(page.jobs.len(), 3);
        assert_eq!(page.next_page_token.as_deref(), Some("abc"));
        let first = page.jobs.into_iter().next().unwrap().settings.unwrap();
        assert_eq!(first.tags.get("team").map(String::as_str), Some("data"));
    }

    #[test]
    fn test_table_info_into_object() {
        let info: TableInfo = decode(
            r#"{"name":"v1","catalog_name":"main","schema_name":"sales","owner":"svc","table_type":"VIEW"}"#,
        )
        .unwrap();
        let object = UcObject::from(info);
        assert_eq!(object.full_name(), "main.sales.v1");
        assert_eq!(object.kind, ObjectKind::View);
        assert_eq!(object.owner.as_deref(), Some("svc"));
    }

    #[test]
    fn test_decode_error() {
        assert!(matches!(decode::<Run>("not json"), Err(GatewayError::Decode(_))));
    }
}
