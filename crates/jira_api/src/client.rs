use crate::auth::basic_authorization;
use crate::config::JiraConfig;
use crate::error::{JiraError, Result};
use crate::models::{
    IssueCreateRequest, LabelsUpdateRequest, TransitionExecuteRequest, WorklogCreateRequest,
};
use crate::result::RequestResult;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Gateway to the Jira REST API. Every call resolves to a [`RequestResult`];
/// transport and HTTP failures are folded into the envelope instead of being
/// returned as errors.
#[derive(Clone)]
pub struct JiraClient {
    http: HttpClient,
    config: JiraConfig,
}

impl JiraClient {
    pub fn new(config: JiraConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(JiraError::Config(
                "Jira server address is not configured".to_string(),
            ));
        }
        let http = build_http_client(&config)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &JiraConfig {
        &self.config
    }

    pub async fn request<B>(&self, method: Method, endpoint: &str, body: Option<&B>) -> RequestResult
    where
        B: Serialize + ?Sized,
    {
        self.send(method, endpoint, &[], body).await
    }

    pub async fn request_with_query<B>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> RequestResult
    where
        B: Serialize + ?Sized,
    {
        self.send(method, endpoint, query, body).await
    }

    async fn send<B>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> RequestResult
    where
        B: Serialize + ?Sized,
    {
        let url = self.url_for(endpoint);
        let log_url = url.split('?').next().unwrap_or(&url).to_string();
        let body_summary = body.map(describe_body).unwrap_or_default();
        debug!("-> Jira API: {} {}{}", method, log_url, body_summary);

        let mut request = self.http.request(method.clone(), url.as_str());
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(payload) = body {
            request = request.json(payload);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                let message = describe_transport_error(&method, &log_url, &err);
                warn!("{}", message);
                return RequestResult::transport_failure(message);
            }
        };

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            debug!("<- Jira API: {} No Content", status.as_u16());
            return RequestResult::no_content(status);
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                let message = describe_transport_error(&method, &log_url, &err);
                warn!("{}", message);
                return RequestResult::transport_failure(message);
            }
        };

        if status.is_success() {
            let result = RequestResult::from_body(status, text);
            if let Some(raw) = &result.raw_text {
                warn!(
                    "Response from {} {} was not JSON (status {}): {}",
                    method,
                    log_url,
                    status.as_u16(),
                    raw.chars().take(100).collect::<String>()
                );
            } else {
                debug!("<- Jira API: {}", status.as_u16());
            }
            result
        } else {
            let result = RequestResult::http_failure(status, &method, &log_url, text);
            warn!(
                "Jira API error: {}",
                result.error_message.as_deref().unwrap_or("unknown")
            );
            result
        }
    }

    fn url_for(&self, endpoint: &str) -> String {
        let mut base = self.config.api_root();
        base.push_str(endpoint.trim_start_matches('/'));
        base
    }

    pub async fn myself(&self) -> RequestResult {
        self.request(Method::GET, "myself", None::<&Value>).await
    }

    pub async fn search_projects(&self) -> RequestResult {
        self.request(Method::GET, "project/search", None::<&Value>).await
    }

    pub async fn create_meta(&self, project_key: &str) -> RequestResult {
        let query = [
            ("projectKeys", project_key.to_string()),
            ("expand", "projects.issuetypes".to_string()),
        ];
        self.request_with_query(Method::GET, "issue/createmeta", &query, None::<&Value>)
            .await
    }

    pub async fn search_issues(&self, jql: &str, fields: &str, max_results: u32) -> RequestResult {
        let query = [
            ("jql", jql.to_string()),
            ("fields", fields.to_string()),
            ("maxResults", max_results.to_string()),
        ];
        self.request_with_query(Method::GET, "search", &query, None::<&Value>)
            .await
    }

    pub async fn create_issue(&self, request: &IssueCreateRequest) -> RequestResult {
        self.request(Method::POST, "issue", Some(request)).await
    }

    pub async fn issue_labels(&self, issue_key: &str) -> RequestResult {
        let path = format!("issue/{}", issue_key);
        let query = [("fields", "labels".to_string())];
        self.request_with_query(Method::GET, &path, &query, None::<&Value>)
            .await
    }

    pub async fn update_labels(&self, issue_key: &str, labels: &[String]) -> RequestResult {
        let path = format!("issue/{}", issue_key);
        self.request(Method::PUT, &path, Some(&LabelsUpdateRequest::new(labels)))
            .await
    }

    pub async fn transitions(&self, issue_key: &str) -> RequestResult {
        let path = format!("issue/{}/transitions", issue_key);
        self.request(Method::GET, &path, None::<&Value>).await
    }

    pub async fn execute_transition(&self, issue_key: &str, transition_id: &str) -> RequestResult {
        let path = format!("issue/{}/transitions", issue_key);
        let payload = TransitionExecuteRequest::new(transition_id);
        self.request(Method::POST, &path, Some(&payload)).await
    }

    pub async fn assign(&self, issue_key: &str, account_id: &str) -> RequestResult {
        let path = format!("issue/{}/assignee", issue_key);
        let payload = AssigneeUpdateRequest { account_id };
        self.request(Method::PUT, &path, Some(&payload)).await
    }

    pub async fn add_worklog(&self, issue_key: &str, entry: &WorklogCreateRequest) -> RequestResult {
        let path = format!("issue/{}/worklog", issue_key);
        self.request(Method::POST, &path, Some(entry)).await
    }
}

fn build_http_client(config: &JiraConfig) -> Result<HttpClient> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        basic_authorization(&config.username, &config.api_token)?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, header_value(&config.user_agent)?);

    HttpClient::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .build()
        .map_err(|err| JiraError::Config(err.to_string()))
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|err| JiraError::Config(err.to_string()))
}

fn describe_transport_error(method: &Method, url: &str, err: &reqwest::Error) -> String {
    let category = if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connection error"
    } else {
        "request error"
    };
    format!("Jira API {} ({} {}): {}", category, method, url, err)
}

/// Short description of a request body for diagnostics; never includes values.
fn describe_body<B>(body: &B) -> String
where
    B: Serialize + ?Sized,
{
    match serde_json::to_value(body) {
        Ok(Value::Object(map)) => {
            if let Some(Value::Object(fields)) = map.get("fields") {
                format!(" with keys: {:?}", fields.keys().collect::<Vec<_>>())
            } else if let Some(Value::Object(transition)) = map.get("transition") {
                let id = transition
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or("?");
                format!(" with transition ID: {}", id)
            } else if map.contains_key("comment") || map.contains_key("timeSpent") {
                " with worklog data".to_string()
            } else {
                " with misc data".to_string()
            }
        }
        Ok(_) => " with misc data".to_string(),
        Err(_) => " with data (non-JSON?)".to_string(),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssigneeUpdateRequest<'a> {
    account_id: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdfDocument, TransitionList};
    use mockito::Matcher;
    use serde_json::json;

    fn client_for(server: &mockito::Server) -> JiraClient {
        JiraClient::new(JiraConfig::new(server.url(), "me@acme.io", "token")).unwrap()
    }

    #[tokio::test]
    async fn no_content_response_is_success_without_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/rest/api/3/issue/FOC-1/assignee")
            .match_header("content-type", "application/json")
            .match_header("authorization", Matcher::Regex("^Basic ".to_string()))
            .match_body(Matcher::Json(json!({"accountId": "acc-1"})))
            .with_status(204)
            .create_async()
            .await;

        let result = client_for(&server).assign("FOC-1", "acc-1").await;

        mock.assert_async().await;
        assert!(result.success);
        assert_eq!(result.status_code, Some(204));
        assert!(result.payload.is_none() && result.raw_text.is_none());
        assert!(result.error_message.is_none());
    }

    #[tokio::test]
    async fn json_response_is_decoded_into_payload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/api/3/issue/FOC-1/transitions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"transitions":[{"id":"11","name":"Start","to":{"name":"In Progress"}}]}"#)
            .create_async()
            .await;

        let result = client_for(&server).transitions("FOC-1").await;

        assert!(result.success);
        let list: TransitionList = result.decode().unwrap();
        assert_eq!(list.transitions[0].id.as_deref(), Some("11"));
        assert_eq!(list.transitions[0].target_name(), Some("In Progress"));
    }

    #[tokio::test]
    async fn non_json_success_falls_back_to_raw_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/api/3/myself")
            .with_status(200)
            .with_body("pong")
            .create_async()
            .await;

        let result = client_for(&server).myself().await;

        assert!(result.success);
        assert_eq!(result.raw_text.as_deref(), Some("pong"));
        assert!(result.payload.is_none());
    }

    #[tokio::test]
    async fn not_found_carries_jira_error_messages() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex("^/rest/api/3/issue/FOC-404".to_string()))
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"errorMessages":["Issue does not exist"],"errors":{}}"#)
            .create_async()
            .await;

        let result = client_for(&server).issue_labels("FOC-404").await;

        assert!(!result.success);
        assert_eq!(result.status_code, Some(404));
        let message = result.error_message.clone().unwrap_or_default();
        assert!(message.contains("Issue does not exist"));
        assert!(!message.contains("fields=labels"));
        assert_eq!(
            result.api_error().map(|body| body.error_messages),
            Some(vec!["Issue does not exist".to_string()])
        );
        assert!(matches!(result.error(), Some(JiraError::Http { .. })));
    }

    #[tokio::test]
    async fn search_encodes_jql_as_query_parameter() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Regex("^/rest/api/3/search".to_string()))
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded(
                    "jql".into(),
                    r#"project = "FOC" ORDER BY updated DESC"#.into(),
                ),
                Matcher::UrlEncoded("fields".into(), "labels".into()),
                Matcher::UrlEncoded("maxResults".into(), "200".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"issues":[],"total":0}"#)
            .create_async()
            .await;

        let result = client_for(&server)
            .search_issues(r#"project = "FOC" ORDER BY updated DESC"#, "labels", 200)
            .await;

        mock.assert_async().await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn create_issue_posts_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/api/3/issue")
            .match_body(Matcher::PartialJson(json!({
                "fields": {"project": {"key": "FOC"}, "issuetype": {"name": "Task"}, "labels": ["a"]}
            })))
            .with_status(201)
            .with_body(r#"{"id":"10001","key":"FOC-9"}"#)
            .create_async()
            .await;

        let request = IssueCreateRequest::new("FOC", "Task", "Summary", AdfDocument::paragraph("d"))
            .with_labels(vec!["a".to_string()]);
        let result = client_for(&server).create_issue(&request).await;

        mock.assert_async().await;
        assert!(result.success);
        assert_eq!(result.status_code, Some(201));
    }

    #[tokio::test]
    async fn connection_failure_has_no_status_code() {
        let client = JiraClient::new(JiraConfig::new("http://127.0.0.1:1", "me", "token")).unwrap();

        let result = client.myself().await;

        assert!(!result.success);
        assert_eq!(result.status_code, None);
        let message = result.error_message.unwrap_or_default();
        assert!(message.starts_with("Jira API connection error"));
        assert!(message.contains("GET http://127.0.0.1:1/rest/api/3/myself"));
    }

    #[tokio::test]
    async fn slow_server_is_reported_as_timeout() {
        // Accepted by the kernel backlog but never answered.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());
        let config = JiraConfig::new(&address, "me", "token")
            .with_timeout(std::time::Duration::from_millis(50));
        let client = JiraClient::new(config).unwrap();

        let result = client.myself().await;
        drop(listener);

        assert!(!result.success);
        assert_eq!(result.status_code, None);
        let message = result.error_message.unwrap_or_default();
        assert!(message.starts_with("Jira API timeout"), "{}", message);
        assert!(message.contains("/rest/api/3/myself"));
    }

    #[test]
    fn empty_server_address_is_rejected() {
        let err = JiraClient::new(JiraConfig::new("  ", "me", "token")).err();
        assert!(matches!(err, Some(JiraError::Config(_))));
    }

    #[test]
    fn body_summary_describes_shape_only() {
        assert_eq!(
            describe_body(&json!({"fields": {"summary": "secret", "labels": []}})),
            r#" with keys: ["labels", "summary"]"#
        );
        assert_eq!(
            describe_body(&TransitionExecuteRequest::new("31")),
            " with transition ID: 31"
        );
        assert_eq!(describe_body(&json!({"timeSpent": "1m"})), " with worklog data");
        assert_eq!(describe_body(&json!({"accountId": "x"})), " with misc data");
    }
}
