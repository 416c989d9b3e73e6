use reqwest::{Client, Response};
use tracing::debug;
use url::Url;

use super::error::ClientError;
use crate::controller::tasks::{CreateTaskRequest, DeleteTaskResponse};
use crate::controller::ErrorEnvelope;
use crate::model::{RequestId, Task, TaskId};

/// The three calls the UI makes against the API.
#[async_trait::async_trait]
pub trait TaskApi: Send + Sync {
    async fn list_tasks(&self) -> Result<Vec<Task>, ClientError>;
    async fn create_task(&self, content: &str) -> Result<Task, ClientError>;
    async fn delete_task(&self, id: TaskId) -> Result<(), ClientError>;
}

pub struct TaskClient {
    base: Url,
    http: Client,
}

impl TaskClient {
    pub const DEFAULT_URL: &'static str = "http://localhost:3001";

    pub fn new(base: &str) -> Result<Self, ClientError> {
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            base,
            http: Client::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base.join(path)?)
    }

    /// Turns a non-2xx response into `ClientError::Api`, reading the error
    /// envelope when the server sent one.
    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let (kind, message) = match response.json::<ErrorEnvelope>().await {
            Ok(envelope) => (envelope.error.kind, envelope.error.message),
            Err(_) => (
                "unknown".to_string(),
                status.canonical_reason().unwrap_or("error").to_string(),
            ),
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            kind,
            message,
        })
    }
}

#[async_trait::async_trait]
impl TaskApi for TaskClient {
    async fn list_tasks(&self) -> Result<Vec<Task>, ClientError> {
        let response = self
            .http
            .get(self.url("tasks")?)
            .header(RequestId::HEADER_NAME, RequestId::new().to_string())
            .send()
            .await?;
        let tasks: Vec<Task> = Self::check(response).await?.json().await?;
        debug!(count = tasks.len(), "Fetched tasks.");
        Ok(tasks)
    }

    async fn create_task(&self, content: &str) -> Result<Task, ClientError> {
        let body = CreateTaskRequest {
            content: Some(content.to_string()),
        };
        let response = self
            .http
            .post(self.url("tasks")?)
            .header(RequestId::HEADER_NAME, RequestId::new().to_string())
            .json(&body)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("tasks/{}", id))?)
            .header(RequestId::HEADER_NAME, RequestId::new().to_string())
            .send()
            .await?;
        let _: DeleteTaskResponse = Self::check(response).await?.json().await?;
        Ok(())
    }
}
