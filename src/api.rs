use crate::error::ApiError;
use crate::models::{NewTask, Session, Task, TaskPatch};
use chrono::Utc;
use reqwest::{Client, Response};
use serde_json::{json, Value};

/// Client for the hosted backend: auth, row CRUD on the `tasks` table, and
/// blob storage. Constructed once at startup and passed to whoever needs
/// it; there is no process-wide singleton.
pub struct Backend {
    client: Client,
    project_url: String,
    api_key: String,
}

impl Backend {
    pub fn new(project_url: &str, api_key: &str) -> Backend {
        Backend {
            client: Client::new(),
            project_url: project_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Websocket endpoint for the change-notification channel.
    pub fn realtime_url(&self) -> String {
        let ws_url = self.project_url.replacen("http", "ws", 1);
        format!(
            "{}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
            ws_url, self.api_key
        )
    }

    // The backend reports failures as JSON with a human-readable message
    // under a handful of keys depending on the subsystem.
    async fn check(res: Response) -> Result<Response, ApiError> {
        if res.status().is_success() {
            return Ok(res);
        }
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|value| {
                ["message", "msg", "error_description", "error"]
                    .iter()
                    .find_map(|key| value.get(key).and_then(Value::as_str).map(str::to_string))
            })
            .unwrap_or_else(|| format!("{}: {}", status, body));
        Err(ApiError::backend(message))
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let url = format!("{}/auth/v1/signup", self.project_url);
        let res = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        Self::check(res).await?;
        Ok(())
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ApiError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.project_url);
        let res = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let session = Self::check(res).await?.json::<Session>().await?;
        Ok(session)
    }

    pub async fn sign_out(&self, session: &Session) -> Result<(), ApiError> {
        let url = format!("{}/auth/v1/logout", self.project_url);
        let res = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .send()
            .await?;
        Self::check(res).await?;
        Ok(())
    }

    /// Full task set, in the display order (`created_at` descending).
    pub async fn fetch_tasks(&self, session: &Session) -> Result<Vec<Task>, ApiError> {
        let url = format!(
            "{}/rest/v1/tasks?select=*&order=created_at.desc",
            self.project_url
        );
        let res = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .send()
            .await?;
        let tasks = Self::check(res).await?.json::<Vec<Task>>().await?;
        Ok(tasks)
    }

    pub async fn create_task(&self, session: &Session, task: &NewTask) -> Result<(), ApiError> {
        let url = format!("{}/rest/v1/tasks", self.project_url);
        let res = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .header("Prefer", "return=minimal")
            .json(task)
            .send()
            .await?;
        Self::check(res).await?;
        Ok(())
    }

    pub async fn update_task(
        &self,
        session: &Session,
        id: i64,
        patch: &TaskPatch,
    ) -> Result<(), ApiError> {
        let url = format!("{}/rest/v1/tasks?id=eq.{}", self.project_url, id);
        let res = self
            .client
            .patch(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await?;
        Self::check(res).await?;
        Ok(())
    }

    pub async fn delete_task(&self, session: &Session, id: i64) -> Result<(), ApiError> {
        let url = format!("{}/rest/v1/tasks?id=eq.{}", self.project_url, id);
        let res = self
            .client
            .delete(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .send()
            .await?;
        Self::check(res).await?;
        Ok(())
    }

    /// Uploads the image bytes and returns the public URL. The object path
    /// carries an upload-timestamp suffix so repeated uploads of the same
    /// file name never collide.
    pub async fn upload_image(
        &self,
        session: &Session,
        bucket: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ApiError> {
        let object_path = format!("{}-{}", file_name, Utc::now().timestamp());
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.project_url, bucket, object_path
        );
        let res = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .body(bytes)
            .send()
            .await?;
        Self::check(res).await?;

        Ok(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.project_url, bucket, object_path
        ))
    }
}
