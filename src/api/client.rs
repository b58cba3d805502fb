use async_trait::async_trait;
use futures::future::try_join_all;
use log::debug;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use super::types::{
    History, JobConsole, PipelineGroup, PipelineStatus, ScheduleOutcome, UnlockOutcome, Variables,
};
use super::GoCdApi;
use crate::auth::Credentials;
use crate::error::{GoCdError, Result};
use crate::pipeline::PipelineSnapshot;

/// HTTP client for the GoCD REST API.
pub struct GoCdClient {
    client: Client,
    base_url: Url,
    credentials: Option<Credentials>,
}

impl GoCdClient {
    /// Creates a client for the server at `base_url` (e.g. `https://go.example.com:8154`).
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the URL cannot be parsed or the
    /// HTTP client cannot be built.
    pub fn new(base_url: &str, credentials: Option<Credentials>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("gocd-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GoCdError::Config(format!("Failed to create HTTP client: {e}")))?;

        let base_url = Url::parse(base_url)
            .map_err(|e| GoCdError::Config(format!("Invalid server URL \"{base_url}\": {e}")))?;

        if base_url.cannot_be_a_base() {
            return Err(GoCdError::Config(format!(
                "Invalid server URL \"{base_url}\""
            )));
        }

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn pipeline_endpoint(&self, name: &str, action: &[&str]) -> Url {
        let mut segments = vec!["go", "api", "pipelines", name];
        segments.extend_from_slice(action);
        self.endpoint(&segments)
    }

    fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(credentials) => request.basic_auth(credentials.user(), credentials.password()),
            None => request,
        }
    }

    async fn get_text(&self, url: Url) -> Result<String> {
        debug!("GET {url}");
        let response = self.auth_request(self.client.get(url)).send().await?;
        Ok(ensure_success(response).await?.text().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let body = self.get_text(url.clone()).await?;

        if body.trim().is_empty() {
            return Err(GoCdError::InvalidResponse(format!(
                "empty response from {url}"
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| GoCdError::InvalidResponse(format!("{url}: {e}")))
    }

    async fn post_form(&self, url: Url, form: &[(String, String)]) -> Result<Response> {
        debug!("POST {url}");
        let request = self
            .client
            .post(url)
            .header("Confirm", "true")
            .form(form);

        Ok(self.auth_request(request).send().await?)
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());

    Err(GoCdError::Api {
        status: status.as_u16(),
        message: message.trim().to_string(),
    })
}

fn variable_form(variables: &Variables, secure_variables: &Variables) -> Vec<(String, String)> {
    let plain = variables
        .iter()
        .map(|(k, v)| (format!("variables[{k}]"), v.clone()));
    let secure = secure_variables
        .iter()
        .map(|(k, v)| (format!("secure_variables[{k}]"), v.clone()));

    plain.chain(secure).collect()
}

#[async_trait]
impl GoCdApi for GoCdClient {
    async fn pipeline_status(&self, name: &str) -> Result<PipelineStatus> {
        self.get_json(self.pipeline_endpoint(name, &["status"])).await
    }

    async fn history(&self, name: &str) -> Result<Vec<PipelineSnapshot>> {
        let history: History = self
            .get_json(self.pipeline_endpoint(name, &["history", "0"]))
            .await?;

        Ok(history.pipelines)
    }

    async fn instance(&self, name: &str, counter: u64) -> Result<PipelineSnapshot> {
        let counter = counter.to_string();
        self.get_json(self.pipeline_endpoint(name, &["instance", &counter]))
            .await
    }

    async fn unlock(&self, name: &str) -> Result<UnlockOutcome> {
        let response = self
            .post_form(self.pipeline_endpoint(name, &["releaseLock"]), &[])
            .await?;

        if response.status() == StatusCode::NOT_ACCEPTABLE {
            debug!("Pipeline {name} has no lock to release");
            return Ok(UnlockOutcome::AlreadyUnlocked);
        }

        ensure_success(response).await?;
        Ok(UnlockOutcome::Unlocked)
    }

    async fn schedule(
        &self,
        name: &str,
        variables: &Variables,
        secure_variables: &Variables,
    ) -> Result<ScheduleOutcome> {
        let form = variable_form(variables, secure_variables);
        let response = self
            .post_form(self.pipeline_endpoint(name, &["schedule"]), &form)
            .await?;

        let status = response.status();
        if status.is_client_error() {
            let message = response.text().await?;
            return Ok(ScheduleOutcome::Rejected {
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }

        let message = ensure_success(response).await?.text().await?;
        Ok(ScheduleOutcome::Accepted(message.trim().to_string()))
    }

    async fn retrigger_stage(&self, name: &str, counter: u64, stage: &str) -> Result<()> {
        let counter = counter.to_string();
        let url = self.endpoint(&["go", "run", name, &counter, stage]);

        ensure_success(self.post_form(url, &[]).await?).await?;
        Ok(())
    }

    async fn pause(&self, name: &str, cause: &str) -> Result<()> {
        let form = [("pauseCause".to_string(), cause.to_string())];
        let response = self
            .post_form(self.pipeline_endpoint(name, &["pause"]), &form)
            .await?;

        ensure_success(response).await?;
        Ok(())
    }

    async fn unpause(&self, name: &str) -> Result<()> {
        let response = self
            .post_form(self.pipeline_endpoint(name, &["unpause"]), &[])
            .await?;

        ensure_success(response).await?;
        Ok(())
    }

    async fn pipeline_groups(&self) -> Result<Vec<PipelineGroup>> {
        self.get_json(self.endpoint(&["go", "api", "config", "pipeline_groups"]))
            .await
    }

    async fn console_output(
        &self,
        name: &str,
        snapshot: &PipelineSnapshot,
    ) -> Result<Vec<JobConsole>> {
        let pipeline_counter = snapshot.counter.to_string();

        let requests = snapshot
            .stages
            .iter()
            .filter(|stage| stage.scheduled)
            .flat_map(|stage| stage.jobs.iter().map(move |job| (stage, job)))
            .map(|(stage, job)| {
                let stage_counter = stage.counter.to_string();
                let url = self.endpoint(&[
                    "go",
                    "files",
                    name,
                    &pipeline_counter,
                    &stage.name,
                    &stage_counter,
                    &job.name,
                    "cruise-output",
                    "console.log",
                ]);

                async move {
                    let output = self.get_text(url).await?;
                    Ok::<_, GoCdError>(JobConsole {
                        pipeline: name.to_string(),
                        pipeline_counter: snapshot.counter,
                        stage: stage.name.clone(),
                        stage_counter: stage.counter,
                        job: job.name.clone(),
                        output,
                    })
                }
            });

        try_join_all(requests).await
    }
}
