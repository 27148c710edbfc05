//! Figma file-duplication collaborator.
//!
//! When fully configured, duplicates a template file and returns its
//! shareable URL. On missing credentials or any API failure it returns a
//! deterministic placeholder URL instead; this collaborator never aborts
//! the pipeline.

use anyhow::anyhow;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::warn;
use uuid::Uuid;

const FIGMA_API_URL: &str = "https://api.figma.com/v1";

pub struct FigmaClient {
    client: Client,
    access_token: Option<String>,
    template_file_key: Option<String>,
    project_id: Option<String>,
}

impl FigmaClient {
    pub fn new(
        access_token: Option<String>,
        template_file_key: Option<String>,
        project_id: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            access_token,
            template_file_key,
            project_id,
        }
    }

    pub fn from_env() -> Self {
        Self::new(
            std::env::var("FIGMA_ACCESS_TOKEN").ok(),
            std::env::var("FIGMA_TEMPLATE_FILE_KEY").ok(),
            std::env::var("FIGMA_PROJECT_ID").ok(),
        )
    }

    /// Real duplication needs the token, the template to copy and the target
    /// project.
    pub fn has_real_access(&self) -> bool {
        self.access_token.is_some() && self.template_file_key.is_some() && self.project_id.is_some()
    }

    /// Returns a shareable URL for a design file named after the project.
    /// Infallible: failures degrade to the placeholder link.
    pub async fn create_file(&self, project_name: &str) -> String {
        if !self.has_real_access() {
            return fallback_link(project_name);
        }
        match self.duplicate_template(project_name).await {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "figma duplication failed, using placeholder link");
                fallback_link(project_name)
            }
        }
    }

    async fn duplicate_template(&self, project_name: &str) -> anyhow::Result<String> {
        let token = self.access_token.as_deref().unwrap_or_default();
        let template = self.template_file_key.as_deref().unwrap_or_default();
        let project_id: i64 = self
            .project_id
            .as_deref()
            .unwrap_or_default()
            .parse()
            .map_err(|_| anyhow!("FIGMA_PROJECT_ID must be a numeric project id"))?;

        let response = self
            .client
            .post(format!("{FIGMA_API_URL}/files/{template}/copy"))
            .header("X-FIGMA-TOKEN", token)
            .json(&json!({
                "name": project_name,
                "project_id": project_id,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("figma copy request failed: HTTP {status}"));
        }

        let reply: Value = response.json().await?;
        let file_key = reply["key"]
            .as_str()
            .ok_or_else(|| anyhow!("figma copy reply carried no file key"))?;

        Ok(design_url(file_key, project_name))
    }
}

fn design_url(file_key: &str, project_name: &str) -> String {
    let slug = urlencoding::encode(&project_name.trim().replace(' ', "-")).into_owned();
    format!("https://www.figma.com/design/{file_key}/{slug}?node-id=0-1")
}

/// Placeholder link for demo mode. Deterministic: the same project name
/// always maps to the same file key.
fn fallback_link(project_name: &str) -> String {
    let file_key = Uuid::new_v5(&Uuid::NAMESPACE_URL, project_name.as_bytes()).simple();
    design_url(&file_key.to_string(), project_name)
}
