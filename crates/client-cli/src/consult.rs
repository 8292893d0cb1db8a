//! The consultation workflow: gather a project's documents, compose one
//! prompt, call the generator, publish the result.
//!
//! Phases run strictly in sequence: validate selection, fetch the general
//! prompt (fresh every run, it may have been edited), list the project's
//! repository entries, compose, record the user prompt, generate, publish.
//! Every failure is typed and stops the run; nothing past this boundary
//! panics.

use chrono::Utc;
use shared::models::{Project, RepositoryEntry, UserPromptEntry};
use std::path::Path;

use crate::api::{ApiClient, ApiError};
use crate::generate::{GenerateError, Generator};
use crate::publish::{self, PublishError};

/// The backend keeps a single general-prompt record under this id.
pub const GENERAL_PROMPT_ID: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConsultError {
    #[error("no project selected")]
    NoProjectSelected,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("project {0} has no repository entries")]
    EmptyRepository(u32),

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

#[derive(Debug, Clone)]
pub struct ConsultRequest {
    pub project_id: u32,
    pub user_prompt: Option<String>,
}

impl ConsultRequest {
    fn trimmed_user_prompt(&self) -> Option<&str> {
        self.user_prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Concatenate the generation input: project header, general prompt, user
/// prompt (only when present), then every repository entry's markdown in
/// backend list order.
pub fn compose_prompt(
    project: &Project,
    general_prompt: &str,
    user_prompt: Option<&str>,
    entries: &[RepositoryEntry],
) -> String {
    let mut text = format!("# Projeto: {} {}\n", project.id, project.name);
    text.push_str("# Prompt Geral: \n");
    text.push_str(general_prompt);
    text.push('\n');
    if let Some(user_prompt) = user_prompt.map(str::trim).filter(|p| !p.is_empty()) {
        text.push_str("# Prompt Usuário: \n");
        text.push_str(user_prompt);
        text.push('\n');
    }
    text.push_str("# Repositórios: \n");
    for entry in entries {
        text.push_str(&entry.markdown);
        text.push('\n');
    }
    text
}

/// Run the workflow end to end. Returns the public URL of the published
/// page.
pub async fn run(
    api: &ApiClient,
    generator: &dyn Generator,
    assets_dir: &Path,
    web_base: &str,
    request: &ConsultRequest,
) -> Result<String, ConsultError> {
    if request.project_id == 0 {
        return Err(ConsultError::NoProjectSelected);
    }

    let project = api.project(request.project_id).await?;
    let general = api.general_prompt(GENERAL_PROMPT_ID).await?;
    let entries = api.repository(request.project_id).await?;
    if entries.is_empty() {
        return Err(ConsultError::EmptyRepository(request.project_id));
    }

    let prompt = compose_prompt(
        &project,
        &general.prompt,
        request.trimmed_user_prompt(),
        &entries,
    );
    tracing::info!(bytes = prompt.len(), project = project.id, "composed generation prompt");

    // History append is fire-and-forget: a failure must not abort the run.
    if let Some(user_prompt) = request.trimmed_user_prompt() {
        let entry = UserPromptEntry {
            prompt: user_prompt.to_string(),
            user_id: 0,
            recorded_at: Utc::now(),
        };
        if let Err(e) = api.record_user_prompt(&entry).await {
            tracing::warn!("failed to record user prompt: {e}");
        }
    }

    let output = generator.generate(&prompt).await?;
    tracing::info!(bytes = output.len(), "received generated content");

    Ok(publish::publish(assets_dir, web_base, &output)?)
}
