use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use shared::models::{
    GeneralPromptUpdate, NewRepositoryEntry, ProjectPayload, ProjectStatus, UserPayload,
    UserStatus,
};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod auth;
mod config;
mod consult;
mod email;
mod generate;
mod ingest;
mod password;
mod publish;

use api::{ApiClient, ApiError};
use auth::CredentialStore;
use config::Config;

#[derive(Parser)]
#[command(name = "relato")]
#[command(about = "Project narrative client - manage projects, attach documents, generate summaries")]
#[command(version)]
struct Cli {
    /// Backend base URL (overrides config)
    #[arg(long)]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Login to the backend
    Login {
        /// Account email
        email: String,
        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Logout and discard the stored token
    Logout,
    /// Show the currently logged-in user
    Whoami,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// List user types
    Types,
    /// List permissions, optionally for one user type
    Permissions {
        /// User type id to filter by
        type_id: Option<u32>,
    },
    /// Manage projects
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },
    /// Manage a project's document repository
    Repo {
        #[command(subcommand)]
        action: RepoAction,
    },
    /// Manage generation prompts
    Prompt {
        #[command(subcommand)]
        action: PromptAction,
    },
    /// Generate and publish a narrative summary for a project
    Consult {
        /// Project id
        #[arg(long)]
        project: u32,
        /// Optional extra instructions for this run
        #[arg(long)]
        prompt: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set a configuration value
    Set {
        /// Configuration key (server, web_base, model, assets_dir, converter_path)
        key: String,
        /// Configuration value
        value: String,
    },
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Show all configuration
    Show,
    /// Get the config file path
    Path,
}

#[derive(Subcommand)]
enum UserAction {
    /// List users
    List {
        /// Free-text filter
        #[arg(long)]
        filter: Option<String>,
    },
    /// Show one user with its permissions
    Show { id: u32 },
    /// Create a user; a password is generated and mailed to them
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// User type id (see `relato types`)
        #[arg(long = "type")]
        type_id: u32,
        /// Ativo, Bloqueado or Cancelado
        #[arg(long, default_value = "Ativo")]
        status: String,
    },
    /// Update a user
    Update {
        id: u32,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long = "type")]
        type_id: u32,
        #[arg(long)]
        status: String,
    },
    /// Delete a user
    Delete { id: u32 },
    /// Reset a user's password; the new credential is printed
    Reset { id: u32 },
    /// Change your own password
    ChangePassword {
        /// New password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
        /// Confirmation (prompted when omitted)
        #[arg(long)]
        confirm: Option<String>,
    },
}

#[derive(Subcommand)]
enum ProjectAction {
    /// List projects
    List {
        /// Free-text filter
        #[arg(long)]
        filter: Option<String>,
    },
    /// Show one project and its repository entries
    Show { id: u32 },
    /// Create a project
    Create {
        #[arg(long)]
        name: String,
        /// Ativo or Encerrado
        #[arg(long, default_value = "Ativo")]
        status: String,
    },
    /// Update a project
    Update {
        id: u32,
        #[arg(long)]
        name: String,
        #[arg(long)]
        status: String,
    },
    /// Delete a project
    Delete { id: u32 },
}

#[derive(Subcommand)]
enum RepoAction {
    /// List repository entries for a project
    List {
        /// Project id (0 lists nothing)
        #[arg(long, default_value_t = 0)]
        project: u32,
    },
    /// Convert a document to markdown and attach it to a project
    Attach {
        /// Project id
        #[arg(long)]
        project: u32,
        /// Path to a pdf, docx or xlsx file
        file: PathBuf,
    },
    /// Delete a repository entry
    Delete { id: u32 },
}

#[derive(Subcommand)]
enum PromptAction {
    /// Show the general prompt
    Show,
    /// Replace the general prompt text
    Edit {
        #[arg(long)]
        text: String,
    },
    /// Show recent user prompts
    History {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relato=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { action } => handle_config_command(action),
        Commands::Login { email, password } => {
            let api = build_api(cli.server)?;
            let password = match password {
                Some(p) => p,
                None => prompt_password("Password: ")?,
            };
            match api.login(&email, &password).await {
                Ok(()) => {
                    println!("\x1b[32m✅ Login successful\x1b[0m");
                    Ok(())
                }
                Err(ApiError::BadCredentials) => {
                    eprintln!("\x1b[31m✗ Incorrect email or password\x1b[0m");
                    std::process::exit(1);
                }
                Err(e) => Err(e.into()),
            }
        }
        Commands::Logout => {
            let store = CredentialStore::open_default()?;
            store.clear()?;
            println!("\x1b[32m✅ Logged out\x1b[0m");
            Ok(())
        }
        Commands::Whoami => {
            let api = build_api(cli.server)?;
            match api.current_user().await {
                Ok(me) => {
                    println!("\x1b[32m✓ Logged in\x1b[0m");
                    println!("Name:  {}", me.name);
                    println!("Email: {}", me.email);
                    if let Some(user_type) = me.user_type {
                        println!("Type:  {}", user_type.name);
                    }
                    Ok(())
                }
                Err(ApiError::AuthenticationRequired) => {
                    eprintln!("\x1b[33m✗ Not logged in\x1b[0m");
                    eprintln!("Run '\x1b[1mrelato login <email>\x1b[0m' to authenticate");
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        }
        Commands::User { action } => handle_user_command(build_api(cli.server)?, action).await,
        Commands::Types => {
            let api = build_api(cli.server)?;
            for user_type in api.user_types().await? {
                println!("{:>4}  {}", user_type.id, user_type.name);
            }
            Ok(())
        }
        Commands::Permissions { type_id } => {
            let api = build_api(cli.server)?;
            for permission in api.permissions().await? {
                if type_id.is_some_and(|id| id != permission.type_id) {
                    continue;
                }
                println!("{:>4}  {}", permission.type_id, permission.policy.description);
            }
            Ok(())
        }
        Commands::Project { action } => {
            handle_project_command(build_api(cli.server)?, action).await
        }
        Commands::Repo { action } => handle_repo_command(build_api(cli.server)?, action).await,
        Commands::Prompt { action } => handle_prompt_command(build_api(cli.server)?, action).await,
        Commands::Consult { project, prompt } => {
            let config = Config::load()?;
            let api = build_api(cli.server)?;
            let web_base = config.remote.web_base.clone().ok_or_else(|| {
                anyhow::anyhow!(
                    "web base URL not configured - run `relato config set web_base <url>`"
                )
            })?;
            let generator = generate::GeminiClient::from_env(&config.generation.model)?;

            eprintln!("Consulting project {project}...");
            let link = consult::run(
                &api,
                &generator,
                &config.generation.assets_dir,
                &web_base,
                &consult::ConsultRequest {
                    project_id: project,
                    user_prompt: prompt,
                },
            )
            .await?;

            println!("\x1b[32m✅ Summary published\x1b[0m");
            println!("{link}");
            Ok(())
        }
    }
}

fn build_api(server_override: Option<String>) -> Result<ApiClient> {
    let config = Config::load()?;
    let server = server_override
        .or(config.remote.server)
        .ok_or_else(|| {
            anyhow::anyhow!("server URL not configured - run `relato config set server <url>`")
        })?;
    Ok(ApiClient::new(server, CredentialStore::open_default()?))
}

/// Prompt for a password on the terminal without echoing it.
fn prompt_password(label: &str) -> Result<String> {
    eprint!("{label}");
    std::io::stderr().flush()?;
    Ok(rpassword::read_password()?)
}

fn local_time(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%d/%m/%Y %H:%M:%S").to_string()
}

fn parse_user_status(value: &str) -> Result<UserStatus> {
    match value.to_lowercase().as_str() {
        "ativo" | "active" => Ok(UserStatus::Active),
        "bloqueado" | "blocked" => Ok(UserStatus::Blocked),
        "cancelado" | "cancelled" => Ok(UserStatus::Cancelled),
        _ => anyhow::bail!("unknown user status: {value}. Valid: Ativo, Bloqueado, Cancelado"),
    }
}

fn parse_project_status(value: &str) -> Result<ProjectStatus> {
    match value.to_lowercase().as_str() {
        "ativo" | "active" => Ok(ProjectStatus::Active),
        "encerrado" | "closed" => Ok(ProjectStatus::Closed),
        _ => anyhow::bail!("unknown project status: {value}. Valid: Ativo, Encerrado"),
    }
}

fn handle_config_command(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Set { key, value } => {
            let mut config = Config::load().unwrap_or_default();
            match key.as_str() {
                "server" => config.remote.server = Some(value),
                "web_base" => config.remote.web_base = Some(value),
                "model" => config.generation.model = value,
                "assets_dir" => config.generation.assets_dir = PathBuf::from(value),
                "converter_path" => config.generation.converter_path = value,
                _ => anyhow::bail!(
                    "Unknown config key: {}. Valid keys: server, web_base, model, assets_dir, converter_path",
                    key
                ),
            }
            config.save()?;
            println!("Configuration saved");
        }
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = match key.as_str() {
                "server" => config.remote.server.unwrap_or_default(),
                "web_base" => config.remote.web_base.unwrap_or_default(),
                "token" => config.remote.token.map(|_| "****").unwrap_or_default().to_string(),
                "model" => config.generation.model,
                "assets_dir" => config.generation.assets_dir.display().to_string(),
                "converter_path" => config.generation.converter_path,
                _ => anyhow::bail!("Unknown config key: {}", key),
            };
            println!("{}", value);
        }
        ConfigAction::Show => {
            let config = Config::load()?;
            println!("server: {}", config.remote.server.unwrap_or_default());
            println!("web_base: {}", config.remote.web_base.unwrap_or_default());
            println!("token: {}", config.remote.token.map(|_| "****").unwrap_or_default());
            println!("model: {}", config.generation.model);
            println!("assets_dir: {}", config.generation.assets_dir.display());
            println!("converter_path: {}", config.generation.converter_path);
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

async fn handle_user_command(api: ApiClient, action: UserAction) -> Result<()> {
    match action {
        UserAction::List { filter } => {
            for user in api.users(filter.as_deref()).await? {
                let type_name = user.user_type.map(|t| t.name).unwrap_or_default();
                println!(
                    "{:>4}  {:<30}  {:<30}  {:<13}  {}",
                    user.id, user.name, user.email, type_name, user.status
                );
            }
        }
        UserAction::Show { id } => {
            let user = api.user(id).await?;
            println!("Id:     {}", user.id);
            println!("Name:   {}", user.name);
            println!("Email:  {}", user.email);
            if let Some(user_type) = &user.user_type {
                println!("Type:   {}", user_type.name);
            }
            println!("Status: {}", user.status);
            let permissions = api.permissions().await?;
            println!("Permissions:");
            for permission in permissions {
                if Some(permission.type_id) == user.type_id {
                    println!("  + {}", permission.policy.description);
                }
            }
        }
        UserAction::Create {
            name,
            email,
            type_id,
            status,
        } => {
            let generated = password::generate(password::GENERATED_LENGTH);
            let payload = UserPayload {
                email: email.clone(),
                name: name.clone(),
                type_id,
                status: parse_user_status(&status)?,
                password: generated.clone(),
            };
            api.create_user(&payload).await?;
            println!("\x1b[32m✅ User created\x1b[0m");

            // Credential delivery is best-effort; the account exists already.
            if let Err(e) = email::send_credentials(&name, &email, &generated).await {
                tracing::warn!("failed to email credentials: {e}");
                eprintln!("\x1b[33m⚠ Could not email the credentials; generated password: {generated}\x1b[0m");
            } else {
                println!("Credentials mailed to {email}");
            }
        }
        UserAction::Update {
            id,
            name,
            email,
            type_id,
            status,
        } => {
            // The backend expects the full record; a fresh password is
            // generated server-side-compatible, same as account creation.
            let payload = UserPayload {
                email,
                name,
                type_id,
                status: parse_user_status(&status)?,
                password: password::generate(password::GENERATED_LENGTH),
            };
            api.update_user(id, &payload).await?;
            println!("\x1b[32m✅ User updated\x1b[0m");
        }
        UserAction::Delete { id } => {
            api.delete_user(id).await?;
            println!("\x1b[32m✅ User deleted\x1b[0m");
        }
        UserAction::Reset { id } => {
            let outcome = api.reset_password(id).await?;
            println!("\x1b[32m✅ Password reset for {} <{}>\x1b[0m", outcome.name, outcome.email);
            println!("New password: {}", outcome.password);
        }
        UserAction::ChangePassword { password, confirm } => {
            let me = api.current_user().await?;
            let new_password = match password {
                Some(p) => p,
                None => prompt_password("New password: ")?,
            };
            let confirmation = match confirm {
                Some(c) => c,
                None => prompt_password("Confirm password: ")?,
            };

            let unmet = password::unmet_rules(&new_password);
            if !unmet.is_empty() {
                anyhow::bail!("password does not meet the rules: {}", unmet.join(", "));
            }
            if new_password != confirmation {
                anyhow::bail!("password confirmation does not match");
            }

            let payload = UserPayload {
                email: me.email,
                name: me.name,
                type_id: me.type_id.unwrap_or_default(),
                status: me.status,
                password: new_password,
            };
            api.change_password(me.id, &payload).await?;
            println!("\x1b[32m✅ Password changed\x1b[0m");
        }
    }
    Ok(())
}

async fn handle_project_command(api: ApiClient, action: ProjectAction) -> Result<()> {
    match action {
        ProjectAction::List { filter } => {
            for project in api.projects(filter.as_deref()).await? {
                println!("{:>4}  {:<40}  {}", project.id, project.name, project.status);
            }
        }
        ProjectAction::Show { id } => {
            let project = api.project(id).await?;
            println!("Id:     {}", project.id);
            println!("Name:   {}", project.name);
            println!("Status: {}", project.status);
            let entries = api.repository(id).await?;
            println!("Repository entries: {}", entries.len());
            for entry in entries {
                let uploader = entry.user.map(|u| u.name).unwrap_or_default();
                println!(
                    "  {:>4}  {:<6}  {}  {}",
                    entry.id,
                    entry.file_type,
                    local_time(&entry.attached_at),
                    uploader
                );
            }
        }
        ProjectAction::Create { name, status } => {
            let payload = ProjectPayload {
                name,
                status: parse_project_status(&status)?,
            };
            api.create_project(&payload).await?;
            println!("\x1b[32m✅ Project created\x1b[0m");
        }
        ProjectAction::Update { id, name, status } => {
            let payload = ProjectPayload {
                name,
                status: parse_project_status(&status)?,
            };
            api.update_project(id, &payload).await?;
            println!("\x1b[32m✅ Project updated\x1b[0m");
        }
        ProjectAction::Delete { id } => {
            api.delete_project(id).await?;
            println!("\x1b[32m✅ Project deleted\x1b[0m");
        }
    }
    Ok(())
}

async fn handle_repo_command(api: ApiClient, action: RepoAction) -> Result<()> {
    match action {
        RepoAction::List { project } => {
            for entry in api.repository(project).await? {
                let project_name = entry.project.map(|p| p.name).unwrap_or_default();
                let uploader = entry.user.map(|u| u.name).unwrap_or_default();
                println!(
                    "{:>4}  {:<30}  {:<6}  {}  {}",
                    entry.id,
                    project_name,
                    entry.file_type,
                    local_time(&entry.attached_at),
                    uploader
                );
            }
        }
        RepoAction::Attach { project, file } => {
            let config = Config::load()?;
            let file_type = ingest::validated_extension(&file)?;

            eprintln!("Converting {}...", file.display());
            let markdown = ingest::to_markdown(&config.generation.converter_path, &file).await?;
            tracing::info!(bytes = markdown.len(), "document converted to markdown");

            let payload = NewRepositoryEntry {
                markdown,
                file_type,
                project_id: project,
                user_id: 0,
                attached_at: Utc::now(),
            };
            api.attach_repository(&payload).await?;
            println!("\x1b[32m✅ Document attached to project {project}\x1b[0m");
        }
        RepoAction::Delete { id } => {
            api.delete_repository(id).await?;
            println!("\x1b[32m✅ Repository entry deleted\x1b[0m");
        }
    }
    Ok(())
}

async fn handle_prompt_command(api: ApiClient, action: PromptAction) -> Result<()> {
    match action {
        PromptAction::Show => {
            let general = api.general_prompt(consult::GENERAL_PROMPT_ID).await?;
            if let Some(editor) = &general.editor {
                println!("Last edited by: {}", editor.name);
            }
            println!("Last edited at: {}", local_time(&general.edited_at));
            println!();
            println!("{}", general.prompt);
        }
        PromptAction::Edit { text } => {
            let payload = GeneralPromptUpdate {
                prompt: text,
                user_id: 0,
                edited_at: Utc::now(),
            };
            api.update_general_prompt(consult::GENERAL_PROMPT_ID, &payload)
                .await?;
            println!("\x1b[32m✅ General prompt updated\x1b[0m");
        }
        PromptAction::History { limit } => {
            for entry in api.user_prompts(limit).await? {
                println!("{}  {}", local_time(&entry.recorded_at), entry.prompt);
            }
        }
    }
    Ok(())
}
