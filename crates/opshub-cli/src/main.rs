//! OpsHub CLI: command-line admin client for the OpsHub API.
//!
//! Set OPSHUB_API_URL (or API_URL). `opshub login` stores the session tokens;
//! every other command reuses them until they expire.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use opshub_api_client::{
    ApiClient, ApiError, Auth, FetchCommand, FetchEvent, FetchOutcome, LocalFile, NewsFetcher,
    UploadEvent, UploadOrchestrator,
};
use opshub_cli::{fetch_progress_line, init_tracing, progress_bar, require_area, upload_row_line};
use opshub_core::validation::validate_selection;
use opshub_core::{find_feature, Area, ClientConfig, Role, Session, TokenStore, HUB_FEATURES};
use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "opshub", about = "OpsHub admin CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session tokens
    Login {
        email: String,
        #[arg(long, env = "OPSHUB_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Exchange the stored refresh token for new tokens
    Refresh,
    /// Register a new admin account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "OPSHUB_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        company: String,
    },
    /// Activate an invited account
    AcceptInvite {
        /// Invitation token from the invite link
        token: String,
        #[arg(long, env = "OPSHUB_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Manage invited users (admin)
    Users {
        #[command(subcommand)]
        sub: UserCommands,
    },
    /// Manage admin accounts (superadmin)
    Admins {
        #[command(subcommand)]
        sub: AdminCommands,
    },
    /// News feed posts
    Posts {
        #[command(subcommand)]
        sub: PostCommands,
    },
    /// News sources used by the fetcher (superadmin)
    Sources {
        #[command(subcommand)]
        sub: SourceCommands,
    },
    /// Trainings, modules and lessons
    Trainings {
        #[command(subcommand)]
        sub: TrainingCommands,
    },
    /// Lesson attachments (superadmin)
    Attachments {
        #[command(subcommand)]
        sub: AttachmentCommands,
    },
    /// Training progress
    Progress {
        #[command(subcommand)]
        sub: ProgressCommands,
    },
    /// Run the news fetcher and stream its log (superadmin)
    FetchNews {
        /// Maximum number of articles to fetch
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=100))]
        limit: u32,
        /// Extra site to scan (RSS or HTML); repeatable
        #[arg(long = "site")]
        sites: Vec<String>,
    },
    /// Operations Hub features
    Ops {
        #[command(subcommand)]
        sub: OpsCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// List users you created
    List,
    /// Invite a user by email
    Invite {
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "user")]
        role: Role,
    },
    Activate { id: i64 },
    Deactivate { id: i64 },
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum AdminCommands {
    List,
    Create {
        email: String,
        #[arg(long, env = "OPSHUB_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Update an admin's user-creation settings
    Settings {
        id: i64,
        #[arg(long, action = clap::ArgAction::Set)]
        can_create_users: bool,
        #[arg(long)]
        limit: i64,
    },
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum PostCommands {
    List,
    Get { id: i64 },
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum SourceCommands {
    List,
    Add {
        url: String,
        /// Display name; derived from the URL when omitted
        #[arg(long)]
        name: Option<String>,
    },
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum TrainingCommands {
    /// Published trainings
    Published,
    /// Trainings you manage
    Mine,
    /// Full training with modules, lessons and attachments
    Show { id: i64 },
    Create {
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
    Publish { id: i64 },
    Unpublish { id: i64 },
    Delete { id: i64 },
    AddModule {
        training_id: i64,
        title: String,
        #[arg(long, default_value_t = 1)]
        order: i32,
    },
    AddLesson {
        module_id: i64,
        title: String,
        #[arg(long)]
        content: Option<String>,
        #[arg(long, default_value_t = 1)]
        order: i32,
    },
    UpdateLesson {
        lesson_id: i64,
        title: String,
        #[arg(long)]
        content: Option<String>,
        #[arg(long, default_value_t = 1)]
        order: i32,
    },
}

#[derive(Subcommand)]
enum AttachmentCommands {
    /// Upload files to a lesson
    Upload {
        lesson_id: i64,
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Training to reload once the batch settles
        #[arg(long)]
        training: Option<i64>,
        /// Skip local type and size checks
        #[arg(long)]
        force: bool,
    },
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum ProgressCommands {
    Show { training_id: i64 },
    /// Mark a lesson as completed
    Complete { lesson_id: i64 },
}

#[derive(Subcommand)]
enum OpsCommands {
    List,
    /// Show a feature page, by slug (e.g. work-orders)
    Show { feature: String },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn print_done(message: String) -> anyhow::Result<()> {
    print_json(&serde_json::json!({ "success": true, "message": message }))
}

struct App {
    config: ClientConfig,
    store: TokenStore,
    anonymous: ApiClient,
}

impl App {
    fn new() -> anyhow::Result<Self> {
        let config = ClientConfig::from_env()
            .context("Invalid configuration. Check OPSHUB_API_URL (or API_URL)")?;
        let store = TokenStore::from_config(&config).context("Cannot locate session file")?;
        let anonymous = ApiClient::from_config(&config, Auth::Anonymous)?;
        Ok(Self {
            config,
            store,
            anonymous,
        })
    }

    /// Client carrying the stored access token.
    fn authed(&self) -> anyhow::Result<ApiClient> {
        let session = self
            .store
            .load_valid()?
            .ok_or(ApiError::NotLoggedIn)
            .context("Run `opshub login` first")?;
        Ok(self.anonymous.with_auth(Auth::Bearer(session.access_token)))
    }

    /// Client for a role-gated area, after checking the current user's role.
    async fn gated(&self, area: Area) -> anyhow::Result<ApiClient> {
        let client = self.authed()?;
        let me = match client.me().await {
            Ok(me) => me,
            Err(e) if e.is_unauthorized() => {
                self.store.clear()?;
                return Err(e).context("Session is no longer valid. Run `opshub login`");
            }
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(email = %me.email, role = %me.role, area = area.name(), "Checking access");
        require_area(me.role, area)?;
        Ok(client)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let app = App::new()?;

    match cli.command {
        Commands::Login { email, password } => {
            let login = app.anonymous.login(&email, &password).await?;
            app.store.save(&Session::from(login.token))?;
            tracing::info!(path = %app.store.path().display(), "Session saved");
            print_json(&login.user)?;
        }
        Commands::Logout => {
            app.store.clear()?;
            print_done("Logged out".to_string())?;
        }
        Commands::Whoami => {
            let me = app.authed()?.me().await?;
            print_json(&me)?;
        }
        Commands::Refresh => {
            let session = app
                .store
                .load()?
                .ok_or(ApiError::NotLoggedIn)
                .context("Run `opshub login` first")?;
            let pair = app.anonymous.refresh(&session.refresh_token).await?;
            app.store.save(&Session::from(pair))?;
            print_done("Session refreshed".to_string())?;
        }
        Commands::Register {
            name,
            email,
            password,
            company,
        } => {
            let user = app
                .anonymous
                .register(&name, &email, &password, &company)
                .await?;
            print_json(&user)?;
        }
        Commands::AcceptInvite { token, password } => {
            let reply = app.anonymous.accept_invite(&token, &password).await?;
            print_done(reply.message)?;
        }
        Commands::Users { sub } => run_users(&app, sub).await?,
        Commands::Admins { sub } => run_admins(&app, sub).await?,
        Commands::Posts { sub } => run_posts(&app, sub).await?,
        Commands::Sources { sub } => run_sources(&app, sub).await?,
        Commands::Trainings { sub } => run_trainings(&app, sub).await?,
        Commands::Attachments { sub } => run_attachments(&app, sub).await?,
        Commands::Progress { sub } => {
            let client = app.gated(Area::Training).await?;
            match sub {
                ProgressCommands::Show { training_id } => {
                    print_json(&client.get_progress(training_id).await?)?
                }
                ProgressCommands::Complete { lesson_id } => {
                    client.complete_lesson(lesson_id).await?;
                    print_done(format!("Lesson {} completed", lesson_id))?;
                }
            }
        }
        Commands::FetchNews { limit, sites } => run_fetch_news(&app, limit, sites).await?,
        Commands::Ops { sub } => {
            app.gated(Area::OperationsHub).await?;
            match sub {
                OpsCommands::List => print_json(&HUB_FEATURES)?,
                OpsCommands::Show { feature } => {
                    let feature = find_feature(&feature)
                        .with_context(|| format!("Unknown Operations Hub feature '{}'", feature))?;
                    println!("{}", feature.placeholder_text());
                }
            }
        }
    }

    Ok(())
}

async fn run_users(app: &App, sub: UserCommands) -> anyhow::Result<()> {
    let client = app.gated(Area::Admin).await?;
    match sub {
        UserCommands::List => print_json(&client.list_users().await?),
        UserCommands::Invite { email, name, role } => {
            let invitation = client.invite_user(&email, role, &name).await?;
            print_json(&invitation)
        }
        UserCommands::Activate { id } => print_json(&client.set_user_status(id, true).await?),
        UserCommands::Deactivate { id } => print_json(&client.set_user_status(id, false).await?),
        UserCommands::Delete { id } => {
            client.delete_user(id).await?;
            print_done(format!("User {} deleted", id))
        }
    }
}

async fn run_admins(app: &App, sub: AdminCommands) -> anyhow::Result<()> {
    let client = app.gated(Area::Superadmin).await?;
    match sub {
        AdminCommands::List => print_json(&client.list_admins().await?),
        AdminCommands::Create { email, password } => {
            print_json(&client.create_admin(&email, &password).await?)
        }
        AdminCommands::Settings {
            id,
            can_create_users,
            limit,
        } => print_json(
            &client
                .update_admin_settings(id, can_create_users, limit)
                .await?,
        ),
        AdminCommands::Delete { id } => {
            client.delete_admin(id).await?;
            print_done(format!("Admin {} deleted", id))
        }
    }
}

async fn run_posts(app: &App, sub: PostCommands) -> anyhow::Result<()> {
    let area = match sub {
        PostCommands::Delete { .. } => Area::Superadmin,
        _ => Area::Home,
    };
    let client = app.gated(area).await?;
    match sub {
        PostCommands::List => print_json(&client.list_posts().await?),
        PostCommands::Get { id } => print_json(&client.get_post(id).await?),
        PostCommands::Delete { id } => {
            client.delete_post(id).await?;
            print_done(format!("Post {} deleted", id))
        }
    }
}

async fn run_sources(app: &App, sub: SourceCommands) -> anyhow::Result<()> {
    let client = app.gated(Area::Superadmin).await?;
    match sub {
        SourceCommands::List => print_json(&client.list_news_sources().await?),
        SourceCommands::Add { url, name } => {
            print_json(&client.create_news_source(&url, name.as_deref()).await?)
        }
        SourceCommands::Delete { id } => {
            client.delete_news_source(id).await?;
            print_done(format!("News source {} deleted", id))
        }
    }
}

async fn run_trainings(app: &App, sub: TrainingCommands) -> anyhow::Result<()> {
    // Reading trainings is open to every role; building them is superadmin only.
    let area = match sub {
        TrainingCommands::Published | TrainingCommands::Show { .. } => Area::Training,
        _ => Area::Superadmin,
    };
    let client = app.gated(area).await?;
    match sub {
        TrainingCommands::Published => print_json(&client.published_trainings().await?),
        TrainingCommands::Show { id } => print_json(&client.get_training(id).await?),
        TrainingCommands::Mine => print_json(&client.my_trainings().await?),
        TrainingCommands::Create { title, description } => print_json(
            &client
                .create_training(&title, description.as_deref())
                .await?,
        ),
        TrainingCommands::Publish { id } => {
            print_json(&client.set_training_published(id, true).await?)
        }
        TrainingCommands::Unpublish { id } => {
            print_json(&client.set_training_published(id, false).await?)
        }
        TrainingCommands::Delete { id } => {
            client.delete_training(id).await?;
            print_done(format!("Training {} deleted", id))
        }
        TrainingCommands::AddModule {
            training_id,
            title,
            order,
        } => print_json(&client.add_module(training_id, &title, order).await?),
        TrainingCommands::AddLesson {
            module_id,
            title,
            content,
            order,
        } => print_json(
            &client
                .add_lesson(module_id, &title, content.as_deref(), order)
                .await?,
        ),
        TrainingCommands::UpdateLesson {
            lesson_id,
            title,
            content,
            order,
        } => print_json(
            &client
                .update_lesson(lesson_id, &title, content.as_deref(), order)
                .await?,
        ),
    }
}

async fn run_attachments(app: &App, sub: AttachmentCommands) -> anyhow::Result<()> {
    let client = app.gated(Area::Superadmin).await?;
    match sub {
        AttachmentCommands::Delete { id } => {
            client.delete_attachment(id).await?;
            print_done(format!("Attachment {} deleted", id))
        }
        AttachmentCommands::Upload {
            lesson_id,
            files,
            training,
            force,
        } => upload_attachments(app, client, lesson_id, files, training, force).await,
    }
}

async fn upload_attachments(
    app: &App,
    client: ApiClient,
    lesson_id: i64,
    paths: Vec<PathBuf>,
    training: Option<i64>,
    force: bool,
) -> anyhow::Result<()> {
    let mut selection = Vec::with_capacity(paths.len());
    for path in &paths {
        let file = LocalFile::from_path(path)
            .await
            .with_context(|| format!("Cannot read {}", path.display()))?;
        selection.push(file);
    }

    if !force {
        let metadata: Vec<_> = selection.iter().map(LocalFile::metadata).collect();
        if let Err(rejections) = validate_selection(&metadata, app.config.max_attachment_size_bytes)
        {
            for rejection in &rejections {
                eprintln!("{}", rejection);
            }
            anyhow::bail!(
                "{} file(s) rejected; use --force to send them anyway",
                rejections.len()
            );
        }
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                UploadEvent::Negotiated {
                    filename,
                    attachment_id,
                    ..
                } => tracing::debug!(%filename, attachment_id, "Destination assigned"),
                UploadEvent::Progress {
                    filename, percent, ..
                } => eprintln!("{:<32} {}", filename, progress_bar(percent, 20)),
                UploadEvent::Completed { filename, .. } => eprintln!("{:<32} done", filename),
                UploadEvent::Failed {
                    filename, reason, ..
                } => eprintln!("{:<32} error: {}", filename, reason),
            }
        }
    });

    let refresher = client.clone();
    let orchestrator = UploadOrchestrator::new(client).with_events(tx);
    let result = orchestrator
        .upload(lesson_id, selection, move || async move {
            let Some(training_id) = training else {
                return;
            };
            match refresher.get_training(training_id).await {
                Ok(t) => match t.find_lesson(lesson_id) {
                    Some(lesson) => eprintln!(
                        "Lesson '{}' now has {} attachment(s)",
                        lesson.title,
                        lesson.attachments.len()
                    ),
                    None => tracing::warn!(training_id, lesson_id, "Lesson not found in training"),
                },
                Err(e) => tracing::warn!(training_id, error = %e, "Could not reload training"),
            }
        })
        .await;
    drop(orchestrator);
    printer.await.ok();

    let report = result.context("Could not prepare files for upload")?;
    println!();
    for row in &report.rows {
        println!("{}", upload_row_line(row));
    }

    let failed = report.failed() + report.unassigned();
    if failed > 0 {
        anyhow::bail!("{} of {} upload(s) failed", failed, report.rows.len());
    }
    Ok(())
}

async fn run_fetch_news(app: &App, limit: u32, sites: Vec<String>) -> anyhow::Result<()> {
    let client = app.gated(Area::Superadmin).await?;
    let token = client
        .token()
        .map(str::to_string)
        .ok_or(ApiError::NotLoggedIn)?;

    let mut custom_sites: Vec<String> = Vec::with_capacity(sites.len());
    for site in sites {
        if !site.is_empty() && !custom_sites.contains(&site) {
            custom_sites.push(site);
        }
    }
    let command = FetchCommand {
        limit,
        custom_sites,
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                FetchEvent::Log(line) => println!("{}", line),
                FetchEvent::Status(status) => {
                    tracing::debug!("{}", fetch_progress_line(&status.stage, status.progress))
                }
            }
        }
    });

    let fetcher = NewsFetcher::for_client(&client)?.with_events(tx);
    tracing::debug!(url = fetcher.url(), limit, "Starting news fetch");
    let report = fetcher.run(&token, &command).await;
    drop(fetcher);
    printer.await.ok();

    let report = report?;
    eprintln!(
        "{}",
        fetch_progress_line(&report.status.stage, report.status.progress)
    );
    match report.outcome {
        FetchOutcome::Completed => Ok(()),
        FetchOutcome::ClosedByServer { code, reason } => {
            anyhow::bail!("Fetcher closed the connection ({}): {}", code, reason)
        }
        FetchOutcome::Disconnected => {
            anyhow::bail!("Connection dropped before the fetch completed")
        }
        FetchOutcome::TransportError(e) => anyhow::bail!("Could not reach the fetcher: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn fetch_news_limit_is_bounded() {
        assert!(Cli::try_parse_from(["opshub", "fetch-news", "--limit", "0"]).is_err());
        assert!(Cli::try_parse_from(["opshub", "fetch-news", "--limit", "101"]).is_err());

        let cli = Cli::try_parse_from(["opshub", "fetch-news", "--site", "a.com", "--site", "b.com"])
            .unwrap();
        match cli.command {
            Commands::FetchNews { limit, sites } => {
                assert_eq!(limit, 10);
                assert_eq!(sites, vec!["a.com", "b.com"]);
            }
            _ => panic!("expected fetch-news"),
        }
    }

    #[test]
    fn invite_role_parses_and_rejects_unknown() {
        let cli = Cli::try_parse_from([
            "opshub", "users", "invite", "new@acme.test", "--name", "New Hire", "--role", "Admin",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Users {
                sub: UserCommands::Invite { role: Role::Admin, .. }
            }
        ));
        assert!(Cli::try_parse_from([
            "opshub", "users", "invite", "x@acme.test", "--name", "X", "--role", "root",
        ])
        .is_err());
    }

    #[test]
    fn upload_requires_files() {
        assert!(Cli::try_parse_from(["opshub", "attachments", "upload", "7"]).is_err());
        let cli = Cli::try_parse_from([
            "opshub", "attachments", "upload", "7", "a.pdf", "b.png", "--training", "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Attachments {
                sub:
                    AttachmentCommands::Upload {
                        lesson_id,
                        files,
                        training,
                        force,
                    },
            } => {
                assert_eq!(lesson_id, 7);
                assert_eq!(files.len(), 2);
                assert_eq!(training, Some(3));
                assert!(!force);
            }
            _ => panic!("expected attachments upload"),
        }
    }
}
