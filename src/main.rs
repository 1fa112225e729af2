use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use robokey::cli::{
    self, AdminCommands, ProjectCommands, RobotCommands, TokenCommands, UserCommands,
    http_client::ApiClient,
};
use robokey::config::{ConfigFile, ServerConfig};
use robokey::robot::StaticCatalog;
use robokey::server::{AppState, create_router};
use robokey::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "robokey")]
#[command(about = "Robot account service for registry projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands (run against the local database)
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Manage robot accounts through a running server
    Robot {
        /// Server URL
        #[arg(long, env = "ROBOKEY_SERVER", default_value = "http://127.0.0.1:8080")]
        server: String,

        /// Access token
        #[arg(long, env = "ROBOKEY_TOKEN", hide_env_values = true)]
        token: String,

        #[command(subcommand)]
        command: RobotCommands,
    },

    /// Start the server
    Serve {
        /// TOML config file; flags override its values
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// TOML file listing the policies robots may be granted
        #[arg(long)]
        policy_catalog: Option<PathBuf>,

        /// Per-request deadline for robot operations
        #[arg(long)]
        request_timeout_secs: Option<u64>,
    },
}

fn run_admin(command: AdminCommands) -> anyhow::Result<()> {
    match command {
        AdminCommands::Init {
            data_dir,
            non_interactive,
        } => cli::run_init(data_dir, non_interactive),
        AdminCommands::Project { command } => match command {
            ProjectCommands::Add {
                data_dir,
                name,
                non_interactive,
            } => cli::run_project_add(data_dir, name, non_interactive),
            ProjectCommands::List { data_dir, json } => cli::run_project_list(data_dir, json),
            ProjectCommands::Remove {
                data_dir,
                project,
                non_interactive,
                yes,
            } => cli::run_project_remove(data_dir, project, non_interactive, yes),
        },
        AdminCommands::User { command } => match command {
            UserCommands::Add {
                data_dir,
                username,
                create_token,
                non_interactive,
            } => cli::run_user_add(data_dir, username, create_token, non_interactive),
            UserCommands::List { data_dir, json } => cli::run_user_list(data_dir, json),
        },
        AdminCommands::Token { command } => match command {
            TokenCommands::Create {
                data_dir,
                user,
                expires_days,
                non_interactive,
            } => cli::run_token_create(data_dir, user, expires_days, non_interactive),
        },
        AdminCommands::Grant {
            data_dir,
            user,
            project,
            permissions,
            deny,
            non_interactive,
        } => cli::run_grant(data_dir, user, project, permissions, deny, non_interactive),
        AdminCommands::Revoke {
            data_dir,
            user,
            project,
            non_interactive,
            yes,
        } => cli::run_revoke(data_dir, user, project, non_interactive, yes),
    }
}

fn run_robot(server: &str, token: &str, command: RobotCommands) -> anyhow::Result<()> {
    let client = ApiClient::new(server, token)?;

    match command {
        RobotCommands::Create {
            project,
            name,
            description,
            access,
            expires_days,
            json,
        } => cli::run_robot_create(
            &client,
            project,
            name,
            description,
            access,
            expires_days,
            json,
        ),
        RobotCommands::List {
            project,
            q,
            page,
            page_size,
            json,
        } => cli::run_robot_list(&client, project, q, page, page_size, json),
        RobotCommands::Get { project, id, json } => cli::run_robot_get(&client, project, id, json),
        RobotCommands::Update {
            project,
            id,
            disable,
            description,
        } => cli::run_robot_update(&client, project, id, disable, description),
        RobotCommands::Delete { project, id, yes } => {
            cli::run_robot_delete(&client, project, id, yes)
        }
    }
}

async fn serve(mut config: ServerConfig) -> anyhow::Result<()> {
    let token_file = config.data_dir.join(".admin_token");
    if !config.db_path().exists() {
        bail!(
            "Server not initialized. Run 'robokey admin init' first to create the database and admin token."
        );
    }

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    if !store.has_admin_token()? {
        bail!(
            "Server not initialized. Run 'robokey admin init' first to create the database and admin token."
        );
    }

    if token_file.exists() {
        info!("Admin token available at {}", token_file.display());
    }

    let catalog = match config.policy_catalog.take() {
        Some(path) => {
            info!("Loading policy catalog from {}", path.display());
            StaticCatalog::load(&path)?
        }
        None => StaticCatalog::builtin(),
    };
    info!("Policy catalog has {} entries", catalog.policies().len());

    let state = Arc::new(AppState::new(
        Arc::new(store),
        catalog,
        config.request_timeout,
    ));

    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("robokey=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => run_admin(command)?,
        Commands::Robot {
            server,
            token,
            command,
        } => {
            // The blocking HTTP client must not run on the async runtime.
            tokio::task::spawn_blocking(move || run_robot(&server, &token, command)).await??;
        }
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
            policy_catalog,
            request_timeout_secs,
        } => {
            let mut server_config = match config {
                Some(path) => ServerConfig::from_file(ConfigFile::load(path)?),
                None => ServerConfig::default(),
            };
            if let Some(host) = host {
                server_config.host = host;
            }
            if let Some(port) = port {
                server_config.port = port;
            }
            if let Some(data_dir) = data_dir {
                server_config.data_dir = data_dir;
            }
            if let Some(path) = policy_catalog {
                server_config.policy_catalog = Some(path);
            }
            if let Some(secs) = request_timeout_secs {
                if secs == 0 {
                    bail!("--request-timeout-secs must be positive");
                }
                server_config.request_timeout = Duration::from_secs(secs);
            }

            serve(server_config).await?;
        }
    }

    Ok(())
}
