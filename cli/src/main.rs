use std::path::PathBuf;
use std::rc::Rc;

use clap::{Args, Parser, Subcommand};
use fenix_client::net::transport::ReqwestTransport;
use fenix_client::net::types::{AccountStatus, LoginRequest, RegisterRequest, Role, UserFilter};
use fenix_client::router::navigator::NavigationOutcome;
use fenix_client::state::storage::{FileStorage, StorageBackend};
use fenix_client::{AdminApi, ClientConfig, ClientError, Navigator, RouteTable, SessionManager, TokenStore};
use serde::Serialize;


#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Navigation(#[from] fenix_client::router::navigator::NavigationError),
    #[error("not signed in; run `fenix login` first")]
    NotSignedIn,
    #[error("navigation superseded")]
    Superseded,
    #[error("invalid JSON output: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "fenix", about = "FENIX portal session and moderation CLI")]
struct Cli {
    /// Overrides `FENIX_API_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    #[arg(long, env = "FENIX_STATE_FILE", default_value = ".fenix-session.json")]
    state_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the token pair in the state file.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "FENIX_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    /// Print the signed-in profile, refreshing it if stale.
    Whoami,
    /// Print the account's approval status.
    Status,
    Register(RegisterArgs),
    Admin(AdminCommand),
    /// Show where the guard would send the current session for a path.
    Route { path: String },
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    full_name: String,
    #[arg(long, env = "FENIX_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long, default_value = "student")]
    role: Role,
    #[arg(long)]
    course: Option<String>,
    #[arg(long)]
    group: Option<String>,
}

#[derive(Args, Debug)]
struct AdminCommand {
    #[command(subcommand)]
    command: AdminSubcommand,
}

#[derive(Subcommand, Debug)]
enum AdminSubcommand {
    Users {
        #[arg(long)]
        status: Option<AccountStatus>,
        #[arg(long)]
        role: Option<Role>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    Pending {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    Approve {
        user_id: i64,
    },
    Reject {
        user_id: i64,
    },
    SetStatus {
        user_id: i64,
        status: AccountStatus,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn client_config(base_url: Option<&str>) -> ClientConfig {
    let config = ClientConfig::from_env();
    match base_url {
        Some(url) => ClientConfig { api_base_url: ClientConfig::with_base_url(url).api_base_url, ..config },
        None => config,
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = client_config(cli.base_url.as_deref());
    let transport = ReqwestTransport::new(config.timeouts)?;
    let storage: Rc<dyn StorageBackend> = Rc::new(FileStorage::new(&cli.state_file));
    let session = SessionManager::new(&config, Rc::new(transport), TokenStore::new(storage));

    if let Err(err) = session.init().await {
        tracing::warn!(error = %err, "could not restore session");
    }

    match cli.command {
        Command::Login { email, password } => {
            let user = session.login(&LoginRequest::new(&email, &password)).await?;
            print_json(&user)
        }
        Command::Logout => {
            session.logout().await;
            println!("signed out");
            Ok(())
        }
        Command::Whoami => {
            let user = session.user().ok_or(CliError::NotSignedIn)?;
            print_json(&user)
        }
        Command::Status => {
            require_session(&session)?;
            let report = session.check_status().await?;
            println!("{}: {}", report.status, report.message);
            Ok(())
        }
        Command::Register(args) => {
            let request = RegisterRequest {
                email: args.email,
                full_name: args.full_name,
                password: args.password,
                role: args.role,
                course: args.course,
                group: args.group,
            };
            let account = session.register(&request).await?;
            match account.user {
                Some(user) => print_json(&user),
                None => {
                    println!("registered; awaiting approval");
                    Ok(())
                }
            }
        }
        Command::Admin(admin) => {
            require_session(&session)?;
            run_admin(&AdminApi::new(session), admin).await
        }
        Command::Route { path } => {
            let navigator = Navigator::new(session, Rc::new(RouteTable::portal()), &config);
            match navigator.navigate(&path).await? {
                NavigationOutcome::Committed(location) => {
                    println!("{} ({})", location.full_path, location.route.name);
                    Ok(())
                }
                NavigationOutcome::Superseded => Err(CliError::Superseded),
            }
        }
    }
}

async fn run_admin(admin: &AdminApi, command: AdminCommand) -> Result<(), CliError> {
    match command.command {
        AdminSubcommand::Users { status, role, page, limit } => {
            let page = admin.list_users(&UserFilter { status, role, page, limit }).await?;
            print_user_page(&page.users, page.page, page.pages, page.total)
        }
        AdminSubcommand::Pending { page, limit } => {
            let page = admin.pending_users(page, limit).await?;
            print_user_page(&page.users, page.page, page.pages, page.total)
        }
        AdminSubcommand::Approve { user_id } => report_change(admin.approve(user_id).await?.message),
        AdminSubcommand::Reject { user_id } => report_change(admin.reject(user_id).await?.message),
        AdminSubcommand::SetStatus { user_id, status } => {
            report_change(admin.set_status(user_id, status).await?.message)
        }
    }
}

fn require_session(session: &SessionManager) -> Result<(), CliError> {
    if session.is_authenticated() { Ok(()) } else { Err(CliError::NotSignedIn) }
}

fn print_user_page<T: Serialize>(users: &[T], page: u32, pages: u32, total: u64) -> Result<(), CliError> {
    print_json(&users)?;
    eprintln!("page {page}/{pages} ({total} total)");
    Ok(())
}

fn report_change(message: String) -> Result<(), CliError> {
    if message.is_empty() {
        println!("ok");
    } else {
        println!("{message}");
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
