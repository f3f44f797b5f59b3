//! Command-line front end.
//!
//! ```ignore
//! use bazaar::cli::{parse_args, run_cli_command};
//!
//! let command = parse_args(std::env::args())?;
//! run_cli_command(command).await?;
//! ```

pub mod args;

pub use args::{parse_args, CliCommand, USAGE};

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use color_eyre::eyre::Report;
use color_eyre::Result;
use tracing::{debug, warn};

use crate::adapters::{FileSessionStorage, ReqwestHttpClient, RestAuthBackend, RestBackend};
use crate::config::BackendConfig;
use crate::error::{AuthError, ErrorContext, MarketError, MarketResult, ResultExt};
use crate::models::{tables, Category, Listing};
use crate::query::{QueryClient, QueryConfig, QueryKey};
use crate::resources::Marketplace;
use crate::session::{AuthGate, AuthService, SessionStore};
use crate::traits::HttpClient;

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything a command needs, wired from the environment.
pub struct Runtime {
    pub market: Marketplace,
    pub auth: AuthService,
}

impl Runtime {
    pub async fn from_env() -> Result<Self> {
        let config = BackendConfig::from_env()
            .context(ErrorContext::new("load_config"))
            .map_err(report)?;
        let http: Arc<dyn HttpClient> = match config.request_timeout {
            Some(timeout) => Arc::new(ReqwestHttpClient::with_timeout(timeout)?),
            None => Arc::new(ReqwestHttpClient::new()),
        };

        let store = Arc::new(SessionStore::new());
        let storage = FileSessionStorage::new()?;
        let auth = AuthService::new(
            Arc::new(RestAuthBackend::new(config.clone(), Arc::clone(&http))),
            Arc::new(storage),
            Arc::clone(&store),
        );

        let mut query_config = QueryConfig::default();
        if let Some(timeout) = config.request_timeout {
            query_config = query_config.with_request_timeout(timeout);
        }
        let client = QueryClient::new(query_config);
        let backend = RestBackend::new(config, http).with_session(store.subscribe());
        AuthGate::new(client.clone(), store.subscribe()).spawn();

        let market = Marketplace::new(client, Arc::new(backend), store.subscribe());
        Ok(Self { market, auth })
    }

    /// Restore the saved session, failing when there is none.
    async fn signed_in(&self, operation: &str) -> MarketResult<()> {
        let session = self
            .auth
            .restore()
            .await
            .with_context(|| ErrorContext::new(operation))?;
        match session {
            Some(session) => {
                debug!(user = %session.user_id(), "using saved session");
                Ok(())
            }
            None => Err(MarketError::from(AuthError::NotAuthenticated)
                .with_context(ErrorContext::new(operation))),
        }
    }
}

/// Run one command to completion.
pub async fn run_cli_command(command: CliCommand) -> Result<()> {
    match command {
        CliCommand::Version => {
            println!("bazaar {}", VERSION);
            Ok(())
        }
        CliCommand::Help => {
            print!("{}", USAGE);
            Ok(())
        }
        command => {
            let runtime = Runtime::from_env().await?;
            run_with(&runtime, command, &mut io::stdout()).await
        }
    }
}

/// Run a backend command against `runtime`, writing results to `out`.
///
/// A failure is reported with its user-facing message and a hint; the
/// underlying [`MarketError`] stays reachable through `downcast_ref`.
pub async fn run_with<W: Write>(runtime: &Runtime, command: CliCommand, out: &mut W) -> Result<()> {
    run_command(runtime, command, out).await.map_err(report)
}

async fn run_command<W: Write>(runtime: &Runtime, command: CliCommand, out: &mut W) -> MarketResult<()> {
    match command {
        CliCommand::Feed { limit } => {
            runtime.signed_in("feed").await?;
            let feed = runtime.market.published_listings(false, limit);
            feed.fetch()
                .await
                .with_context(|| listings_context("feed", feed.key()))?;
            print_listings(out, &feed.items()).context(ErrorContext::new("write_output"))?;
        }
        CliCommand::Drafts { limit } => {
            runtime.signed_in("drafts").await?;
            let drafts = runtime.market.draft_listings(limit);
            drafts
                .fetch()
                .await
                .with_context(|| listings_context("drafts", drafts.key()))?;
            print_listings(out, &drafts.items()).context(ErrorContext::new("write_output"))?;
        }
        CliCommand::Search { text, limit } => {
            runtime.signed_in("search").await?;
            let results = runtime.market.search_listings(text, limit);
            results
                .fetch()
                .await
                .with_context(|| listings_context("search", results.key()))?;
            print_listings(out, &results.items()).context(ErrorContext::new("write_output"))?;
        }
        CliCommand::Categories => {
            let categories = runtime
                .market
                .categories()
                .fetch()
                .await
                .with_context(|| ErrorContext::new("categories").with_resource(tables::CATEGORIES))?
                .unwrap_or_default();
            print_categories(out, &categories).context(ErrorContext::new("write_output"))?;
        }
        CliCommand::Login => {
            let email = prompt("Email: ").context(ErrorContext::new("read_email"))?;
            let password = rpassword::prompt_password("Password: ")
                .context(ErrorContext::new("read_password"))?;
            let session = runtime
                .auth
                .sign_in(&email, &password)
                .await
                .with_context(|| ErrorContext::new("login"))?;
            writeln!(
                out,
                "Signed in as {}",
                session.user.email.as_deref().unwrap_or(session.user_id().as_str())
            )
            .context(ErrorContext::new("write_output"))?;
        }
        CliCommand::Logout => {
            runtime
                .auth
                .restore()
                .await
                .with_context(|| ErrorContext::new("logout"))?;
            let line = match runtime.auth.sign_out().await {
                Ok(()) => "Signed out".to_string(),
                Err(err) => format!("Signed out locally ({})", err.user_message()),
            };
            writeln!(out, "{}", line).context(ErrorContext::new("write_output"))?;
        }
        CliCommand::Version | CliCommand::Help => {}
    }
    Ok(())
}

fn listings_context(operation: &str, key: Option<QueryKey>) -> ErrorContext {
    let ctx = ErrorContext::new(operation).with_resource(tables::PRODUCTS);
    match key {
        Some(key) => ctx.with_query_key(key),
        None => ctx,
    }
}

/// Log a failed command and turn it into what the user sees.
fn report(err: MarketError) -> Report {
    warn!(
        code = err.error_code(),
        category = %err.category(),
        context = %err.context().map(ErrorContext::to_log_string).unwrap_or_default(),
        error = %err,
        "command failed"
    );
    let hint = if err.requires_reauth() {
        "Run `bazaar login`."
    } else {
        err.recovery_hint()
    };
    let message = format!("{} {}", err.user_message(), hint);
    Report::new(err).wrap_err(message)
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

pub fn print_listings<W: Write>(out: &mut W, listings: &[Listing]) -> io::Result<()> {
    if listings.is_empty() {
        return writeln!(out, "No listings.");
    }
    for listing in listings {
        let title = listing.title.as_deref().unwrap_or("(untitled)");
        match listing.price {
            Some(price) => writeln!(out, "#{:<6} {}  {}", listing.id, title, price)?,
            None => writeln!(out, "#{:<6} {}", listing.id, title)?,
        }
    }
    Ok(())
}

pub fn print_categories<W: Write>(out: &mut W, categories: &[Category]) -> io::Result<()> {
    for category in categories {
        writeln!(out, "{:>4}  {}", category.id, category.title)?;
    }
    Ok(())
}
