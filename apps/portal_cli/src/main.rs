use std::{path::PathBuf, sync::Arc};

use account_flow::{
    build_http_client, AccountActionModel, CsrfToken, EnrollmentClient, Orchestrator,
    QueryContext, RedirectResolver, SubmissionError,
};
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use shared::domain::{AccountFields, AccountKind};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod config;
mod navigator;

use config::{load_settings, Settings, DEFAULT_CONFIG_FILE};
use navigator::StdoutNavigator;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Overrides `base_url` from the config file and environment.
    #[arg(long)]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login(SubmitArgs),
    Register(SubmitArgs),
}

#[derive(Args, Debug)]
struct SubmitArgs {
    /// Full URL of the account page, including its query string.
    #[arg(long)]
    page_url: String,
    #[arg(long, conflicts_with = "cookie", required_unless_present = "cookie")]
    csrf_token: Option<String>,
    /// Raw `Cookie` header to take the anti-forgery token from.
    #[arg(long)]
    cookie: Option<String>,
    /// Form field as `key=value`; repeatable.
    #[arg(long = "field", value_parser = parse_field)]
    fields: Vec<(String, String)>,
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty field name in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn csrf_token(args: &SubmitArgs, settings: &Settings) -> Result<CsrfToken> {
    match (&args.csrf_token, &args.cookie) {
        (Some(token), _) => CsrfToken::new(token.as_str()).context("invalid --csrf-token"),
        (None, Some(cookie)) => CsrfToken::from_cookie_header(cookie, &settings.csrf_cookie_name)
            .context("cannot read anti-forgery token from --cookie"),
        (None, None) => Err(anyhow!("either --csrf-token or --cookie is required")),
    }
}

async fn submit(kind: AccountKind, args: SubmitArgs, settings: &Settings) -> Result<()> {
    let http = build_http_client(settings.request_timeout())?;
    let token = csrf_token(&args, settings)?;
    let endpoint = match kind {
        AccountKind::Login => settings.endpoint(&settings.login_path)?,
        AccountKind::Register => settings.endpoint(&settings.registration_path)?,
    };
    let query = QueryContext::from_page_url(&args.page_url).context("invalid --page-url")?;

    let routes = settings.routes();
    let orchestrator = Orchestrator::new(
        AccountActionModel::new(http.clone(), kind, endpoint, token.clone()),
        EnrollmentClient::new(http, settings.base_url()?, routes.clone(), token),
        RedirectResolver::new(routes),
        Arc::new(StdoutNavigator),
    );

    let fields = args
        .fields
        .into_iter()
        .fold(AccountFields::default(), |fields, (key, value)| {
            fields.with(key, value)
        });

    match orchestrator.submit(&fields, query).await {
        Ok(_) => Ok(()),
        Err(SubmissionError::Account(failure)) => {
            error!(status = ?failure.status, body = %failure.body, "{} failed", kind.as_str());
            Err(failure.into())
        }
        Err(err) => Err(err.into()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(&cli.config);
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }

    match cli.command {
        Command::Login(args) => submit(AccountKind::Login, args, &settings).await,
        Command::Register(args) => submit(AccountKind::Register, args, &settings).await,
    }
}
