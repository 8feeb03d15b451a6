use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use wr25_auth_core::{
    logging, provider, AuthSession, Config, Provider, User, UserData, Wr25Provider,
};

#[derive(Parser, Debug)]
#[command(name = "wr25-auth")]
#[command(about = "wr25 OAuth2 login helper", long_about = None)]
struct Args {
    /// Configuration file (toml, yaml or json)
    #[arg(short, long, env = "WR25_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the authorization URL to open in a browser
    AuthUrl {
        /// Opaque state value; generated when omitted
        #[arg(long)]
        state: Option<String>,
    },
    /// Exchange an authorization code for tokens
    Exchange {
        #[arg(long)]
        code: String,
    },
    /// Obtain a new access token from a refresh token
    Refresh {
        #[arg(long, env = "WR25_REFRESH_TOKEN")]
        refresh_token: String,
    },
    /// Show the profile behind an access token
    Whoami {
        #[arg(long, env = "WR25_ACCESS_TOKEN")]
        access_token: String,
    },
    /// List the groups of the user behind an access token
    Groups {
        #[arg(long, env = "WR25_ACCESS_TOKEN")]
        access_token: String,
    },
    /// Check whether the user behind an access token is in a group
    Member {
        #[arg(long, env = "WR25_ACCESS_TOKEN")]
        access_token: String,
        #[arg(long)]
        group: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("Config validation error: {e}");
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s)",
            errors.len()
        ));
    }

    logging::init_logging(&config.logging)?;
    debug!(provider = %config.provider.name, "Configuration loaded");

    let http_client = provider::http_client(&config.http)?;
    let provider = Wr25Provider::new(http_client, config.provider)?;

    match args.command {
        Command::AuthUrl { state } => {
            let state = state.unwrap_or_else(|| nanoid::nanoid!(32));
            let session = provider.begin_auth(&state);
            info!(state = %state, "Authorization URL generated");
            println!("{}", session.auth_url());
        }
        Command::Exchange { code } => {
            let mut session = AuthSession::default();
            provider.authorize(&mut session, &code).await?;
            let user = provider.fetch_user(&session).await?;
            info!(user_id = %user.user_id, "Authorization code exchanged");
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Command::Refresh { refresh_token } => {
            let token = provider.refresh_token(&refresh_token).await?;
            println!("{}", serde_json::to_string_pretty(&token)?);
        }
        Command::Whoami { access_token } => {
            let session = AuthSession {
                access_token,
                ..AuthSession::default()
            };
            let user = provider.fetch_user(&session).await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Command::Groups { access_token } => {
            let data = user_data(&provider, access_token);
            for group in data.groups().await? {
                println!("{group}");
            }
        }
        Command::Member {
            access_token,
            group,
        } => {
            let data = user_data(&provider, access_token);
            let member = data.user_in(&group).await?;
            println!("{member}");
            if !member {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn user_data(provider: &Wr25Provider, access_token: String) -> UserData {
    let user = User {
        provider: provider.name().to_string(),
        access_token,
        ..User::default()
    };
    UserData::new(provider, user)
}
