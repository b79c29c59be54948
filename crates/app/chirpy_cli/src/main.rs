// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use chirpy_core::auth::{jwt, password, refresh};
use chirpy_core::config::{AuthConfig, clamp_access_ttl};
use clap::Parser;
use cli::{Cli, Commands};

mod cli;
mod logging;

fn main() -> Result<()> {
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    // A missing .env is fine; variables may come from the real environment.
    let _ = dotenvy::dotenv();
    logging::init()?;

    let args = Cli::parse();

    match args.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
        Commands::HashPassword { password } => {
            println!("{}", password::hash_password(&password)?);
        }
        Commands::VerifyPassword { password, hash } => {
            if password::verify_password(&password, &hash)? {
                println!("match");
            } else {
                return Err(Error::Custom("password does not match".into()));
            }
        }
        Commands::IssueToken {
            user_id,
            ttl_secs,
            secret,
        } => {
            let ttl = clamp_access_ttl(ttl_secs);
            let token = jwt::issue_access_token(user_id, secret.as_bytes(), ttl)?;
            log::info!("issued access token for {user_id}, valid {}s", ttl.num_seconds());
            println!("{token}");
        }
        Commands::ValidateToken { token, secret } => {
            println!("{}", jwt::validate_access_token(&token, secret.as_bytes())?);
        }
        Commands::RefreshToken => {
            println!("{}", refresh::generate_refresh_token());
        }
        Commands::CheckConfig => {
            println!("{:?}", AuthConfig::from_env()?);
        }
        Commands::Migrate { database_url } => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(chirpy_core::migrate::connect(&database_url))?;
            println!("migrations applied");
        }
    }

    Ok(())
}
