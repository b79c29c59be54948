use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "chirpy", version, about = "Chirpy credential tooling")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the version.
    Version,

    /// Hash a password with bcrypt.
    HashPassword { password: String },

    /// Check a password against a bcrypt hash.
    VerifyPassword {
        password: String,
        #[arg(long)]
        hash: String,
    },

    /// Issue a signed access token for a user.
    IssueToken {
        #[arg(long)]
        user_id: Uuid,
        /// Requested lifetime; clamped to the one hour ceiling.
        #[arg(long)]
        ttl_secs: Option<i64>,
        #[arg(long, env = "SIGNING_KEY", hide_env_values = true)]
        secret: String,
    },

    /// Validate an access token and print its user id.
    ValidateToken {
        token: String,
        #[arg(long, env = "SIGNING_KEY", hide_env_values = true)]
        secret: String,
    },

    /// Print a fresh random refresh token (not persisted).
    RefreshToken,

    /// Load the auth configuration from the environment and print it (secrets redacted).
    CheckConfig,

    /// Apply the auth schema migrations.
    Migrate {
        #[arg(long, env = "DB_URL", hide_env_values = true)]
        database_url: String,
    },
}
