use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// Platform value that turns on development behaviour
/// (detailed 500 bodies, `/admin/reset`).
pub const DEV_PLATFORM: &str = "dev";

/// Centralized application configuration.
/// Built once at start-up and shared read-only through `AppState`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub db_path: String,
    pub jwt_secret: String,
    pub platform: String,
    pub filepath_root: PathBuf,
    pub assets_root: PathBuf,
    pub s3_bucket: String,
    pub s3_region: String,
}

/// Command-line + environment configuration.
///
/// Every value is required. When neither the flag nor the variable is
/// present, clap reports the missing argument and the process exits.
#[derive(Parser, Debug)]
#[command(author, version, about = "Tubely video hosting API")]
pub struct Args {
    /// Path of the SQLite database file
    #[arg(long, env = "DB_PATH")]
    pub db_path: String,

    /// Secret used to sign access tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Deployment platform; `dev` enables development behaviour
    #[arg(long, env = "PLATFORM")]
    pub platform: String,

    /// Directory holding the static web app
    #[arg(long, env = "FILEPATH_ROOT")]
    pub filepath_root: PathBuf,

    /// Directory holding thumbnails and in-flight uploads
    #[arg(long, env = "ASSETS_ROOT")]
    pub assets_root: PathBuf,

    /// Bucket receiving processed videos
    #[arg(long, env = "S3_BUCKET")]
    pub s3_bucket: String,

    /// Region of the bucket
    #[arg(long, env = "S3_REGION")]
    pub s3_region: String,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: u16,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // A missing .env is fine; the real environment still applies.
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                return Err(err.into());
            }
        }

        let args = Args::parse();
        let migrate = args.migrate;
        Ok((Self::from(args), migrate))
    }

    pub fn addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn is_dev(&self) -> bool {
        self.platform == DEV_PLATFORM
    }

    /// Base URL under which files in `assets_root` are served.
    pub fn assets_base_url(&self) -> String {
        format!("http://localhost:{}/assets", self.port)
    }
}

impl From<Args> for AppConfig {
    fn from(args: Args) -> Self {
        Self {
            port: args.port,
            db_path: args.db_path,
            jwt_secret: args.jwt_secret,
            platform: args.platform,
            filepath_root: args.filepath_root,
            assets_root: args.assets_root,
            s3_bucket: args.s3_bucket,
            s3_region: args.s3_region,
        }
    }
}
