use std::num::NonZeroU16;

use clap::Parser;

use crate::constants::DEFAULT_COOKIE_NAME;

#[derive(Parser, Debug, Clone)]
pub struct Cli {
    #[clap(long, default_value = "127.0.0.1", env = "BREAKWATER_HOST")]
    pub host: String,

    #[clap(short, long, default_value = "8098", env = "BREAKWATER_PORT")]
    pub port: NonZeroU16,

    // Credential broker: object store
    #[clap(long, env = "BREAKWATER_S3_ACCESS_KEY_ID")]
    pub s3_access_key_id: String,

    #[clap(long, env = "BREAKWATER_S3_SECRET_ACCESS_KEY")]
    pub s3_secret_access_key: String,

    #[clap(long, default_value = "us-east-1", env = "BREAKWATER_S3_REGION")]
    pub s3_region: String,

    #[clap(long, env = "BREAKWATER_S3_BUCKET")]
    pub s3_bucket: String,

    /// Object store endpoint including scheme, e.g. https://s3.example.com
    #[clap(long, env = "BREAKWATER_S3_ENDPOINT")]
    pub s3_endpoint: String,

    /// Address objects as /bucket/key on the endpoint host rather than
    /// bucket.endpoint
    #[clap(long, default_value = "true", env = "BREAKWATER_S3_PATH_STYLE")]
    pub s3_path_style: bool,

    /// Per-client ceiling for GET presign requests per minute
    #[clap(long, default_value = "30", env = "BREAKWATER_PRESIGN_RATE_LIMIT")]
    pub presign_rate_limit: u32,

    // Identity bridge: token verification
    #[clap(long, env = "BREAKWATER_JWKS_URL")]
    pub jwks_url: String,

    #[clap(long, env = "BREAKWATER_JWT_ISSUER")]
    pub jwt_issuer: String,

    #[clap(long, env = "BREAKWATER_JWT_AUDIENCE")]
    pub jwt_audience: String,

    // Identity bridge: downstream chat platform
    #[clap(long, env = "BREAKWATER_UPSTREAM_URL")]
    pub upstream_url: String,

    #[clap(long, env = "BREAKWATER_UPSTREAM_ADMIN_TOKEN")]
    pub upstream_admin_token: String,

    #[clap(long, env = "BREAKWATER_UPSTREAM_TEAM_ID")]
    pub upstream_team_id: String,

    #[clap(long, env = "BREAKWATER_UPSTREAM_CHANNEL_ID")]
    pub upstream_channel_id: Option<String>,

    // Identity bridge: session cookie
    #[clap(long, default_value = DEFAULT_COOKIE_NAME, env = "BREAKWATER_COOKIE_NAME")]
    pub cookie_name: String,

    #[clap(long, env = "BREAKWATER_COOKIE_DOMAIN")]
    pub cookie_domain: String,

    #[clap(long, default_value = "true", env = "BREAKWATER_COOKIE_SECURE")]
    pub cookie_secure: bool,

    /// Cookie lifetime in seconds when upstream reports no session expiry
    #[clap(long, default_value = "2592000", env = "BREAKWATER_COOKIE_TTL_SECS")]
    pub cookie_ttl_secs: i64,

    /// Optional endpoint for fire-and-forget error reports
    #[clap(long, env = "BREAKWATER_ERROR_REPORT_DSN")]
    pub error_report_dsn: Option<String>,
}
