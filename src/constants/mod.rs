pub struct Env {
    pub jwt_secret: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub redis_url: String,
    pub frontend_url: String,
    pub ip: String,
    pub port: u16,
    pub workers: usize,
    pub upload_dir: String,
    pub upload_base_url: String,
    pub max_upload_size: usize,
}

/// Seconds a presence key survives without a heartbeat.
pub const PRESENCE_TTL: u64 = 60;
/// How often a live socket refreshes its presence key.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 15;
/// Cached user profiles expire after one hour.
pub const USER_CACHE_TTL: usize = 3600;

pub const DEFAULT_PAGE_SIZE: i64 = 30;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const MAX_GROUP_NAME_LEN: usize = 100;
pub const MAX_MESSAGE_LEN: usize = 4000;

impl Env {
    fn new() -> Self {
        let jwt_secret = std::env::var("SECRET_KEY")
            .expect("SECRET_KEY must be set in .env file or environment variable");

        let database_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set in .env file or environment variable");
        let db_max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .expect("DB_MAX_CONNECTIONS must be a valid u32 integer");
        let redis_url = std::env::var("REDIS_URL")
            .expect("REDIS_URL must be set in .env file or environment variable");

        let frontend_url =
            std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:4200".to_string());
        let ip = std::env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .expect("PORT must be a valid u16 integer");
        let workers = std::env::var("WORKERS")
            .unwrap_or_else(|_| "2".to_string())
            .parse::<usize>()
            .expect("WORKERS must be a valid usize integer");

        let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string());
        let upload_base_url =
            std::env::var("UPLOAD_BASE_URL").unwrap_or_else(|_| "/uploads".to_string());
        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .unwrap_or_else(|_| (10 * 1024 * 1024).to_string())
            .parse::<usize>()
            .expect("MAX_UPLOAD_SIZE must be a valid usize integer");

        Env {
            jwt_secret,
            database_url,
            db_max_connections,
            redis_url,
            frontend_url,
            ip,
            port,
            workers,
            upload_dir,
            upload_base_url,
            max_upload_size,
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
