use anyhow::ensure;
use serde::Deserialize;

/// Largest TTLs accepted from the environment.
pub const MAX_JWT_TTL_MINUTES: i64 = 60 * 24 * 365;
pub const MAX_RESET_TTL_MINUTES: i64 = 60 * 24;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Argon2id work factor.
#[derive(Debug, Clone, Deserialize)]
pub struct HashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Trusted issuer of external identity tokens (RS256).
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub issuer: String,
    pub audience: String,
    pub public_key_pem: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub hashing: HashConfig,
    pub reset_ttl_minutes: i64,
    pub identity: Option<IdentityConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok();
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "tasknest".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "tasknest-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60 * 24 * 30),
        };
        let defaults = HashConfig::default();
        let hashing = HashConfig {
            memory_kib: env_parse("PASSWORD_HASH_MEMORY_KIB").unwrap_or(defaults.memory_kib),
            iterations: env_parse("PASSWORD_HASH_ITERATIONS").unwrap_or(defaults.iterations),
            parallelism: env_parse("PASSWORD_HASH_PARALLELISM").unwrap_or(defaults.parallelism),
        };
        let identity = match (
            std::env::var("EXTERNAL_ID_ISSUER"),
            std::env::var("EXTERNAL_ID_AUDIENCE"),
            std::env::var("EXTERNAL_ID_PUBLIC_KEY"),
        ) {
            (Ok(issuer), Ok(audience), Ok(public_key_pem)) => Some(IdentityConfig {
                issuer,
                audience,
                public_key_pem,
            }),
            _ => None,
        };

        let config = Self {
            database_url,
            jwt,
            hashing,
            reset_ttl_minutes: env_parse("RESET_TOKEN_TTL_MINUTES").unwrap_or(60),
            identity,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.jwt.secret.is_empty(), "JWT_SECRET must not be empty");
        ensure!(
            (1..=MAX_JWT_TTL_MINUTES).contains(&self.jwt.ttl_minutes),
            "JWT_TTL_MINUTES must be between 1 and {MAX_JWT_TTL_MINUTES}, got {}",
            self.jwt.ttl_minutes
        );
        ensure!(
            (1..=MAX_RESET_TTL_MINUTES).contains(&self.reset_ttl_minutes),
            "RESET_TOKEN_TTL_MINUTES must be between 1 and {MAX_RESET_TTL_MINUTES}, got {}",
            self.reset_ttl_minutes
        );
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
