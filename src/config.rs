use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::error::DalError;

/// Default SQL Server port.
pub const DEFAULT_PORT: u16 = 1433;

/// Every variable suffix a target reads, after its [`Target::env_prefix`].
pub const ENV_SUFFIXES: [&str; 12] = [
    "SERVER",
    "NAME",
    "USER",
    "PASSWORD",
    "PORT",
    "INSTANCE",
    "ENCRYPT",
    "TRUST_SERVER_CERTIFICATE",
    "POOL_MIN",
    "POOL_MAX",
    "IDLE_TIMEOUT_MS",
    "CONNECT_TIMEOUT_MS",
];

/// A logical database the dashboards talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// The main dashboard store.
    Primary,
    /// The secondary HRMS store.
    Hrms,
}

impl Target {
    pub const ALL: [Target; 2] = [Target::Primary, Target::Hrms];

    /// Prefix of the environment variables configuring this target.
    #[must_use]
    pub fn env_prefix(self) -> &'static str {
        match self {
            Target::Primary => "DB_",
            Target::Hrms => "HRMS_DB_",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Target::Primary => "primary",
            Target::Hrms => "hrms",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pool sizing and timing bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub min_connections: u32,
    pub max_connections: u32,
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            min_connections: 0,
            max_connections: 10,
            idle_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(15),
        }
    }
}

/// Everything needed to build the pool for one [`Target`].
#[derive(Clone, PartialEq, Eq)]
pub struct TargetConfig {
    pub target: Target,
    pub server: String,
    pub database: String,
    pub user: String,
    pub password: String,
    pub port: u16,
    pub instance_name: Option<String>,
    pub encrypt: bool,
    pub trust_server_certificate: bool,
    pub pool: PoolSettings,
}

// Manual Debug implementation so the password never reaches a log line
impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("target", &self.target)
            .field("server", &self.server)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("instance_name", &self.instance_name)
            .field("encrypt", &self.encrypt)
            .field("trust_server_certificate", &self.trust_server_certificate)
            .field("pool", &self.pool)
            .finish()
    }
}

impl TargetConfig {
    #[must_use]
    pub fn builder(
        target: Target,
        server: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> TargetConfigBuilder {
        TargetConfigBuilder::new(target, server, database, user, password)
    }

    /// Load a target from the process environment.
    ///
    /// # Errors
    /// Returns `DalError::ConfigError` when a required variable is missing or
    /// any value is malformed.
    pub fn from_env(target: Target) -> Result<Self, DalError> {
        Self::from_lookup(target, |key| std::env::var(key).ok())
    }

    /// Load a target through `lookup`, which maps a variable name to its value.
    ///
    /// Server, database, user and password are required; there are no built-in
    /// fallbacks for them.
    ///
    /// # Errors
    /// Returns `DalError::ConfigError` when a required variable is missing or
    /// any value is malformed.
    pub fn from_lookup<F>(target: Target, lookup: F) -> Result<Self, DalError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { target, lookup: &lookup };
        let defaults = PoolSettings::default();

        let pool = PoolSettings {
            min_connections: env.parsed("POOL_MIN")?.unwrap_or(defaults.min_connections),
            max_connections: env.parsed("POOL_MAX")?.unwrap_or(defaults.max_connections),
            idle_timeout: env
                .parsed("IDLE_TIMEOUT_MS")?
                .map_or(defaults.idle_timeout, Duration::from_millis),
            connect_timeout: env
                .parsed("CONNECT_TIMEOUT_MS")?
                .map_or(defaults.connect_timeout, Duration::from_millis),
        };

        TargetConfigBuilder::new(
            target,
            env.required("SERVER")?,
            env.required("NAME")?,
            env.required("USER")?,
            env.required("PASSWORD")?,
        )
        .port(env.parsed("PORT")?.unwrap_or(DEFAULT_PORT))
        .instance_name(env.get("INSTANCE"))
        .encrypt(env.flag("ENCRYPT")?.unwrap_or(true))
        .trust_server_certificate(env.flag("TRUST_SERVER_CERTIFICATE")?.unwrap_or(false))
        .pool(pool)
        .build()
    }

    /// True when at least one of the target's variables is set.
    pub fn is_present<F>(target: Target, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        ENV_SUFFIXES
            .iter()
            .any(|suffix| lookup(&format!("{}{suffix}", target.env_prefix())).is_some())
    }

    /// Check the values a builder or loader produced.
    ///
    /// # Errors
    /// Returns `DalError::ConfigError` describing the first problem found.
    pub fn validate(&self) -> Result<(), DalError> {
        let prefix = self.target.env_prefix();
        for (name, value) in [
            ("SERVER", &self.server),
            ("NAME", &self.database),
            ("USER", &self.user),
            ("PASSWORD", &self.password),
        ] {
            if value.trim().is_empty() {
                return Err(DalError::ConfigError(format!("{prefix}{name} is required")));
            }
        }
        if self.pool.max_connections == 0 {
            return Err(DalError::ConfigError(format!(
                "{prefix}POOL_MAX must be greater than zero"
            )));
        }
        if self.pool.min_connections > self.pool.max_connections {
            return Err(DalError::ConfigError(format!(
                "{prefix}POOL_MIN ({}) exceeds {prefix}POOL_MAX ({})",
                self.pool.min_connections, self.pool.max_connections
            )));
        }
        if self.pool.idle_timeout.is_zero() {
            return Err(DalError::ConfigError(format!(
                "{prefix}IDLE_TIMEOUT_MS must be greater than zero"
            )));
        }
        if self.pool.connect_timeout.is_zero() {
            return Err(DalError::ConfigError(format!(
                "{prefix}CONNECT_TIMEOUT_MS must be greater than zero"
            )));
        }
        Ok(())
    }
}

struct Env<'a, F> {
    target: Target,
    lookup: &'a F,
}

impl<F> Env<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn key(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.target.env_prefix())
    }

    fn get(&self, suffix: &str) -> Option<String> {
        (self.lookup)(&self.key(suffix)).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, suffix: &str) -> Result<String, DalError> {
        self.get(suffix)
            .ok_or_else(|| DalError::ConfigError(format!("{} is required", self.key(suffix))))
    }

    fn parsed<T: FromStr>(&self, suffix: &str) -> Result<Option<T>, DalError> {
        self.get(suffix)
            .map(|raw| {
                raw.trim().parse::<T>().map_err(|_| {
                    DalError::ConfigError(format!("{} has invalid value {raw:?}", self.key(suffix)))
                })
            })
            .transpose()
    }

    fn flag(&self, suffix: &str) -> Result<Option<bool>, DalError> {
        self.get(suffix)
            .map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(DalError::ConfigError(format!(
                    "{} must be true or false, got {raw:?}",
                    self.key(suffix)
                ))),
            })
            .transpose()
    }
}

/// Fluent builder for [`TargetConfig`].
#[derive(Debug, Clone)]
pub struct TargetConfigBuilder {
    config: TargetConfig,
}

impl TargetConfigBuilder {
    #[must_use]
    pub fn new(
        target: Target,
        server: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            config: TargetConfig {
                target,
                server: server.into(),
                database: database.into(),
                user: user.into(),
                password: password.into(),
                port: DEFAULT_PORT,
                instance_name: None,
                encrypt: true,
                trust_server_certificate: false,
                pool: PoolSettings::default(),
            },
        }
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    #[must_use]
    pub fn instance_name(mut self, instance_name: Option<String>) -> Self {
        self.config.instance_name = instance_name;
        self
    }

    #[must_use]
    pub fn encrypt(mut self, encrypt: bool) -> Self {
        self.config.encrypt = encrypt;
        self
    }

    #[must_use]
    pub fn trust_server_certificate(mut self, trust: bool) -> Self {
        self.config.trust_server_certificate = trust;
        self
    }

    #[must_use]
    pub fn pool(mut self, pool: PoolSettings) -> Self {
        self.config.pool = pool;
        self
    }

    #[must_use]
    pub fn max_connections(mut self, max: u32) -> Self {
        self.config.pool.max_connections = max;
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.pool.connect_timeout = timeout;
        self
    }

    /// # Errors
    /// Returns `DalError::ConfigError` if the assembled config is invalid.
    pub fn build(self) -> Result<TargetConfig, DalError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
