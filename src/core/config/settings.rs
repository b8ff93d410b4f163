use super::parsing::{
    env_optional, env_or_default, parse_answer_key, parse_bool, parse_cors_origins,
    parse_environment, parse_u64,
};
use super::types::{
    ApiSettings, ConfigError, CorsSettings, ExamSettings, RuntimeSettings, S3Settings,
    SecretSettings, ServerHost, ServerPort, ServerSettings, Settings, StorageSettings,
    TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("EXAMDROP_HOST", "0.0.0.0");
        let port = env_or_default("EXAMDROP_PORT", "8000");

        let environment =
            parse_environment(env_optional("EXAMDROP_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("EXAMDROP_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Examdrop API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let s3_endpoint = env_or_default("S3_ENDPOINT", "https://storage.yandexcloud.net");
        let s3_access_key = env_or_default("S3_ACCESS_KEY", "");
        let s3_secret_key = env_or_default("S3_SECRET_KEY", "");
        let s3_bucket = env_or_default("S3_BUCKET", "examdrop-submissions");
        let s3_region = env_or_default("S3_REGION", "ru-central1");

        let max_upload_size_mb =
            parse_u64("MAX_UPLOAD_SIZE_MB", env_or_default("MAX_UPLOAD_SIZE_MB", "10"))?;
        let fetch_timeout_seconds =
            parse_u64("FETCH_TIMEOUT_SECONDS", env_or_default("FETCH_TIMEOUT_SECONDS", "30"))?;
        let presigned_url_expire_minutes = parse_u64(
            "PRESIGNED_URL_EXPIRE_MINUTES",
            env_or_default("PRESIGNED_URL_EXPIRE_MINUTES", "5"),
        )?;

        let download_secret = env_optional("DOWNLOAD_SECRET");
        let grading_secret = env_optional("GRADING_SECRET");

        let answer_key = parse_answer_key(env_optional("ANSWER_KEY"))?;

        let log_level = env_or_default("EXAMDROP_LOG_LEVEL", "info");
        let json = env_optional("EXAMDROP_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version },
            cors: CorsSettings { origins: cors_origins },
            s3: S3Settings {
                endpoint: s3_endpoint,
                access_key: s3_access_key,
                secret_key: s3_secret_key,
                bucket: s3_bucket,
                region: s3_region,
            },
            storage: StorageSettings {
                max_upload_size_mb,
                fetch_timeout_seconds,
                presigned_url_expire_minutes,
            },
            secrets: SecretSettings { download_secret, grading_secret },
            exam: ExamSettings { answer_key },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn s3(&self) -> &S3Settings {
        &self.s3
    }

    pub(crate) fn storage(&self) -> &StorageSettings {
        &self.storage
    }

    pub(crate) fn secrets(&self) -> &SecretSettings {
        &self.secrets
    }

    pub(crate) fn exam(&self) -> &ExamSettings {
        &self.exam
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.max_upload_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MAX_UPLOAD_SIZE_MB",
                value: "0".to_string(),
            });
        }

        if self.storage.fetch_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "FETCH_TIMEOUT_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.storage.presigned_url_expire_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "PRESIGNED_URL_EXPIRE_MINUTES",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.s3.access_key.is_empty() || self.s3.secret_key.is_empty() {
            return Err(ConfigError::MissingSecret("S3_ACCESS_KEY/S3_SECRET_KEY"));
        }
        if self.secrets.download_secret.is_none() {
            return Err(ConfigError::MissingSecret("DOWNLOAD_SECRET"));
        }
        if self.secrets.grading_secret.is_none() {
            return Err(ConfigError::MissingSecret("GRADING_SECRET"));
        }

        Ok(())
    }
}
