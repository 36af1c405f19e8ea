pub const DEFAULT_TABLE: &str = "cv-visit-counter";

/// Function configuration, read from the Lambda environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub table: String,
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let table = get("DYNAMODB_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_string());
        let origins = get("ALLOWED_ORIGINS").unwrap_or_else(|| "*".to_string());
        Self {
            table,
            allowed_origins: parse_origins(&origins),
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
