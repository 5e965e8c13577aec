use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "picturebot", about = "A LINE bot that turns phrases into images")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Channel access token for the LINE Messaging API
    #[arg(long, env = "LINE_ACCESS_TOKEN", hide_env_values = true)]
    pub line_access_token: Option<String>,

    /// API key for the image generation service
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// API key for the translation service
    #[arg(long, env = "TRANSLATE_API_KEY", hide_env_values = true)]
    pub translate_api_key: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the webhook server (default)
    Serve,
    /// Replace the example tables with the contents of a TOML seed file
    ImportExamples { path: PathBuf },
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub line: LineConfig,
    pub generation: GenerationConfig,
    pub translation: TranslationConfig,
    pub limits: LimitsConfig,
    pub suggestions: SuggestionsConfig,
    pub messages: MessagesConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LineConfig {
    pub access_token: String,
    pub reply_url: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    pub api_key: String,
    pub url: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct TranslationConfig {
    /// Empty key disables translation; phrases go to the generator as typed.
    pub api_key: String,
    pub url: String,
    pub source: String,
    pub target: String,
}

/// LINE rejects a reply carrying more quick-reply items than this.
pub const MAX_QUICK_REPLY_ITEMS: usize = 13;

/// One year; keeps window arithmetic far from `chrono`'s range limits.
pub const MAX_WINDOW_HOURS: i64 = 24 * 366;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LimitsConfig {
    pub usage_limit: usize,
    pub window_hours: i64,
    pub max_input_length: usize,
    pub suggestion_count: usize,
    pub label_max_len: usize,
    pub text_max_len: usize,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Categorized,
    Curated,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CompositionPart {
    pub category: String,
    #[serde(default)]
    pub suffix: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SuggestionsConfig {
    pub strategy: StrategyKind,
    pub composition: Vec<CompositionPart>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MessagesConfig {
    pub welcome: String,
    pub non_text: String,
    pub quota_exceeded: String,
    pub generation_failed: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            reply_url: "https://api.line.me/v2/bot/message/reply".to_string(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            url: "https://api.openai.com/v1/images/generations".to_string(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            url: "https://translation.googleapis.com/language/translate/v2".to_string(),
            source: "ja".to_string(),
            target: "en".to_string(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            usage_limit: 100,
            window_hours: 24,
            max_input_length: 1000,
            suggestion_count: 3,
            label_max_len: 20,
            text_max_len: 300,
        }
    }
}

impl Default for SuggestionsConfig {
    fn default() -> Self {
        let part = |category: &str, suffix: &str| CompositionPart {
            category: category.to_string(),
            suffix: suffix.to_string(),
        };
        Self {
            strategy: StrategyKind::Categorized,
            composition: vec![
                part("場所", "で"),
                part("動詞", ""),
                part("名詞", "の"),
                part("スタイル", ""),
            ],
        }
    }
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            welcome: "入力されたフレーズをもとに、AIが画像を生成します。\nまずは以下のメッセージを「タップ」してお試しください！\n10秒ほどで画像が生成されます。".to_string(),
            non_text: "テキストメッセージを送信してください。".to_string(),
            quota_exceeded: "いつもご利用いただきありがとうございます。\n本日の利用制限回数に到達しました🙇‍♂".to_string(),
            generation_failed: "画像を生成できませんでした。別のフレーズを入力するか、しばらく待ってから再度お試しください。".to_string(),
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI and environment overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref token) = cli.line_access_token {
            config.line.access_token = token.clone();
        }
        if let Some(ref key) = cli.openai_api_key {
            config.generation.api_key = key.clone();
        }
        if let Some(ref key) = cli.translate_api_key {
            config.translation.api_key = key.clone();
        }

        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("picturebot.db"));
        }

        Ok(config)
    }

    /// Checks that must pass before the webhook server starts.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.line.access_token.trim().is_empty() {
            anyhow::bail!("LINE access token is not configured");
        }
        if self.generation.api_key.trim().is_empty() {
            anyhow::bail!("image generation API key is not configured");
        }
        let limits = &self.limits;
        if limits.usage_limit == 0
            || limits.window_hours <= 0
            || limits.max_input_length == 0
            || limits.label_max_len == 0
            || limits.text_max_len == 0
        {
            anyhow::bail!("limits must be positive");
        }
        if limits.window_hours > MAX_WINDOW_HOURS {
            anyhow::bail!("window_hours must be at most {MAX_WINDOW_HOURS}");
        }
        if limits.suggestion_count > MAX_QUICK_REPLY_ITEMS {
            anyhow::bail!("suggestion_count must be at most {MAX_QUICK_REPLY_ITEMS}");
        }
        if self.suggestions.strategy == StrategyKind::Categorized
            && self.suggestions.composition.is_empty()
        {
            anyhow::bail!("categorized suggestions need at least one composition part");
        }
        Ok(())
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".picturebot")
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("picturebot.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with(data_dir: Option<PathBuf>) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir,
            line_access_token: None,
            openai_api_key: None,
            translate_api_key: None,
            command: None,
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.limits.usage_limit, 100);
        assert_eq!(config.limits.max_input_length, 1000);
        assert_eq!(config.limits.suggestion_count, 3);
        assert_eq!(config.limits.label_max_len, 20);
        assert_eq!(config.limits.text_max_len, 300);
        assert_eq!(config.suggestions.strategy, StrategyKind::Categorized);
        assert_eq!(config.suggestions.composition.len(), 4);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli_with(Some(PathBuf::from("/tmp/test-picturebot")));
        assert_eq!(Config::data_dir(&cli), PathBuf::from("/tmp/test-picturebot"));
    }

    #[test]
    fn data_dir_defaults_to_dot_picturebot() {
        let dir = Config::data_dir(&cli_with(None));
        assert!(dir.ends_with(".picturebot"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli_with(Some(tmp.path().to_path_buf()))).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.db_path(), tmp.path().join("picturebot.db"));
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[limits]
usage_limit = 5
suggestion_count = 10

[suggestions]
strategy = "curated"

[messages]
welcome = "hi there"
"#,
        )
        .unwrap();

        let mut cli = cli_with(Some(tmp.path().to_path_buf()));
        cli.config = Some(config_path);
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.limits.usage_limit, 5);
        assert_eq!(config.limits.suggestion_count, 10);
        // Unset fields in a section keep their defaults
        assert_eq!(config.limits.max_input_length, 1000);
        assert_eq!(config.suggestions.strategy, StrategyKind::Curated);
        assert_eq!(config.messages.welcome, "hi there");
        assert_eq!(
            config.messages.non_text,
            MessagesConfig::default().non_text
        );
    }

    #[test]
    fn cli_secrets_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[line]
access_token = "from-file"
"#,
        )
        .unwrap();

        let mut cli = cli_with(Some(tmp.path().to_path_buf()));
        cli.config = Some(config_path);
        cli.line_access_token = Some("from-env".to_string());
        cli.openai_api_key = Some("sk-test".to_string());
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.line.access_token, "from-env");
        assert_eq!(config.generation.api_key, "sk-test");
    }

    #[test]
    fn validate_requires_secrets() {
        let mut config = Config::default();
        assert!(config.validate().is_err());

        config.line.access_token = "token".to_string();
        assert!(config.validate().is_err());

        config.generation.api_key = "key".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_limits() {
        let mut config = Config::default();
        config.line.access_token = "token".to_string();
        config.generation.api_key = "key".to_string();
        config.limits.usage_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_bounds_suggestions_and_window() {
        let mut config = Config::default();
        config.line.access_token = "token".to_string();
        config.generation.api_key = "key".to_string();

        config.limits.suggestion_count = MAX_QUICK_REPLY_ITEMS;
        assert!(config.validate().is_ok());
        config.limits.suggestion_count = MAX_QUICK_REPLY_ITEMS + 1;
        assert!(config.validate().is_err());

        config.limits.suggestion_count = 3;
        config.limits.window_hours = MAX_WINDOW_HOURS;
        assert!(config.validate().is_ok());
        config.limits.window_hours = i64::MAX;
        assert!(config.validate().is_err());
    }
}
