//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `HOTSPUR_*` env
//! vars (`__` separates nesting, e.g. `HOTSPUR_SEARCH__MAX_LIMIT`). Paths are
//! expanded for `~` and `${VAR}`.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::Error;

/// Smallest per-thread arena tantivy accepts for an index writer.
pub const MIN_WRITER_HEAP_PER_THREAD: usize = 15_000_000;
/// Largest edit distance tantivy's fuzzy automata support.
pub const MAX_FUZZY_DISTANCE: u8 = 2;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("HOTSPUR_").split("__"));
        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract and validate the full typed settings; missing keys take defaults.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub parser: ParserConfig,
    pub index: IndexConfig,
    pub search: SearchConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub context_lines: usize,
    /// Authoritative work list. When empty the table of contents is used.
    pub known_titles: Vec<String>,
    pub verse_title_hints: Vec<String>,
    pub min_speaker_cues: usize,
    pub min_blank_lines_before_title: usize,
    pub front_matter_scan_limit: usize,
    pub untitled_work_label: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            context_lines: 5,
            known_titles: Vec::new(),
            verse_title_hints: vec![
                "SONNET".to_string(),
                "VENUS AND ADONIS".to_string(),
                "LUCRECE".to_string(),
                "PASSIONATE PILGRIM".to_string(),
                "PHOENIX AND THE TURTLE".to_string(),
                "LOVER'S COMPLAINT".to_string(),
                "LOVER\u{2019}S COMPLAINT".to_string(),
            ],
            min_speaker_cues: 3,
            min_blank_lines_before_title: 2,
            front_matter_scan_limit: 1000,
            untitled_work_label: "UNKNOWN WORK".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub index_dir: String,
    pub writer_heap_bytes: usize,
    pub writer_threads: usize,
    pub show_progress: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_dir: "data/index".to_string(),
            writer_heap_bytes: 50_000_000,
            writer_threads: 1,
            show_progress: false,
        }
    }
}

impl IndexConfig {
    pub fn index_path(&self) -> PathBuf {
        expand_path(&self.index_dir)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    pub fuzzy_max_distance: u8,
    pub all_works_label: String,
    pub regex_scan_budget: usize,
    pub regex_size_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 100,
            max_limit: 1000,
            fuzzy_max_distance: MAX_FUZZY_DISTANCE,
            all_works_label: "All Works".to_string(),
            regex_scan_budget: 200_000,
            regex_size_limit: 1 << 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { filter: "info".to_string() }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.search.fuzzy_max_distance > MAX_FUZZY_DISTANCE {
            return Err(Error::InvalidConfig(format!(
                "search.fuzzy_max_distance is {}; tantivy supports at most {}",
                self.search.fuzzy_max_distance, MAX_FUZZY_DISTANCE
            )));
        }
        if self.search.max_limit < self.search.default_limit {
            return Err(Error::InvalidConfig(format!(
                "search.max_limit ({}) is below search.default_limit ({})",
                self.search.max_limit, self.search.default_limit
            )));
        }
        if self.search.regex_scan_budget == 0 {
            return Err(Error::InvalidConfig("search.regex_scan_budget must be positive".to_string()));
        }
        if self.index.writer_threads == 0 {
            return Err(Error::InvalidConfig("index.writer_threads must be positive".to_string()));
        }
        if self.index.writer_heap_bytes / self.index.writer_threads < MIN_WRITER_HEAP_PER_THREAD {
            return Err(Error::InvalidConfig(format!(
                "index.writer_heap_bytes gives {} bytes per thread; at least {} required",
                self.index.writer_heap_bytes / self.index.writer_threads,
                MIN_WRITER_HEAP_PER_THREAD
            )));
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().expect("defaults validate");
        assert_eq!(settings.parser.context_lines, 5);
        assert_eq!(settings.search.all_works_label, "All Works");
    }

    #[test]
    fn validation_rejects_impossible_values() {
        let mut settings = Settings::default();
        settings.search.fuzzy_max_distance = 3;
        assert!(settings.validate().is_err(), "fuzzy distance above tantivy's limit");

        let mut settings = Settings::default();
        settings.index.writer_threads = 4;
        settings.index.writer_heap_bytes = 20_000_000;
        assert!(settings.validate().is_err(), "per-thread arena too small");

        let mut settings = Settings::default();
        settings.search.max_limit = 10;
        assert!(settings.validate().is_err(), "max below default");
    }

    #[test]
    fn file_and_env_layers_merge_over_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [search]
                max_limit = 250

                [parser]
                known_titles = ["THE SONNETS"]
                "#,
            )?;
            jail.create_file("config.test.toml", "[index]\nindex_dir = \"/tmp/hotspur-test-index\"\n")?;
            jail.set_env("HOTSPUR_PARSER__CONTEXT_LINES", "3");

            let config = Config::load_for_env("test").map_err(|e| e.to_string())?;
            let settings = config.settings().map_err(|e| e.to_string())?;
            assert_eq!(settings.search.max_limit, 250);
            assert_eq!(settings.search.default_limit, 100);
            assert_eq!(settings.parser.context_lines, 3);
            assert_eq!(settings.parser.known_titles, vec!["THE SONNETS".to_string()]);
            assert_eq!(settings.index.index_path(), PathBuf::from("/tmp/hotspur-test-index"));

            let limit: usize = config.get("search.max_limit").map_err(|e| e.to_string())?;
            assert_eq!(limit, 250);
            Ok(())
        });
    }

    #[test]
    fn index_dir_expands_environment_variables() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("HOTSPUR_TEST_ROOT", "/srv/hotspur");
            let config = IndexConfig { index_dir: "${HOTSPUR_TEST_ROOT}/index".to_string(), ..IndexConfig::default() };
            assert_eq!(config.index_path(), PathBuf::from("/srv/hotspur/index"));
            Ok(())
        });
    }
}
