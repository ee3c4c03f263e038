//! Run configuration.
//!
//! Loaded from, in order of precedence:
//! 1. `--config <path>`
//! 2. `LOOKOUT_CONFIG` environment variable
//! 3. Built-in defaults
//!
//! Every field has a default, so a file only needs the keys it overrides.

use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::backend::BackendKind;
use crate::harvest::Category;

const CONFIG_ENV: &str = "LOOKOUT_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarvestConfig {
    /// Report path; `{date}` is replaced by the run date (YYYY-MM-DD).
    pub output: String,
    /// Categories queried for every subject, in this order.
    pub categories: Vec<Category>,
    /// Upper bound on a single backend call, retries included.
    pub call_timeout_secs: u64,
    pub backend: BackendConfig,
    pub pacing: PacingConfig,
    pub subjects: Vec<Subject>,
    pub profiles: Profiles,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// DuckDuckGo region code, e.g. `es-es` or `wt-wt`.
    pub region: String,
    /// Time window: `d`, `w`, `m` or `y`. Unset searches all dates.
    pub timelimit: Option<String>,
    /// Per-request HTTP timeout.
    pub timeout_secs: u64,
}

/// Politeness delay bands in seconds, `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PacingConfig {
    pub search: (f64, f64),
    pub document: (f64, f64),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Subject {
    pub name: String,
    /// Informational tags (fashion, pharma, ...). Never affect the harvest.
    #[serde(default)]
    pub groups: Vec<String>,
}

impl Subject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
        }
    }

    /// Whether `name` names this subject, ignoring surrounding space and
    /// ASCII case.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(name.trim())
    }

    fn tagged(name: &str, group: &str) -> Self {
        Self {
            name: name.to_string(),
            groups: vec![group.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryProfile {
    /// Boolean keyword clause appended after the quoted subject.
    pub keywords: String,
    pub backend: BackendKind,
    pub result_limit: usize,
    /// Document extension for `filetype:` constrained queries.
    #[serde(default)]
    pub filetype: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "PascalCase")]
pub struct Profiles {
    pub counterfeit_news: CategoryProfile,
    pub phishing_news: CategoryProfile,
    pub annual_report: CategoryProfile,
}

impl Profiles {
    pub fn get(&self, category: Category) -> &CategoryProfile {
        match category {
            Category::CounterfeitNews => &self.counterfeit_news,
            Category::PhishingNews => &self.phishing_news,
            Category::AnnualReport => &self.annual_report,
        }
    }

    fn iter(&self) -> impl Iterator<Item = (Category, &CategoryProfile)> {
        Category::all().iter().map(|&c| (c, self.get(c)))
    }
}

impl Default for Profiles {
    fn default() -> Self {
        Self {
            counterfeit_news: CategoryProfile {
                keywords: "(incautados OR falsificaciones OR policia OR redada OR réplicas)".into(),
                backend: BackendKind::News,
                result_limit: 3,
                filetype: None,
            },
            phishing_news: CategoryProfile {
                keywords:
                    "(alerta estafa OR phishing OR \"campaña fraudulenta\" OR ciberdelincuencia)"
                        .into(),
                backend: BackendKind::News,
                result_limit: 3,
                filetype: None,
            },
            annual_report: CategoryProfile {
                keywords: "(\"informe anual\" OR \"annual report\" OR \"gestión de riesgos\")"
                    .into(),
                backend: BackendKind::Filetype,
                result_limit: 2,
                filetype: Some("pdf".into()),
            },
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            search: (1.5, 3.0),
            document: (2.0, 5.0),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            region: "es-es".into(),
            timelimit: Some("y".into()),
            timeout_secs: 20,
        }
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            output: "brand_news_report_{date}.csv".into(),
            categories: vec![Category::CounterfeitNews, Category::PhishingNews],
            call_timeout_secs: 30,
            backend: BackendConfig::default(),
            pacing: PacingConfig::default(),
            subjects: default_subjects(),
            profiles: Profiles::default(),
        }
    }
}

impl HarvestConfig {
    /// Loads from `path`, else from `LOOKOUT_CONFIG`, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));

        let config = match path {
            Some(path) => {
                info!(path = %path.display(), "loading config");
                let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subjects.is_empty() {
            return Err(invalid("at least one subject is required"));
        }
        let mut seen = HashSet::new();
        for subject in &self.subjects {
            if subject.name.trim().is_empty() {
                return Err(invalid("subject names must not be empty"));
            }
            if !seen.insert(subject.name.trim().to_ascii_lowercase()) {
                return Err(invalid(format!("duplicate subject: {}", subject.name)));
            }
        }

        if self.categories.is_empty() {
            return Err(invalid("at least one category is required"));
        }
        let mut seen = HashSet::new();
        for category in &self.categories {
            if !seen.insert(*category) {
                return Err(invalid(format!("duplicate category: {category}")));
            }
        }

        for (category, profile) in self.profiles.iter() {
            if profile.result_limit == 0 {
                return Err(invalid(format!(
                    "{category}: result_limit must be greater than 0"
                )));
            }
            if profile.backend == BackendKind::Filetype
                && profile.filetype.as_deref().is_none_or(|f| f.trim().is_empty())
            {
                return Err(invalid(format!(
                    "{category}: filetype backend requires a filetype"
                )));
            }
        }

        for (name, (min, max)) in [
            ("search", self.pacing.search),
            ("document", self.pacing.document),
        ] {
            if !(min.is_finite() && max.is_finite()) || min < 0.0 || min > max {
                return Err(invalid(format!(
                    "pacing.{name} must satisfy 0 <= min <= max"
                )));
            }
        }

        if self.call_timeout_secs == 0 || self.backend.timeout_secs == 0 {
            return Err(invalid("timeouts must be greater than 0"));
        }
        if self.output.trim().is_empty() {
            return Err(invalid("output path must not be empty"));
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

fn default_subjects() -> Vec<Subject> {
    const FASHION: &[&str] = &[
        "Mango",
        "Desigual",
        "Bimba y Lola",
        "Loewe",
        "Tous",
        "Aristocrazy",
        "Uno de 50",
        "PDPAOLA",
        "Majorica",
        "Suarez",
        "Rabat",
        "Festina",
        "Camper",
        "Pikolinos",
        "Munich Sports",
        "Hoff Brand",
        "Pompeii Brand",
        "Joma",
        "Scalpers",
        "El Ganso",
        "Silbon",
        "Ecoalf",
        "Hawkers",
        "Pedro del Hierro",
        "Cortefiel",
        "Springfield",
        "Women'secret",
        "Purificacion Garcia",
        "Adolfo Dominguez",
        "Lola Casademunt",
        "Mayoral",
        "Panama Jack",
        "Pretty Ballerinas",
        "Lottusse",
        "El Corte Inglés",
    ];
    const PHARMA: &[&str] = &[
        "ISDIN",
        "Natura Bissé",
        "Cantabria Labs",
        "Germaine de Capuccini",
        "Sesderma",
        "Cinfa",
        "Almirall",
        "Grifols",
        "Laboratorios Rovi",
    ];
    const FOOD: &[&str] = &[
        "Mercadona",
        "Estrella Galicia",
        "Mahou",
        "Osborne",
        "Cinco Jotas",
        "Joselito Ham",
        "Vega Sicilia",
        "Familia Torres",
        "Freixenet",
        "Deoleo",
        "El Pozo",
        "Valor Chocolates",
        "Codorníu",
    ];
    const FINANCE: &[&str] = &[
        "Banco Santander",
        "BBVA",
        "CaixaBank",
        "Mapfre",
        "Mutua Madrileña",
        "Cirsa",
        "Codere",
        "Seat",
        "Cupra",
        "Cecotec",
    ];

    [
        (FASHION, "fashion"),
        (PHARMA, "pharma"),
        (FOOD, "food"),
        (FINANCE, "finance"),
    ]
    .into_iter()
    .flat_map(|(names, group)| names.iter().map(move |name| Subject::tagged(name, group)))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = HarvestConfig::default();
        config.validate().unwrap();
        assert_eq!(config.subjects.len(), 67);
        assert_eq!(config.subjects[0].name, "Mango");
        assert_eq!(config.subjects[0].groups, vec!["fashion"]);
        assert_eq!(
            config.categories,
            vec![Category::CounterfeitNews, Category::PhishingNews]
        );
        assert_eq!(config.pacing.search, (1.5, 3.0));
        assert_eq!(config.backend.region, "es-es");
    }

    #[test]
    fn default_limits_match_verticals() {
        let profiles = Profiles::default();
        assert_eq!(profiles.get(Category::CounterfeitNews).result_limit, 3);
        assert_eq!(profiles.get(Category::PhishingNews).result_limit, 3);
        assert_eq!(profiles.get(Category::AnnualReport).result_limit, 2);
        assert_eq!(profiles.get(Category::AnnualReport).backend, BackendKind::Filetype);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = HarvestConfig::from_toml(
            r#"
categories = ["CounterfeitNews", "AnnualReport"]

[backend]
region = "wt-wt"

[[subjects]]
name = "Acme"
groups = ["test"]

[profiles.AnnualReport]
keywords = "(10-K)"
backend = "Filetype"
result_limit = 1
filetype = "pdf"
"#,
        )
        .unwrap();

        config.validate().unwrap();
        assert_eq!(config.subjects, vec![Subject::tagged("Acme", "test")]);
        assert_eq!(config.backend.region, "wt-wt");
        assert_eq!(config.backend.timelimit.as_deref(), Some("y"));
        assert_eq!(config.profiles.annual_report.result_limit, 1);
        assert_eq!(
            config.profiles.counterfeit_news,
            Profiles::default().counterfeit_news
        );
        assert_eq!(config.output, "brand_news_report_{date}.csv");
    }

    #[test]
    fn example_file_is_valid() {
        let config = HarvestConfig::from_toml(include_str!("../lookout.example.toml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.categories.len(), 3);
        assert_eq!(config.subjects.len(), 3);
    }

    #[test]
    fn unknown_category_is_parse_error() {
        let err = HarvestConfig::from_toml(r#"categories = ["Weather"]"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_duplicate_subjects() {
        let config = HarvestConfig {
            subjects: vec![Subject::new("A"), Subject::new("A")],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate subject"), "got: {err}");
    }

    #[test]
    fn duplicate_check_ignores_case_and_surrounding_space() {
        let config = HarvestConfig {
            subjects: vec![Subject::new("Acme"), Subject::new(" acme")],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate subject"), "got: {err}");
    }

    #[test]
    fn rejects_empty_subjects_and_categories() {
        let config = HarvestConfig {
            subjects: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = HarvestConfig {
            categories: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_result_limit() {
        let mut config = HarvestConfig::default();
        config.profiles.phishing_news.result_limit = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("PhishingNews"), "got: {err}");
    }

    #[test]
    fn rejects_filetype_backend_without_extension() {
        let mut config = HarvestConfig::default();
        config.profiles.annual_report.filetype = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_pacing_band() {
        let config = HarvestConfig {
            pacing: PacingConfig {
                search: (3.0, 1.0),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pacing.search"), "got: {err}");
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = HarvestConfig {
            call_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reads_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "output = \"out/{{date}}.csv\"\n[[subjects]]\nname = \"X\"").unwrap();

        let config = HarvestConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.output, "out/{date}.csv");
        assert_eq!(config.subjects.len(), 1);
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let err = HarvestConfig::load(Some(Path::new("/nonexistent/lookout.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
