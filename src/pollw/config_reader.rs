use crate::pollw::*;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

pub const DEFAULT_CACHE_PATH: &str = "public/data/municipalities.json";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_NOT_AVAILABLE_LABEL: &str = "#N/D";
pub const DEFAULT_ENCODING: &str = "utf-8";

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    pub title: Option<String>,
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct MunicipalitySource {
    pub url: Option<String>,
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    #[serde(rename = "cachePath")]
    pub cache_path: Option<String>,
    #[serde(rename = "forceRefresh")]
    pub force_refresh: Option<bool>,
    /// Keeps the extracted snapshot in memory instead of the cache file.
    #[serde(rename = "noCache")]
    pub no_cache: Option<bool>,
    #[serde(rename = "timeoutSeconds")]
    pub timeout_seconds: Option<u64>,
}

impl MunicipalitySource {
    /// The local file if one is set, otherwise the URL.
    pub fn location(&self) -> String {
        self.file_path
            .clone()
            .or_else(|| self.url.clone())
            .unwrap_or_else(|| IBGE_ESTIMATES_URL.to_string())
    }

    pub fn cache_path(&self) -> &str {
        self.cache_path.as_deref().unwrap_or(DEFAULT_CACHE_PATH)
    }

    pub fn force_refresh(&self) -> bool {
        self.force_refresh.unwrap_or(false)
    }

    pub fn no_cache(&self) -> bool {
        self.no_cache.unwrap_or(false)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PollFileSource {
    #[serde(rename = "filePath")]
    pub file_path: String,
    pub encoding: Option<String>,
}

impl PollFileSource {
    pub fn encoding(&self) -> &str {
        self.encoding.as_deref().unwrap_or(DEFAULT_ENCODING)
    }
}

/// The header names of the poll columns. They are matched exactly.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PollColumns {
    #[serde(rename = "searchId")]
    pub search_id: String,
    pub date: String,
    pub municipality: String,
    pub state: String,
    pub vote: String,
}

impl Default for PollColumns {
    fn default() -> Self {
        PollColumns {
            search_id: "ID_PESQUISA".to_string(),
            date: "DATA_PESQUISA".to_string(),
            municipality: "MUNICÍPIO".to_string(),
            state: "ESTADO".to_string(),
            vote: "INTENÇÃO DE VOTO".to_string(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollFormat {
    pub columns: Option<PollColumns>,
    #[serde(rename = "notAvailableLabel")]
    pub not_available_label: Option<String>,
}

impl PollFormat {
    pub fn columns(&self) -> PollColumns {
        self.columns.clone().unwrap_or_default()
    }

    pub fn not_available_label(&self) -> &str {
        self.not_available_label
            .as_deref()
            .unwrap_or(DEFAULT_NOT_AVAILABLE_LABEL)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct PwRules {
    #[serde(rename = "dateGrouping")]
    pub date_grouping: Option<String>,
    #[serde(rename = "dateOrder")]
    pub date_order: Option<String>,
    #[serde(rename = "emptyGroups")]
    pub empty_groups: Option<String>,
    #[serde(rename = "tierWeights")]
    pub tier_weights: Option<Vec<u32>>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct PwConfig {
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
    #[serde(rename = "municipalitySource", default)]
    pub municipality_source: MunicipalitySource,
    #[serde(rename = "pollFileSources", default)]
    pub poll_file_sources: Vec<PollFileSource>,
    #[serde(rename = "pollFormat", default)]
    pub poll_format: PollFormat,
    #[serde(default)]
    pub rules: PwRules,
}

pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn rebase_path(root: &Path, p: &mut String) {
    if is_remote(p) || Path::new(p.as_str()).is_absolute() {
        return;
    }
    *p = root.join(p.as_str()).display().to_string();
}

impl PwConfig {
    /// Resolves the relative paths against the directory of the configuration file.
    pub fn rebase(&mut self, root: &Path) {
        if let Some(p) = self.municipality_source.file_path.as_mut() {
            rebase_path(root, p);
        }
        if let Some(p) = self.municipality_source.cache_path.as_mut() {
            rebase_path(root, p);
        }
        if let Some(p) = self.output_settings.output_path.as_mut() {
            if p.as_str() != "stdout" {
                rebase_path(root, p);
            }
        }
        for pfs in self.poll_file_sources.iter_mut() {
            rebase_path(root, &mut pfs.file_path);
        }
    }
}

pub fn validate_rules(r: &PwRules) -> PwResult<AggregationRules> {
    let d = AggregationRules::DEFAULT_RULES;
    let date_grouping = match r.date_grouping.as_deref() {
        None => d.date_grouping,
        Some("canonical") => DateGrouping::Canonical,
        Some("rawString") => DateGrouping::RawString,
        Some(x) => {
            return InvalidRuleSnafu {
                option: "dateGrouping",
                value: x,
            }
            .fail()
        }
    };
    let date_order = match r.date_order.as_deref() {
        None => d.date_order,
        Some("dayFirst") => DateOrder::DayFirst,
        Some("monthFirst") => DateOrder::MonthFirst,
        Some(x) => {
            return InvalidRuleSnafu {
                option: "dateOrder",
                value: x,
            }
            .fail()
        }
    };
    let empty_groups = match r.empty_groups.as_deref() {
        None => d.empty_groups,
        Some("emitNaN") => EmptyGroupPolicy::EmitNaN,
        Some("omit") => EmptyGroupPolicy::Omit,
        Some(x) => {
            return InvalidRuleSnafu {
                option: "emptyGroups",
                value: x,
            }
            .fail()
        }
    };
    let weights = match r.tier_weights.as_deref() {
        None => d.weights,
        // Every resolved record would weigh nothing.
        Some(&[0, 0, 0, 0]) => {
            return InvalidRuleSnafu {
                option: "tierWeights",
                value: "[0, 0, 0, 0]",
            }
            .fail()
        }
        Some(&[w1, w2, w3, w4]) => TierWeights([w1, w2, w3, w4]),
        Some(x) => {
            return InvalidRuleSnafu {
                option: "tierWeights",
                value: format!("{:?}", x),
            }
            .fail()
        }
    };
    Ok(AggregationRules {
        date_grouping,
        date_order,
        empty_groups,
        weights,
    })
}

pub fn read_config(path: &str) -> BPwResult<PwConfig> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let config: PwConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(config)
}

pub fn read_summary(path: &str) -> BPwResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}
