use crate::args::Args;
use crate::portal::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

/// The environment variable holding the base URL of the ranking service.
pub const API_URL_ENV: &str = "NIRF_API_URL";

pub const DEFAULT_MAX_SUGGESTIONS: usize = 10;

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortalConfig {
    #[serde(rename = "apiBaseUrl")]
    pub api_base_url: Option<String>,
    #[serde(rename = "collegesFile")]
    pub colleges_file: Option<String>,
    #[serde(rename = "predictionsFile")]
    pub predictions_file: Option<String>,
    #[serde(rename = "defaultYear")]
    _default_year: Option<JSValue>,
    #[serde(rename = "maxCompareSelection")]
    _max_compare_selection: Option<JSValue>,
    #[serde(rename = "maxSuggestions")]
    _max_suggestions: Option<JSValue>,
}

impl PortalConfig {
    pub fn default_year(&self) -> PortalResult<Option<usize>> {
        read_js_int_opt(&self._default_year, "defaultYear")
    }

    pub fn max_compare_selection(&self) -> PortalResult<Option<usize>> {
        read_js_int_opt(&self._max_compare_selection, "maxCompareSelection")
    }

    pub fn max_suggestions(&self) -> PortalResult<Option<usize>> {
        read_js_int_opt(&self._max_suggestions, "maxSuggestions")
    }
}

/// Where the records come from.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SourceSettings {
    Http {
        base_url: String,
    },
    Local {
        colleges: PathBuf,
        predictions: Option<PathBuf>,
    },
}

/// The configuration file, the environment and the command line, merged.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Settings {
    pub source: SourceSettings,
    pub year: Year,
    pub max_compare: usize,
    pub max_suggestions: usize,
}

pub fn read_config(path: &str) -> PortalResult<PortalConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: PortalConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn read_summary(path: &str) -> PortalResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

/// Merges the sources of settings. The command line wins over the file, and
/// the file wins over the environment.
pub fn resolve_settings(
    args: &Args,
    config: &PortalConfig,
    config_dir: Option<&Path>,
    env_api_url: Option<String>,
) -> PortalResult<Settings> {
    // Paths of the configuration file are relative to its directory.
    let in_config_dir = |p: &String| match config_dir {
        Some(dir) => dir.join(p),
        None => PathBuf::from(p),
    };

    let source = if let Some(url) = args.api.clone() {
        SourceSettings::Http { base_url: url }
    } else if let Some(colleges) = args.colleges.clone() {
        SourceSettings::Local {
            colleges: PathBuf::from(colleges),
            predictions: args.predictions.clone().map(PathBuf::from),
        }
    } else if let Some(url) = config.api_base_url.clone() {
        SourceSettings::Http { base_url: url }
    } else if let Some(colleges) = config.colleges_file.as_ref() {
        SourceSettings::Local {
            colleges: in_config_dir(colleges),
            predictions: args
                .predictions
                .clone()
                .map(PathBuf::from)
                .or_else(|| config.predictions_file.as_ref().map(&in_config_dir)),
        }
    } else if let Some(url) = env_api_url.filter(|s| !s.is_empty()) {
        SourceSettings::Http { base_url: url }
    } else {
        whatever!(
            "No data source: use --api, --colleges, a configuration file or the {} variable",
            API_URL_ENV
        )
    };

    let year = match args.year {
        Some(y) => y,
        None => config.default_year()?.map(|y| y as i64).unwrap_or(LAST_YEAR as i64),
    };
    let year = checked_year(year).map_err(|e| invalid_option("year", e))?;

    let max_compare = config
        .max_compare_selection()?
        .unwrap_or(DEFAULT_MAX_COMPARE);
    if max_compare == 0 {
        return InvalidOptionSnafu {
            name: "maxCompareSelection",
            message: "must be at least 1",
        }
        .fail();
    }

    let settings = Settings {
        source,
        year,
        max_compare,
        max_suggestions: config.max_suggestions()?.unwrap_or(DEFAULT_MAX_SUGGESTIONS),
    };
    info!("resolve_settings: {:?}", settings);
    Ok(settings)
}

fn read_js_int_opt(x: &Option<JSValue>, name: &str) -> PortalResult<Option<usize>> {
    match x {
        None | Some(JSValue::Null) => Ok(None),
        Some(_) => read_js_int(x, name).map(Some),
    }
}

fn read_js_int(x: &Option<JSValue>, name: &str) -> PortalResult<usize> {
    let res = match x {
        Some(JSValue::Number(n)) => n.as_u64().map(|x| x as usize),
        Some(JSValue::String(s)) => s.trim().parse::<usize>().ok(),
        _ => None,
    };
    res.context(InvalidOptionSnafu {
        name,
        message: format!("expected a positive integer, got {:?}", x),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(js: &str) -> PortalConfig {
        serde_json::from_str(js).unwrap()
    }

    #[test]
    fn numbers_or_strings() {
        let c = config(r#"{"defaultYear": "2021", "maxCompareSelection": 5}"#);
        assert_eq!(c.default_year().unwrap(), Some(2021));
        assert_eq!(c.max_compare_selection().unwrap(), Some(5));
        assert_eq!(c.max_suggestions().unwrap(), None);
        assert!(config(r#"{"maxSuggestions": "ten"}"#).max_suggestions().is_err());
    }

    #[test]
    fn command_line_wins() {
        let c = config(r#"{"apiBaseUrl": "http://file", "defaultYear": 2020}"#);
        let args = Args {
            api: Some("http://flag".to_string()),
            year: Some(2018),
            ..Args::default()
        };
        let s = resolve_settings(&args, &c, None, Some("http://env".to_string())).unwrap();
        assert_eq!(
            s.source,
            SourceSettings::Http {
                base_url: "http://flag".to_string()
            }
        );
        assert_eq!(s.year, 2018);
        assert_eq!(s.max_compare, DEFAULT_MAX_COMPARE);
        assert_eq!(s.max_suggestions, DEFAULT_MAX_SUGGESTIONS);
    }

    #[test]
    fn file_paths_are_relative_to_the_config() {
        let c = config(r#"{"collegesFile": "data/c.csv", "predictionsFile": "p.json"}"#);
        let s = resolve_settings(&Args::default(), &c, Some(Path::new("/etc/nirf")), None).unwrap();
        assert_eq!(
            s.source,
            SourceSettings::Local {
                colleges: PathBuf::from("/etc/nirf/data/c.csv"),
                predictions: Some(PathBuf::from("/etc/nirf/p.json")),
            }
        );
        assert_eq!(s.year, LAST_YEAR);
    }

    #[test]
    fn environment_is_the_fallback() {
        let s = resolve_settings(
            &Args::default(),
            &PortalConfig::default(),
            None,
            Some("http://env".to_string()),
        )
        .unwrap();
        assert_eq!(
            s.source,
            SourceSettings::Http {
                base_url: "http://env".to_string()
            }
        );
        assert!(resolve_settings(&Args::default(), &PortalConfig::default(), None, None).is_err());
    }

    #[test]
    fn invalid_settings() {
        let args = Args {
            api: Some("http://x".to_string()),
            year: Some(2031),
            ..Args::default()
        };
        assert!(resolve_settings(&args, &PortalConfig::default(), None, None).is_err());

        let args = Args {
            api: Some("http://x".to_string()),
            ..Args::default()
        };
        let c = config(r#"{"maxCompareSelection": 0}"#);
        assert!(resolve_settings(&args, &c, None, None).is_err());
    }
}
