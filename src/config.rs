//! Client configuration.
//!
//! Built from defaults, then every `--config` file in the order given
//! (yaml or json), then the command line overrides. Problems are reported
//! with the dotted path of the offending key and the file it came from.

use std::path::{Path, PathBuf};
use std::fmt::{Display, Formatter};
use std::time::Duration;

use nimbus_api::client::ApiClient;
use url::Url;

use crate::path::{metadata, normalize};
use crate::store::StoreOptions;
use crate::{settings, upload};

mod shape;
pub mod error;

use error::Context;

pub const DEFAULT_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Default, clap::Args)]
pub struct ConfigArgs {
    /// a config file to load, may be given multiple times
    #[arg(long)]
    pub config: Vec<PathBuf>,

    /// overrides server.url
    #[arg(long)]
    pub url: Option<String>,

    /// overrides server.token
    #[arg(long)]
    pub token: Option<String>,
}

#[derive(Debug)]
pub struct Config {
    pub server: Server,
    pub data_dir: PathBuf,
    pub uploads: Uploads,
    pub search: Debounce,
    pub settings: Debounce,
}

impl Config {
    pub fn from_args(args: ConfigArgs) -> error::Result<Self> {
        let cwd = std::env::current_dir()
            .context("failed to retrieve cwd for config")?;
        let mut config = Config::default_in(&cwd)?;

        for config_path in args.config {
            let full = if config_path.is_absolute() {
                config_path
            } else {
                normalize(cwd.join(config_path))
            };

            tracing::debug!("loading config file \"{}\"", full.display());

            let loaded = Self::load_file(&full)?;
            let src = SrcFile::new(&full)?;

            config.merge(&src, loaded)?;
        }

        if let Some(url) = args.url {
            config.server.url = parse_url(&url).context(format!(
                "--url \"{url}\" is not a valid url"
            ))?;
        }

        if let Some(token) = args.token {
            config.server.token = Some(token);
        }

        if let Some(meta) = metadata(&config.data_dir).context("failed to retrieve metadata for data_dir")? {
            if !meta.is_dir() {
                return Err(error::Error::new().context(format!(
                    "data_dir \"{}\" is not a directory", config.data_dir.display()
                )));
            }
        }

        tracing::debug!("{config:#?}");

        Ok(config)
    }

    fn default_in(cwd: &Path) -> error::Result<Self> {
        Ok(Config {
            server: Server {
                url: parse_url(DEFAULT_URL).context("invalid default server url")?,
                token: None,
                timeout: DEFAULT_TIMEOUT,
                user_agent: None,
            },
            data_dir: cwd.join("nimbus_data"),
            uploads: Uploads {
                max_concurrent: upload::DEFAULT_MAX_CONCURRENT,
            },
            search: Debounce {
                delay: Duration::from_millis(300),
            },
            settings: Debounce {
                delay: settings::DEFAULT_DEBOUNCE,
            },
        })
    }

    fn load_file(path: &Path) -> error::Result<shape::Config> {
        let ext = path.extension().context(format!(
            "failed to retrieve the file extension for config file: \"{}\"", path.display()
        ))?;

        let ext = ext.to_ascii_lowercase();
        let file = std::fs::OpenOptions::new()
            .read(true)
            .open(path)
            .context(format!("failed to open config file: \"{}\"", path.display()))?;
        let reader = std::io::BufReader::new(file);

        if ext.eq("yaml") || ext.eq("yml") {
            serde_yaml::from_reader(reader).context(format!(
                "failed to parse yaml config file: \"{}\"", path.display()
            ))
        } else if ext.eq("json") {
            serde_json::from_reader(reader).context(format!(
                "failed to parse json config file: \"{}\"", path.display()
            ))
        } else {
            Err(error::Error::new().context(format!(
                "unknown type of config file: \"{}\"", path.display()
            )))
        }
    }

    fn merge(&mut self, src: &SrcFile<'_>, loaded: shape::Config) -> error::Result<()> {
        if let Some(server) = loaded.server {
            self.server.merge(src, DotPath::new(&"server"), server)?;
        }

        if let Some(data_dir) = loaded.data_dir {
            self.data_dir = resolve_path(data_dir, src);
        }

        if let Some(uploads) = loaded.uploads {
            if let Some(max) = uploads.max_concurrent {
                if max == 0 {
                    return Err(error::Error::new().context(format!(
                        "uploads.max_concurrent must be at least 1. file: {src}"
                    )));
                }

                self.uploads.max_concurrent = max;
            }
        }

        if let Some(search) = loaded.search {
            self.search.merge(search);
        }

        if let Some(settings) = loaded.settings {
            self.settings.merge(settings);
        }

        Ok(())
    }

    pub fn settings_file(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            search_debounce: self.search.delay,
            settings_debounce: self.settings.delay,
            max_uploads: self.uploads.max_concurrent,
            settings_file: Some(self.settings_file()),
        }
    }

    pub fn api_client(&self) -> error::Result<ApiClient> {
        let mut builder = ApiClient::builder(self.server.url.clone());

        if let Some(token) = &self.server.token {
            builder.token(token.clone());
        }

        if let Some(agent) = &self.server.user_agent {
            builder.user_agent(agent.clone());
        }

        builder.timeout(self.server.timeout);

        builder.build().context("failed to create api client")
    }
}

#[derive(Debug)]
pub struct Server {
    pub url: Url,
    pub token: Option<String>,
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Server {
    fn merge(&mut self, src: &SrcFile<'_>, dot: DotPath<'_>, server: shape::Server) -> error::Result<()> {
        if let Some(url) = server.url {
            self.url = parse_url(&url).context(format!(
                "{} \"{url}\" is not a valid url. file: {src}", dot.push(&"url")
            ))?;
        }

        if let Some(token_file) = server.token_file {
            let path = check_file(token_file, src, dot.push(&"token_file"))?;
            let contents = std::fs::read_to_string(&path).context(format!(
                "{} failed to read \"{}\". file: {src}", dot.push(&"token_file"), path.display()
            ))?;
            let token = contents.trim();

            if token.is_empty() {
                return Err(error::Error::new().context(format!(
                    "{} \"{}\" is empty. file: {src}", dot.push(&"token_file"), path.display()
                )));
            }

            self.token = Some(token.to_owned());
        }

        // an inline token wins over a token file from the same source
        if let Some(token) = server.token {
            self.token = Some(token);
        }

        if let Some(secs) = server.timeout_secs {
            if secs == 0 {
                return Err(error::Error::new().context(format!(
                    "{} must be greater than 0. file: {src}", dot.push(&"timeout_secs")
                )));
            }

            self.timeout = Duration::from_secs(secs);
        }

        if let Some(agent) = server.user_agent {
            self.user_agent = Some(agent);
        }

        Ok(())
    }
}

#[derive(Debug)]
pub struct Uploads {
    pub max_concurrent: usize,
}

#[derive(Debug)]
pub struct Debounce {
    pub delay: Duration,
}

impl Debounce {
    fn merge(&mut self, given: shape::Debounce) {
        if let Some(ms) = given.debounce_ms {
            self.delay = Duration::from_millis(ms);
        }
    }
}

struct SrcFile<'a> {
    parent: &'a Path,
    src: &'a Path,
}

impl<'a> SrcFile<'a> {
    fn new(src: &'a Path) -> error::Result<Self> {
        let parent = src.parent().context(format!(
            "failed to retrieve parent path from source file \"{}\"", src.display()
        ))?;

        Ok(SrcFile {
            parent,
            src
        })
    }
}

impl<'a> Display for SrcFile<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\"", self.src.display())
    }
}

struct DotPath<'a>(Vec<&'a dyn Display>);

impl<'a> DotPath<'a> {
    fn new(name: &'a (dyn Display)) -> Self {
        DotPath(vec![name])
    }

    fn push(&self, name: &'a (dyn Display)) -> Self {
        let mut path = self.0.clone();
        path.push(name);

        DotPath(path)
    }
}

impl<'a> Display for DotPath<'a> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;

        for name in &self.0 {
            if first {
                write!(fmt, "{name}")?;
                first = false;
            } else {
                write!(fmt, ".{name}")?;
            }
        }

        Ok(())
    }
}

fn parse_url(given: &str) -> Result<Url, url::ParseError> {
    let url = Url::parse(given.trim())?;

    if url.cannot_be_a_base() {
        return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase);
    }

    Ok(url)
}

fn resolve_path(given: PathBuf, src: &SrcFile<'_>) -> PathBuf {
    if given.is_absolute() {
        given
    } else {
        normalize(src.parent.join(given))
    }
}

fn check_file(given: PathBuf, src: &SrcFile<'_>, dot: DotPath<'_>) -> error::Result<PathBuf> {
    let full = resolve_path(given, src);

    tracing::debug!("{dot} {src} checking {}", full.display());

    let meta = metadata(&full).context(format!(
        "{dot} failed to retrieve metadata for: {src}"
    ))?.context(format!(
        "{dot} {src} was not found"
    ))?;

    if !meta.is_file() {
        return Err(error::Error::new().context(format!(
            "{dot} is not a file in: {src}"
        )));
    }

    Ok(full)
}

#[cfg(test)]
mod test {
    use tempfile::TempDir;

    use super::*;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);

        std::fs::write(&path, contents).unwrap();

        path
    }

    fn args(config: Vec<PathBuf>) -> ConfigArgs {
        ConfigArgs {
            config,
            url: None,
            token: None,
        }
    }

    #[test]
    fn defaults() {
        let config = Config::from_args(ConfigArgs::default()).unwrap();
        let options = config.store_options();

        assert_eq!(config.server.url.as_str(), "http://localhost:8080/api");
        assert_eq!(options.max_uploads, 3);
        assert_eq!(options.search_debounce, Duration::from_millis(300));
        assert_eq!(options.settings_file, Some(config.data_dir.join("settings.json")));
    }

    #[test]
    fn yaml_then_json_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = write(&dir, "base.yaml", "\
server:
  url: https://cloud.example.com/api
  timeout_secs: 5
data_dir: ./state
uploads:
  max_concurrent: 6
search:
  debounce_ms: 150
");
        let json = write(&dir, "override.json", r#"{"settings":{"debounce_ms":50},"uploads":{"max_concurrent":2}}"#);

        let config = Config::from_args(ConfigArgs {
            config: vec![yaml, json],
            url: None,
            token: Some(String::from("cli-token")),
        }).unwrap();

        assert_eq!(config.server.url.host_str(), Some("cloud.example.com"));
        assert_eq!(config.server.timeout, Duration::from_secs(5));
        assert_eq!(config.server.token.as_deref(), Some("cli-token"));
        assert_eq!(config.data_dir, dir.path().join("state"));
        assert_eq!(config.uploads.max_concurrent, 2);
        assert_eq!(config.search.delay, Duration::from_millis(150));
        assert_eq!(config.settings.delay, Duration::from_millis(50));
    }

    #[test]
    fn token_file_relative_to_config() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "token", "  secret-token\n");
        let yaml = write(&dir, "config.yml", "server:\n  token_file: token\n");

        let config = Config::from_args(args(vec![yaml])).unwrap();

        assert_eq!(config.server.token.as_deref(), Some("secret-token"));
        assert!(config.api_client().is_ok());
    }

    #[test]
    fn errors_name_the_key() {
        let dir = tempfile::tempdir().unwrap();
        let bad_url = write(&dir, "url.yaml", "server:\n  url: not a url\n");
        let missing = write(&dir, "missing.yaml", "server:\n  token_file: nope\n");
        let zero = write(&dir, "zero.json", r#"{"uploads":{"max_concurrent":0}}"#);
        let unknown = write(&dir, "config.toml", "");

        let err = Config::from_args(args(vec![bad_url])).unwrap_err();
        assert!(err.to_string().starts_with("server.url"), "{err}");

        let err = Config::from_args(args(vec![missing])).unwrap_err();
        assert!(err.to_string().starts_with("server.token_file"), "{err}");

        let err = Config::from_args(args(vec![zero])).unwrap_err();
        assert!(err.to_string().starts_with("uploads.max_concurrent"), "{err}");

        let err = Config::from_args(args(vec![unknown])).unwrap_err();
        assert!(err.to_string().starts_with("unknown type of config file"), "{err}");
    }

    #[test]
    fn bad_url_flag() {
        let err = Config::from_args(ConfigArgs {
            config: Vec::new(),
            url: Some(String::from("nope")),
            token: None,
        }).unwrap_err();

        assert!(err.to_string().starts_with("--url"), "{err}");
    }
}
