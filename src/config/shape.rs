use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Server {
    pub url: Option<String>,
    pub token: Option<String>,
    pub token_file: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Uploads {
    pub max_concurrent: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct Debounce {
    pub debounce_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: Option<Server>,
    pub data_dir: Option<PathBuf>,

    pub uploads: Option<Uploads>,
    pub search: Option<Debounce>,
    pub settings: Option<Debounce>,
}
