use nimbus_api::files::FileItem;

use crate::error::{self, Error};
use crate::remote::Remote;

use super::FileStore;

#[derive(Debug, Clone, Default)]
pub struct SearchState {
    /// the latest query, results may still belong to an earlier one while
    /// `is_searching` is set
    pub query: String,
    pub is_searching: bool,
    pub results: Vec<FileItem>,
    pub error: Option<String>,
}

impl<R> FileStore<R>
where
    R: Remote
{
    /// runs a backend search once no newer query arrived for the debounce
    /// delay. results of superseded queries are dropped even if they land
    /// after the latest one.
    pub async fn search_files_backend(&self, query: &str) -> error::Result<()> {
        let token = self.search.bump();
        let trimmed = query.trim();

        {
            let mut state = self.lock();

            state.search.query = trimmed.to_owned();

            if trimmed.is_empty() {
                state.search = SearchState::default();
                return Ok(());
            }

            state.search.is_searching = true;
        }

        if !self.search.settle(token).await {
            tracing::debug!("search \"{trimmed}\" superseded before sending");
            return Ok(());
        }

        let result = self.remote.search(trimmed).await;

        if !self.search.is_current(token) {
            tracing::warn!("discarding stale results for \"{trimmed}\"");
            return Ok(());
        }

        let mut state = self.lock();

        state.search.is_searching = false;

        match result {
            Ok(results) => {
                state.search.results = results;
                state.search.error = None;

                Ok(())
            },
            Err(err) => {
                let err = Error::from(err);

                state.search.error = Some(err.to_string());

                Err(err)
            }
        }
    }

    pub fn search_state(&self) -> SearchState {
        self.lock().search.clone()
    }

    pub fn clear_search(&self) {
        self.search.bump();
        self.lock().search = SearchState::default();
    }
}
