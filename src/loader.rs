//! Lazy, single-shot loading of the vendor script
//!
//! The script is injected at most once per page. The in-flight injection and
//! its outcome (including a failure) live in the host's [`PageLoad`], so every
//! [`ScriptLoader`] built on the same host awaits the same injection.

use crate::{
    core::config::LoaderConfig,
    traits::{LibraryHandle, ScriptHost},
    Result, ScriptLoadError,
};
use futures::future::{FutureExt, LocalBoxFuture, Shared};
use std::cell::RefCell;
use std::rc::Rc;
use url::Url;

type LoadOutcome = std::result::Result<LibraryHandle, ScriptLoadError>;
type PendingLoad = Shared<LocalBoxFuture<'static, LoadOutcome>>;

/// Observable progress of a loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing injected yet
    Idle,
    /// Script injected, load event not seen yet
    Loading,
    Loaded,
    Failed(ScriptLoadError),
}

/// Page-wide record of the script injection, owned by a [`ScriptHost`]
#[derive(Default)]
pub struct PageLoad {
    pending: RefCell<Option<PendingLoad>>,
}

impl PageLoad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an injection was ever started on this page
    pub fn is_started(&self) -> bool {
        self.pending.borrow().is_some()
    }
}

pub struct ScriptLoader {
    host: Rc<dyn ScriptHost>,
    config: LoaderConfig,
}

impl ScriptLoader {
    pub fn new(host: Rc<dyn ScriptHost>, config: LoaderConfig) -> Self {
        Self { host, config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Resolves once the library entry point is callable.
    ///
    /// Returns immediately when the host already exposes the library.
    /// Otherwise the script is injected once per page; every call made while
    /// or after it loads, from any loader on the same host, shares that
    /// single injection and its outcome.
    pub async fn load(&self) -> Result<LibraryHandle> {
        let pending = {
            let mut slot = self.host.page_load().pending.borrow_mut();
            match slot.as_ref() {
                Some(pending) => pending.clone(),
                None => {
                    if let Some(library) = self.host.library() {
                        log::debug!("mapping library already present, skipping injection");
                        return Ok(library);
                    }

                    let url = self.config.script_url()?;
                    log::info!("injecting mapping library script from {}", url.origin().ascii_serialization());
                    let pending = Self::inject(Rc::clone(&self.host), url)
                        .boxed_local()
                        .shared();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        Ok(pending.await?)
    }

    async fn inject(host: Rc<dyn ScriptHost>, url: Url) -> LoadOutcome {
        let failure = |reason: String| ScriptLoadError {
            url: redact_key(&url),
            reason,
        };

        if let Err(reason) = host.inject_script(&url).await {
            log::warn!("mapping library script failed to load: {}", reason);
            return Err(failure(reason));
        }

        match host.library() {
            Some(library) => {
                log::debug!("mapping library loaded");
                Ok(library)
            }
            None => {
                log::warn!("mapping library script loaded but its entry point is missing");
                Err(failure("entry point missing after load".to_string()))
            }
        }
    }

    pub fn state(&self) -> LoadState {
        match self.host.page_load().pending.borrow().as_ref() {
            None if self.host.library().is_some() => LoadState::Loaded,
            None => LoadState::Idle,
            Some(pending) => match pending.peek() {
                None => LoadState::Loading,
                Some(Ok(_)) => LoadState::Loaded,
                Some(Err(error)) => LoadState::Failed(error.clone()),
            },
        }
    }
}

/// The script URL without its API key, for error messages and logs
fn redact_key(url: &Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "key")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}
