//! Lookup facade.
//!
//! [`Manager`] wires configuration, stores, the repository and the handler
//! chain together. It is the only type request-serving code needs:
//!
//! ```no_run
//! use ua_config::EngineConfig;
//! use ua_core::manager::Manager;
//!
//! let mut config = EngineConfig::default();
//! config.database.main = Some("wurfl.xml".into());
//! let manager = Manager::new(&config)?;
//! let device = manager.get_device_for_user_agent("Nokia3220/2.0 (03.30)");
//! println!("{} {:?}", device.id, manager.get_capability(&device.id, "brand_name"));
//! # Ok::<(), ua_common::Error>(())
//! ```
//!
//! Startup loads the persisted repository when its fingerprint matches the
//! configured sources and rebuilds otherwise. A persistence backend that
//! cannot be opened or read degrades to an in-process build when sources
//! are configured.

use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};
use ua_common::{Error, Result};
use ua_config::{EngineConfig, MatchMode};
use ua_store::{CapabilityStore, NullStore, Ttl};

use crate::builder::{from_store_error, BuiltRepository, CapabilityFilter, RepositoryBuilder};
use crate::capability::CapabilityValue;
use crate::device::Device;
use crate::handlers::{Chain, MatchOutcome, Step};
use crate::logging::event_names;
use crate::repository::{DatabaseInfo, Repository};
use crate::request::{Request, RequestFactory};

/// How a lookup was answered.
#[derive(Debug, Clone, Serialize)]
pub struct Lookup<'a> {
    pub device: &'a Device,
    pub user_agent: String,
    /// Handler and step, absent when served from the lookup cache.
    pub matched: Option<MatchOutcome>,
    pub cached: bool,
}

/// Where the repository came from at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryOrigin {
    Persisted,
    Built,
    Supplied,
}

pub struct Manager {
    built: BuiltRepository,
    origin: RepositoryOrigin,
    chain: Chain,
    requests: RequestFactory,
    mode: MatchMode,
    cache: Box<dyn CapabilityStore>,
    cache_ttl: Ttl,
}

/// Builder for the configured definition sources, if any.
pub fn configured_builder(config: &EngineConfig) -> Option<RepositoryBuilder> {
    let main = config.database.main.as_ref()?;
    Some(
        RepositoryBuilder::new(main)
            .patches(config.database.patches.iter().cloned())
            .capability_filter(CapabilityFilter::new(
                config.database.capability_filter.iter().cloned(),
            )),
    )
}

/// Opens the persistence store named by the configuration.
pub fn open_persistence(config: &EngineConfig) -> Result<Box<dyn CapabilityStore>> {
    let dir = config.persistence.effective_dir();
    ua_store::open(config.persistence.provider, dir.as_deref()).map_err(from_store_error)
}

impl Manager {
    /// Loads or builds the repository described by `config`.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let chain = Chain::standard();
        let builder = configured_builder(config);

        let persistence = match open_persistence(config) {
            Ok(store) => Some(store),
            Err(err) if builder.is_some() => {
                warn!(
                    target: event_names::STORE_DEGRADED,
                    error = %err,
                    "persistence unavailable; building from sources"
                );
                None
            }
            Err(err) => return Err(err),
        };

        let (built, origin) = match builder {
            Some(builder) => Self::load_or_build(&builder, persistence.as_deref(), &chain)?,
            None => {
                let store = persistence.as_deref().ok_or_else(|| {
                    Error::Config("no definition source configured".to_string())
                })?;
                let built = BuiltRepository::load(store)?.ok_or_else(|| {
                    Error::Config(
                        "no definition source configured and no persisted repository".to_string(),
                    )
                })?;
                info!(
                    target: event_names::REPOSITORY_LOADED,
                    fingerprint = %built.fingerprint,
                    devices = built.repository.len(),
                    "persisted repository loaded"
                );
                (built, RepositoryOrigin::Persisted)
            }
        };

        let cache = open_cache(config);
        let mut manager = Self::with_parts(built, chain, cache, config);
        manager.origin = origin;
        Ok(manager)
    }

    /// Wraps an already built repository.
    pub fn from_built(built: BuiltRepository, config: &EngineConfig) -> Self {
        let cache = open_cache(config);
        Self::with_parts(built, Chain::standard(), cache, config)
    }

    fn with_parts(
        built: BuiltRepository,
        chain: Chain,
        cache: Box<dyn CapabilityStore>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            built,
            origin: RepositoryOrigin::Supplied,
            chain,
            requests: RequestFactory::new(&config.matching.header_precedence),
            mode: config.matching.mode,
            cache,
            cache_ttl: Ttl::from_secs(config.cache.expiration_secs),
        }
    }

    fn load_or_build(
        builder: &RepositoryBuilder,
        persistence: Option<&dyn CapabilityStore>,
        chain: &Chain,
    ) -> Result<(BuiltRepository, RepositoryOrigin)> {
        let fingerprint = builder.fingerprint()?;

        if let Some(store) = persistence {
            match BuiltRepository::load(store) {
                Ok(Some(built)) if built.fingerprint == fingerprint => {
                    info!(
                        target: event_names::REPOSITORY_LOADED,
                        fingerprint = %fingerprint,
                        devices = built.repository.len(),
                        "persisted repository loaded"
                    );
                    return Ok((built, RepositoryOrigin::Persisted));
                }
                Ok(Some(stale)) => info!(
                    target: event_names::REPOSITORY_STALE,
                    persisted = %stale.fingerprint,
                    current = %fingerprint,
                    "definition sources changed; rebuilding"
                ),
                Ok(None) => debug!("no persisted repository"),
                Err(err) => warn!(
                    target: event_names::STORE_DEGRADED,
                    error = %err,
                    "persisted repository unreadable; rebuilding"
                ),
            }
        }

        let built = builder.build_with(chain)?;
        if let Some(store) = persistence {
            if let Err(err) = built.persist(store) {
                warn!(
                    target: event_names::STORE_DEGRADED,
                    error = %err,
                    "could not persist repository"
                );
            }
        }
        Ok((built, RepositoryOrigin::Built))
    }

    pub fn repository(&self) -> &Repository {
        &self.built.repository
    }

    pub fn fingerprint(&self) -> &str {
        &self.built.fingerprint
    }

    pub fn origin(&self) -> RepositoryOrigin {
        self.origin
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn request_factory(&self) -> &RequestFactory {
        &self.requests
    }

    /// Device for a bare user agent. Never fails; an empty user agent
    /// yields the root device.
    pub fn get_device_for_user_agent(&self, ua: &str) -> &Device {
        self.lookup(&self.requests.from_user_agent(ua)).device
    }

    /// Device for a request built from headers.
    pub fn get_device_for_request(&self, request: &Request) -> &Device {
        self.lookup(request).device
    }

    /// Device for raw request headers.
    pub fn get_device_for_headers<I, K, V>(&self, headers: I) -> &Device
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.lookup(&self.requests.from_headers(headers)).device
    }

    /// Resolves a request and reports how the answer was found.
    pub fn lookup(&self, request: &Request) -> Lookup<'_> {
        let repo = self.repository();
        let ua = request.user_agent.as_str();

        if request.is_empty() {
            return Lookup {
                device: repo.root(),
                user_agent: ua.to_string(),
                matched: Some(MatchOutcome {
                    device_id: repo.root().id.clone(),
                    handler: "none",
                    step: Step::Root,
                    normalized: String::new(),
                }),
                cached: false,
            };
        }

        let key = self.cache_key(ua);
        if let Some(device) = self.cached_device(&key) {
            debug!(
                target: event_names::MATCH_CACHED,
                device_id = %device.id,
                "lookup served from cache"
            );
            return Lookup {
                device,
                user_agent: ua.to_string(),
                matched: None,
                cached: true,
            };
        }

        let started = Instant::now();
        let outcome = self.chain.resolve(repo, self.mode, ua);
        debug!(
            target: event_names::MATCH_RESOLVED,
            device_id = %outcome.device_id,
            handler = outcome.handler,
            step = outcome.step.as_str(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "lookup resolved"
        );

        if let Err(err) = self
            .cache
            .put(&key, outcome.device_id.as_bytes(), self.cache_ttl)
        {
            debug!(error = %err, "lookup cache write failed");
        }

        let device = repo
            .get_device(&outcome.device_id)
            .unwrap_or_else(|_| repo.root());
        Lookup {
            device,
            user_agent: ua.to_string(),
            matched: Some(outcome),
            cached: false,
        }
    }

    fn cache_key(&self, ua: &str) -> String {
        format!("lookup:{}:{}:{}", self.built.fingerprint, self.mode, ua)
    }

    fn cached_device(&self, key: &str) -> Option<&Device> {
        let bytes = match self.cache.get(key) {
            Ok(bytes) => bytes?,
            Err(err) => {
                debug!(error = %err, "lookup cache read failed");
                return None;
            }
        };
        let id = String::from_utf8(bytes).ok()?;
        self.repository().get_device(&id).ok()
    }

    pub fn get_device(&self, id: &str) -> Result<&Device> {
        self.repository().get_device(id)
    }

    /// Inherited capability value of `id`.
    pub fn get_capability(&self, id: &str, name: &str) -> Result<&str> {
        self.repository().capability(id, name)
    }

    pub fn get_typed_capability(&self, id: &str, name: &str) -> Result<CapabilityValue> {
        self.repository().typed_capability(id, name)
    }

    pub fn get_all_devices_id(&self) -> Vec<&str> {
        self.repository().all_device_ids()
    }

    pub fn get_list_of_groups(&self) -> Vec<&str> {
        self.repository().groups().collect()
    }

    pub fn get_capabilities_name_for_group(&self, group: &str) -> Result<&[String]> {
        self.repository().capability_names_for_group(group)
    }

    /// The device followed by its ancestors, ending at the root.
    pub fn get_fall_back_devices(&self, id: &str) -> Result<Vec<&Device>> {
        self.repository().fallback_chain(id)
    }

    pub fn get_database_info(&self) -> &DatabaseInfo {
        self.repository().info()
    }

    /// Drops every memoized lookup.
    pub fn clear_cache(&self) -> Result<()> {
        self.cache.clear().map_err(from_store_error)?;
        info!(target: event_names::CACHE_CLEARED, backend = self.cache.name(), "lookup cache cleared");
        Ok(())
    }
}

/// Opens the lookup cache; failures disable memoization.
fn open_cache(config: &EngineConfig) -> Box<dyn CapabilityStore> {
    let dir = config.cache.effective_dir();
    match ua_store::open(config.cache.provider, dir.as_deref()) {
        Ok(store) => store,
        Err(err) => {
            warn!(
                target: event_names::STORE_DEGRADED,
                error = %err,
                "lookup cache unavailable; memoization disabled"
            );
            Box::new(NullStore)
        }
    }
}
