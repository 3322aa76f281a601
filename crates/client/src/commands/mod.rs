// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod queue;
pub mod session;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use till_core::ConnectionState;
use tracing::debug;

use crate::auth::TokenManager;
use crate::cli::GlobalArgs;
use crate::config::{self, Config};
use crate::coordinator::SyncCoordinator;
use crate::error::Result;
use crate::http::{RequestInterceptor, RestBackend};
use crate::network::NetworkObserver;
use crate::queue::OfflineMutationQueue;
use crate::session::SessionFile;

/// Everything a command needs, wired from the config and state dir.
pub(crate) struct Context {
    pub config: Config,
    pub state_dir: PathBuf,
    pub tokens: TokenManager,
    pub session: SessionFile,
    pub network: NetworkObserver,
    backend: Arc<RestBackend>,
}

impl Context {
    pub fn load(global: &GlobalArgs) -> Result<Self> {
        let config_path = global.config.clone().unwrap_or_else(config::default_config_path);
        let config = Config::load(&config_path)?;
        let state_dir = config::state_dir(global.state_dir.as_deref());
        debug!(config = %config_path.display(), state_dir = %state_dir.display(), "loaded configuration");

        let backend = Arc::new(RestBackend::new(
            config.api_url()?,
            config.api.refresh_path.clone(),
            config.request_timeout(),
        )?);
        let tokens = TokenManager::new(backend.clone(), config.token_config());

        let session = SessionFile::new(config::session_path(&state_dir));
        if let Some(token) = session.load()? {
            tokens.set_session(token);
        }
        // Attached after restore so loading does not rewrite the file.
        session.attach(&tokens);

        let network = NetworkObserver::new(if global.offline {
            ConnectionState::offline()
        } else {
            ConnectionState::online("cli")
        });

        Ok(Context {
            config,
            state_dir,
            tokens,
            session,
            network,
            backend,
        })
    }

    pub fn open_queue(&self) -> Result<Arc<OfflineMutationQueue>> {
        let interceptor = RequestInterceptor::new(
            self.backend.clone(),
            self.tokens.clone(),
            self.config.interceptor_config(),
        );
        let queue = OfflineMutationQueue::open(
            &config::queue_path(&self.state_dir),
            interceptor,
            self.config.queue_config(),
        )?;
        Ok(Arc::new(queue))
    }

    pub fn coordinator(&self) -> Result<SyncCoordinator> {
        Ok(SyncCoordinator::new(self.open_queue()?, self.network.subscribe()))
    }
}
