//! Wiring for one application instance.
//!
//! Everything built here shares a single `SessionStore` and a single HTTP
//! client, so the refresh cookie set at sign-in is the one renewal sends.

use std::sync::Arc;

use tracing::info;

use crate::api::{AccountApi, ApiClient, ApiError, RequestDispatcher};
use crate::auth::{HttpCredentialExchange, RecoveryInterceptor, RouteGuard, SessionStore};
use crate::config::Config;

#[derive(Clone)]
pub struct Services {
    pub session: SessionStore,
    pub api: ApiClient,
    pub accounts: AccountApi,
    pub guard: RouteGuard,
}

impl Services {
    pub fn connect(config: &Config) -> Result<Self, ApiError> {
        let session = SessionStore::new();
        let dispatcher = RequestDispatcher::new(&config.api_base_url, config.request_timeout(), session.clone())?;
        let exchange = Arc::new(HttpCredentialExchange::new(dispatcher.clone()));
        let interceptor = RecoveryInterceptor::new(dispatcher.clone(), exchange)
            .with_coalesced_renewals(config.coalesce_renewals);
        let api = ApiClient::new(interceptor);

        info!(
            base_url = dispatcher.base_url(),
            coalesce_renewals = config.coalesce_renewals,
            "Services ready"
        );

        Ok(Self {
            session,
            guard: RouteGuard::new(api.clone()),
            accounts: AccountApi::new(dispatcher),
            api,
        })
    }
}
