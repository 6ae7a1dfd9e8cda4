// ----- standard library imports
use std::net::IpAddr;
use std::sync::Arc;
// ----- extra library imports
use async_trait::async_trait;
use bankid_client::{ClientConfig, Reply, Result as ClientResult};
// ----- local imports
use crate::context::RequestContext;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BankIdClient: Send + Sync {
    async fn authenticate(&self, personal_number: &str, end_user_ip: IpAddr) -> ClientResult<Reply>;
    async fn sign(
        &self,
        personal_number: &str,
        end_user_ip: IpAddr,
        user_visible_data: &str,
    ) -> ClientResult<Reply>;
    async fn collect(&self, order_ref: &str) -> ClientResult<Reply>;
    /// Called once when the request context owning the client ends.
    async fn close(&self);
}

#[async_trait]
pub trait ClientFactory: Send + Sync {
    type Client: BankIdClient + 'static;

    async fn create(&self, cfg: &ClientConfig) -> ClientResult<Self::Client>;
}

/// Hands out one client per (request context, config prefix).
pub struct ClientProvider<Fctry> {
    prefix: String,
    cfg: ClientConfig,
    factory: Arc<Fctry>,
}

impl<Fctry> Clone for ClientProvider<Fctry> {
    fn clone(&self) -> Self {
        Self {
            prefix: self.prefix.clone(),
            cfg: self.cfg.clone(),
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<Fctry> ClientProvider<Fctry>
where
    Fctry: ClientFactory,
{
    pub fn new(prefix: impl Into<String>, cfg: ClientConfig, factory: Arc<Fctry>) -> Self {
        Self {
            prefix: prefix.into(),
            cfg,
            factory,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn config(&self) -> &ClientConfig {
        &self.cfg
    }

    pub async fn client(
        &self,
        ctx: &RequestContext<Fctry::Client>,
    ) -> ClientResult<Arc<Fctry::Client>> {
        ctx.get_or_try_insert_with(&self.prefix, || async {
            tracing::debug!("creating BankID client for prefix {}", self.prefix);
            self.factory.create(&self.cfg).await
        })
        .await
    }

    pub async fn teardown(&self, ctx: &RequestContext<Fctry::Client>) {
        if let Some(client) = ctx.take(&self.prefix).await {
            tracing::debug!("closing BankID client for prefix {}", self.prefix);
            client.close().await;
        }
    }
}
