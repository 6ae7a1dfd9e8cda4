// ----- standard library imports
use std::net::IpAddr;
// ----- extra library imports
use async_trait::async_trait;
use bankid_client::{Client, ClientConfig, Reply, Result as ClientResult};
// ----- local imports
use crate::service::{BankIdClient, ClientFactory};

/// Builds mutual TLS clients against the relying-party API.
#[derive(Debug, Default, Clone)]
pub struct RESTClientFactory;

#[async_trait]
impl ClientFactory for RESTClientFactory {
    type Client = Client;

    async fn create(&self, cfg: &ClientConfig) -> ClientResult<Client> {
        Client::new(cfg).await
    }
}

#[async_trait]
impl BankIdClient for Client {
    async fn authenticate(&self, personal_number: &str, end_user_ip: IpAddr) -> ClientResult<Reply> {
        Client::authenticate(self, personal_number, end_user_ip).await
    }

    async fn sign(
        &self,
        personal_number: &str,
        end_user_ip: IpAddr,
        user_visible_data: &str,
    ) -> ClientResult<Reply> {
        Client::sign(self, personal_number, end_user_ip, user_visible_data).await
    }

    async fn collect(&self, order_ref: &str) -> ClientResult<Reply> {
        Client::collect(self, order_ref).await
    }

    // reqwest releases its connection pool on drop
    async fn close(&self) {}
}
