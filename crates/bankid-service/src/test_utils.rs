// ----- standard library imports
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
// ----- extra library imports
use async_trait::async_trait;
use bankid_client::{ClientConfig, Error as ClientError, ErrorKind, Reply, Result as ClientResult};
use serde_json::Value;
// ----- local imports
use crate::service::{BankIdClient, ClientFactory, ClientProvider};

#[derive(Debug, Default)]
struct State {
    // order ref -> personal number
    orders: Mutex<HashMap<uuid::Uuid, String>>,
    created: AtomicUsize,
    closed: AtomicUsize,
}

/// An in-memory relying party behaving like the BankID test server: one
/// outstanding order per personal number, orders never complete.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBankId {
    state: Arc<State>,
}

impl InMemoryBankId {
    pub fn created(&self) -> usize {
        self.state.created.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientFactory for InMemoryBankId {
    type Client = InMemoryClient;

    async fn create(&self, _cfg: &ClientConfig) -> ClientResult<InMemoryClient> {
        self.state.created.fetch_add(1, Ordering::SeqCst);
        Ok(InMemoryClient {
            state: Arc::clone(&self.state),
        })
    }
}

#[derive(Debug)]
pub struct InMemoryClient {
    state: Arc<State>,
}

fn rejected(kind: ErrorKind, code: &str, details: &str) -> ClientError {
    ClientError::BankId {
        kind,
        code: code.to_owned(),
        details: details.to_owned(),
    }
}

impl InMemoryClient {
    fn start_order(&self, personal_number: &str) -> ClientResult<Reply> {
        let mut orders = self.state.orders.lock().expect("orders lock");
        if orders.values().any(|pn| pn == personal_number) {
            return Err(rejected(
                ErrorKind::AlreadyInProgress,
                "alreadyInProgress",
                "Order already in progress for pno",
            ));
        }
        let order_ref = uuid::Uuid::new_v4();
        orders.insert(order_ref, personal_number.to_owned());
        let mut reply = Reply::new();
        reply.insert(String::from("orderRef"), Value::from(order_ref.to_string()));
        reply.insert(
            String::from("autoStartToken"),
            Value::from(uuid::Uuid::new_v4().to_string()),
        );
        Ok(reply)
    }
}

#[async_trait]
impl BankIdClient for InMemoryClient {
    async fn authenticate(&self, personal_number: &str, _end_user_ip: IpAddr) -> ClientResult<Reply> {
        self.start_order(personal_number)
    }

    async fn sign(
        &self,
        personal_number: &str,
        _end_user_ip: IpAddr,
        user_visible_data: &str,
    ) -> ClientResult<Reply> {
        if user_visible_data.is_empty() {
            return Err(rejected(
                ErrorKind::InvalidParameters,
                "invalidParameters",
                "Invalid userVisibleData",
            ));
        }
        self.start_order(personal_number)
    }

    async fn collect(&self, order_ref: &str) -> ClientResult<Reply> {
        let invalid = || rejected(ErrorKind::InvalidParameters, "invalidParameters", "No such order");
        let id = uuid::Uuid::parse_str(order_ref).map_err(|_| invalid())?;
        let orders = self.state.orders.lock().expect("orders lock");
        if !orders.contains_key(&id) {
            return Err(invalid());
        }
        let mut reply = Reply::new();
        reply.insert(String::from("orderRef"), Value::from(order_ref));
        reply.insert(
            String::from("progressStatus"),
            Value::from("OUTSTANDING_TRANSACTION"),
        );
        Ok(reply)
    }

    async fn close(&self) {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn build_test_server() -> (axum_test::TestServer, InMemoryBankId) {
    let backend = InMemoryBankId::default();
    let cfg = ClientConfig {
        test_server: true,
        ..Default::default()
    };
    let provider = ClientProvider::new(
        crate::settings::DEFAULT_PREFIX,
        cfg,
        Arc::new(backend.clone()),
    );
    let server = axum_test::TestServer::new(crate::routes(provider)).expect("test server");
    (server, backend)
}
