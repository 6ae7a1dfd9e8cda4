// ----- standard library imports
use std::sync::Arc;
// ----- extra library imports
use axum::middleware;
use axum::routing::get;
use axum::Router;
// ----- local modules
mod client;
mod context;
mod error;
mod service;
pub mod settings;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
mod web;
// ----- local imports
pub use client::RESTClientFactory;
pub use context::RequestContext;
pub use error::{status_code, translate, Error, ErrorRecord};
pub use service::{BankIdClient, ClientFactory, ClientProvider};
use settings::{Registry, SetupError};

pub type ProdClientProvider = ClientProvider<RESTClientFactory>;

fn default_prefixes() -> Vec<String> {
    vec![String::from(settings::DEFAULT_PREFIX)]
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_prefixes")]
    config_prefixes: Vec<String>,
}

impl AppConfig {
    pub fn config_prefixes(&self) -> &[String] {
        &self.config_prefixes
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_prefixes: default_prefixes(),
        }
    }
}

/// Registers `prefix` on the application and reads its settings from `cfg`.
pub fn init_provider<Fctry>(
    registry: &mut Registry,
    cfg: &config::Config,
    prefix: &str,
    factory: Arc<Fctry>,
) -> Result<ClientProvider<Fctry>, SetupError>
where
    Fctry: ClientFactory,
{
    registry.register(prefix)?;
    let client_cfg = settings::client_config(cfg, prefix)?;
    tracing::info!(
        "BankID prefix {} registered, test server: {}",
        prefix,
        client_cfg.test_server
    );
    Ok(ClientProvider::new(prefix, client_cfg, factory))
}

pub fn routes<Fctry>(provider: ClientProvider<Fctry>) -> Router
where
    Fctry: ClientFactory + 'static,
{
    Router::new()
        .route("/authenticate/{personal_number}", get(web::authenticate::<Fctry>))
        .route("/sign/{personal_number}", get(web::sign::<Fctry>))
        .route("/collect/{order_ref}", get(web::collect::<Fctry>))
        .route_layer(middleware::from_fn_with_state(
            provider.clone(),
            context::client_scope::<Fctry>,
        ))
        .with_state(provider)
}

/// The first prefix is served at the root, the others under `/<prefix>`.
pub fn app_routes(cfg: &config::Config, appcfg: &AppConfig) -> Result<Router, SetupError> {
    let mut registry = Registry::default();
    let factory = Arc::new(RESTClientFactory);
    let mut router = Router::new();
    for (idx, prefix) in appcfg.config_prefixes.iter().enumerate() {
        let provider = init_provider(&mut registry, cfg, prefix, Arc::clone(&factory))?;
        router = if idx == 0 {
            router.merge(routes(provider))
        } else {
            router.nest(&format!("/{}", prefix.to_lowercase()), routes(provider))
        };
    }
    Ok(router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::InMemoryBankId;

    fn build_config() -> config::Config {
        config::Config::builder()
            .set_override("pybankid_cert_path", "/tmp/default.pem")
            .expect("override")
            .set_override("custom_cert_path", "/tmp/custom.pem")
            .expect("override")
            .set_override("custom_test_server", true)
            .expect("override")
            .build()
            .expect("config")
    }

    #[test]
    fn duplicate_prefix_fails() {
        let cfg = build_config();
        let backend = Arc::new(InMemoryBankId::default());
        let mut registry = Registry::default();
        init_provider(&mut registry, &cfg, "PYBANKID", Arc::clone(&backend)).expect("first");
        let r = init_provider(&mut registry, &cfg, "PYBANKID", backend);
        assert!(matches!(r, Err(SetupError::DuplicatePrefix(_))));
    }

    #[test]
    fn two_prefixes_are_independent() {
        let cfg = build_config();
        let backend = Arc::new(InMemoryBankId::default());
        let mut registry = Registry::default();
        let default =
            init_provider(&mut registry, &cfg, "PYBANKID", Arc::clone(&backend)).expect("default");
        let custom = init_provider(&mut registry, &cfg, "CUSTOM", backend).expect("custom");

        assert_eq!(default.prefix(), "PYBANKID");
        assert_eq!(custom.prefix(), "CUSTOM");
        assert_eq!(default.config().cert_path.to_str(), Some("/tmp/default.pem"));
        assert!(!default.config().test_server);
        assert_eq!(custom.config().cert_path.to_str(), Some("/tmp/custom.pem"));
        assert!(custom.config().test_server);
    }

    #[test]
    fn app_routes_rejects_duplicate_prefixes() {
        let cfg = build_config();
        let appcfg = AppConfig {
            config_prefixes: vec![String::from("PYBANKID"), String::from("PYBANKID")],
        };
        let r = app_routes(&cfg, &appcfg);
        assert!(matches!(r, Err(SetupError::DuplicatePrefix(_))));
    }

    #[test]
    fn app_routes_rejects_prefixes_differing_in_case() {
        let cfg = build_config();
        let appcfg = AppConfig {
            config_prefixes: vec![
                String::from("CUSTOM"),
                String::from("EXTRA"),
                String::from("extra"),
            ],
        };
        let r = app_routes(&cfg, &appcfg);
        assert!(matches!(r, Err(SetupError::DuplicatePrefix(p)) if p == "extra"));
    }

    #[test]
    fn app_routes_rejects_prefix_with_slash() {
        let cfg = build_config();
        let appcfg = AppConfig {
            config_prefixes: vec![String::from("PYBANKID"), String::from("CUSTOM/NESTED")],
        };
        let r = app_routes(&cfg, &appcfg);
        assert!(matches!(r, Err(SetupError::InvalidPrefix(_))));
    }

    #[tokio::test]
    async fn nested_prefixes_get_own_clients() {
        let cfg = build_config();
        let backend = Arc::new(InMemoryBankId::default());
        let mut registry = Registry::default();
        let default =
            init_provider(&mut registry, &cfg, "PYBANKID", Arc::clone(&backend)).expect("default");
        let custom =
            init_provider(&mut registry, &cfg, "CUSTOM", Arc::clone(&backend)).expect("custom");
        let router = Router::new()
            .merge(routes(default))
            .nest("/custom", routes(custom));
        let server = axum_test::TestServer::new(router).expect("test server");

        server.get("/authenticate/199001011239").await.assert_status_ok();
        server
            .get("/custom/authenticate/198507099805")
            .await
            .assert_status_ok();
        assert_eq!(backend.created(), 2);
        assert_eq!(backend.closed(), 2);
    }
}
