// ----- standard library imports
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
// ----- extra library imports
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tokio::sync::Mutex;
// ----- local imports
use crate::service::{ClientFactory, ClientProvider};

/// Clients created while serving one request, keyed by config prefix.
pub struct RequestContext<Cl> {
    clients: Arc<Mutex<HashMap<String, Arc<Cl>>>>,
}

impl<Cl> Clone for RequestContext<Cl> {
    fn clone(&self) -> Self {
        Self {
            clients: Arc::clone(&self.clients),
        }
    }
}

impl<Cl> Default for RequestContext<Cl> {
    fn default() -> Self {
        Self {
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<Cl> RequestContext<Cl> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_try_insert_with<F, Fut, E>(&self, prefix: &str, init: F) -> Result<Arc<Cl>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Cl, E>>,
    {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(prefix) {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(init().await?);
        clients.insert(prefix.to_owned(), Arc::clone(&client));
        Ok(client)
    }

    pub async fn take(&self, prefix: &str) -> Option<Arc<Cl>> {
        self.clients.lock().await.remove(prefix)
    }
}

/// Opens a request context (or joins the one already attached to the
/// request) and tears the provider's client down once the handler is done.
pub async fn client_scope<Fctry>(
    State(provider): State<ClientProvider<Fctry>>,
    mut request: Request,
    next: Next,
) -> Response
where
    Fctry: ClientFactory + 'static,
{
    let ctx = match request.extensions().get::<RequestContext<Fctry::Client>>() {
        Some(ctx) => ctx.clone(),
        None => {
            let ctx = RequestContext::new();
            request.extensions_mut().insert(ctx.clone());
            ctx
        }
    };
    let response = next.run(request).await;
    provider.teardown(&ctx).await;
    response
}
