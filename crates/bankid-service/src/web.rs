// ----- standard library imports
use std::net::{IpAddr, Ipv4Addr};
// ----- extra library imports
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Extension, Json, Path, Query, State};
use axum::http::HeaderMap;
use bankid_client::Reply;
// ----- local imports
use crate::context::RequestContext;
use crate::error::Result;
use crate::service::{BankIdClient, ClientFactory, ClientProvider};

pub const FORWARDED_FOR: &str = "x-forwarded-for";

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignParams {
    #[serde(default)]
    pub user_visible_data: String,
}

/// First hop of `X-Forwarded-For`, else loopback.
pub fn end_user_ip(headers: &HeaderMap) -> IpAddr {
    headers
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|first| first.trim().parse().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

#[tracing::instrument(level = tracing::Level::DEBUG, skip(provider, ctx, headers, personal_number))]
pub async fn authenticate<Fctry>(
    State(provider): State<ClientProvider<Fctry>>,
    Extension(ctx): Extension<RequestContext<Fctry::Client>>,
    headers: HeaderMap,
    personal_number: std::result::Result<Path<String>, PathRejection>,
) -> Result<Json<Reply>>
where
    Fctry: ClientFactory,
{
    let Path(personal_number) = personal_number?;
    let client = provider.client(&ctx).await?;
    let reply = client
        .authenticate(&personal_number, end_user_ip(&headers))
        .await?;
    tracing::debug!("authentication order started: {:?}", reply.get("orderRef"));
    Ok(Json(reply))
}

#[tracing::instrument(level = tracing::Level::DEBUG, skip(provider, ctx, headers, personal_number, params))]
pub async fn sign<Fctry>(
    State(provider): State<ClientProvider<Fctry>>,
    Extension(ctx): Extension<RequestContext<Fctry::Client>>,
    headers: HeaderMap,
    personal_number: std::result::Result<Path<String>, PathRejection>,
    params: std::result::Result<Query<SignParams>, QueryRejection>,
) -> Result<Json<Reply>>
where
    Fctry: ClientFactory,
{
    let Path(personal_number) = personal_number?;
    let Query(params) = params?;
    let client = provider.client(&ctx).await?;
    let reply = client
        .sign(
            &personal_number,
            end_user_ip(&headers),
            &params.user_visible_data,
        )
        .await?;
    tracing::debug!("sign order started: {:?}", reply.get("orderRef"));
    Ok(Json(reply))
}

#[tracing::instrument(level = tracing::Level::DEBUG, skip(provider, ctx))]
pub async fn collect<Fctry>(
    State(provider): State<ClientProvider<Fctry>>,
    Extension(ctx): Extension<RequestContext<Fctry::Client>>,
    order_ref: std::result::Result<Path<String>, PathRejection>,
) -> Result<Json<Reply>>
where
    Fctry: ClientFactory,
{
    let Path(order_ref) = order_ref?;
    let client = provider.client(&ctx).await?;
    let reply = client.collect(&order_ref).await?;
    Ok(Json(reply))
}
