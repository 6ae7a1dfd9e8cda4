// ----- standard library imports
use std::net::IpAddr;
use std::path::PathBuf;
// ----- extra library imports
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::StatusCode;
use thiserror::Error;
// ----- local modules
// ----- local imports
pub use reqwest::Url;

pub const PRODUCTION_API_URL: &str = "https://appapi2.bankid.com/rp/v5.1/";
pub const TEST_API_URL: &str = "https://appapi2.test.bankid.com/rp/v5.1/";

/// A relying-party API result object, handed back untouched.
pub type Reply = serde_json::Map<String, serde_json::Value>;

/// Failure kinds reported by the relying-party API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum ErrorKind {
    AlreadyInProgress,
    AccessDeniedByRelyingParty,
    Cancelled,
    UserCancelled,
    CertificateError,
    StartFailed,
    ExpiredTransaction,
    ClientError,
    RetryError,
    InternalError,
    InvalidParameters,
}

impl ErrorKind {
    /// Maps the `errorCode` of an error response.
    pub fn from_error_code(code: &str, status: StatusCode) -> Self {
        match code {
            "alreadyInProgress" => Self::AlreadyInProgress,
            "invalidParameters" => Self::InvalidParameters,
            "unauthorized" => Self::AccessDeniedByRelyingParty,
            "requestTimeout" | "maintenance" => Self::RetryError,
            "internalError" => Self::InternalError,
            _ => Self::from_status(status),
        }
    }

    pub fn from_status(status: StatusCode) -> Self {
        if status.is_server_error() {
            Self::InternalError
        } else {
            Self::ClientError
        }
    }

    /// Maps the `hintCode` of a failed order. Unknown hints are not errors.
    pub fn from_hint_code(hint: &str) -> Option<Self> {
        match hint {
            "expiredTransaction" => Some(Self::ExpiredTransaction),
            "certificateErr" => Some(Self::CertificateError),
            "userCancel" => Some(Self::UserCancelled),
            "cancelled" => Some(Self::Cancelled),
            "startFailed" => Some(Self::StartFailed),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
#[derive(Debug, Error)]
pub enum Error {
    #[error("{kind}: {details}")]
    BankId {
        kind: ErrorKind,
        code: String,
        details: String,
    },

    #[error("credentials error {0}")]
    Credentials(#[from] std::io::Error),
    #[error("internal error {0}")]
    Reqwest(#[from] reqwest::Error),
}

impl Error {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::BankId { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub struct ClientConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub test_server: bool,
    #[serde(default)]
    pub ca_path: Option<PathBuf>,
}

impl ClientConfig {
    pub fn api_url(&self) -> Url {
        let url = if self.test_server {
            TEST_API_URL
        } else {
            PRODUCTION_API_URL
        };
        Url::parse(url).expect("static api url")
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderRequest<'a> {
    personal_number: &'a str,
    end_user_ip: IpAddr,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_visible_data: Option<String>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct CollectRequest<'a> {
    order_ref: &'a str,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    error_code: String,
    #[serde(default)]
    details: String,
}

#[derive(Debug, Clone)]
pub struct Client {
    cl: reqwest::Client,
    base: Url,
}

impl Client {
    /// Loads the PEM credentials and builds a mutual TLS client.
    pub async fn new(cfg: &ClientConfig) -> Result<Self> {
        let cert = tokio::fs::read(&cfg.cert_path).await?;
        let key = tokio::fs::read(&cfg.key_path).await?;
        let identity = reqwest::Identity::from_pkcs8_pem(&cert, &key)?;
        let mut builder = reqwest::Client::builder().identity(identity);
        if let Some(ca_path) = &cfg.ca_path {
            let ca = tokio::fs::read(ca_path).await?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&ca)?);
        }
        Ok(Self {
            cl: builder.build()?,
            base: cfg.api_url(),
        })
    }

    pub fn with_base(cl: reqwest::Client, base: Url) -> Self {
        Self { cl, base }
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub async fn authenticate(&self, personal_number: &str, end_user_ip: IpAddr) -> Result<Reply> {
        let request = OrderRequest {
            personal_number,
            end_user_ip,
            user_visible_data: None,
        };
        self.post("auth", &request).await
    }

    pub async fn sign(
        &self,
        personal_number: &str,
        end_user_ip: IpAddr,
        user_visible_data: &str,
    ) -> Result<Reply> {
        let request = OrderRequest {
            personal_number,
            end_user_ip,
            user_visible_data: Some(BASE64.encode(user_visible_data.as_bytes())),
        };
        self.post("sign", &request).await
    }

    pub async fn collect(&self, order_ref: &str) -> Result<Reply> {
        let reply = self.post("collect", &CollectRequest { order_ref }).await?;
        match failed_order(order_ref, &reply) {
            Some(err) => Err(err),
            None => Ok(reply),
        }
    }

    async fn post<T>(&self, path: &str, body: &T) -> Result<Reply>
    where
        T: serde::Serialize + ?Sized,
    {
        let url = self.base.join(path).expect("relative api path");
        let res = self.cl.post(url).json(body).send().await?;
        let status = res.status();
        if status.is_success() {
            let reply = res.json::<Reply>().await?;
            return Ok(reply);
        }
        let body = res.text().await?;
        Err(error_from_response(status, &body))
    }
}

fn error_from_response(status: StatusCode, body: &str) -> Error {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            error_code,
            details,
        }) => Error::BankId {
            kind: ErrorKind::from_error_code(&error_code, status),
            code: error_code,
            details,
        },
        Err(_) => Error::BankId {
            kind: ErrorKind::from_status(status),
            code: status.as_u16().to_string(),
            details: body.to_owned(),
        },
    }
}

fn failed_order(order_ref: &str, reply: &Reply) -> Option<Error> {
    if reply.get("status")?.as_str()? != "failed" {
        return None;
    }
    let hint = reply.get("hintCode")?.as_str()?;
    let kind = ErrorKind::from_hint_code(hint)?;
    Some(Error::BankId {
        kind,
        code: hint.to_owned(),
        details: format!("order {order_ref} failed with hint code {hint}"),
    })
}
