//! AWS Systems Manager Parameter Store adapter
//!
//! Parameters live under `/<application>/...`. Keys handed to and returned
//! from [`SsmStore`] are relative to that application root, so a manager
//! with prefix `/config` reads `/<application>/config/<namespace>`.

use crate::traits::{KeyValueStore, Reconnect};
use async_trait::async_trait;
use aws_sdk_ssm::config::http::HttpResponse;
use aws_sdk_ssm::config::{Credentials, Region};
use aws_sdk_ssm::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ssm::types::ParameterType;
use aws_sdk_ssm::Client;
use std::sync::{PoisonError, RwLock};
use types::{BackendError, BackendResult, SsmEndpoint};

const NOT_FOUND_CODE: &str = "ParameterNotFound";
const THROTTLED_CODES: [&str; 3] = ["ThrottlingException", "InternalServerError", "ServiceUnavailable"];

/// The parameter operations [`SsmStore`] needs. Names are absolute
/// parameter names.
#[async_trait]
pub trait ParameterApi: Send + Sync {
    /// Names of every parameter below `path`, all pages
    async fn names_by_path(&self, path: &str) -> BackendResult<Vec<String>>;

    /// Decrypted value of `name`
    async fn get_parameter(&self, name: &str) -> BackendResult<String>;

    /// Create or overwrite `name` as a plain string parameter
    async fn put_parameter(&self, name: &str, value: &str) -> BackendResult<()>;

    async fn delete_parameter(&self, name: &str) -> BackendResult<()>;

    /// Recreate the underlying client
    fn reset(&self) -> BackendResult<()>;
}

/// [`ParameterApi`] over the AWS SDK client
#[derive(Debug)]
pub struct SdkParameterClient {
    config: aws_config::SdkConfig,
    client: RwLock<Client>,
}

impl SdkParameterClient {
    /// Resolve region and credentials and build a client. Explicit keys win
    /// over the default credential chain.
    pub async fn connect(endpoint: &SsmEndpoint) -> BackendResult<Self> {
        if endpoint.region.trim().is_empty() {
            return Err(BackendError::Configuration("SSM region is not set".to_string()));
        }

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(endpoint.region.clone()));

        match (&endpoint.access_key, &endpoint.secret_key) {
            (Some(access_key), Some(secret_key)) => {
                loader = loader.credentials_provider(Credentials::new(
                    access_key.clone(),
                    secret_key.clone(),
                    None,
                    None,
                    "confsync-settings",
                ));
            }
            (None, None) => {}
            _ => {
                return Err(BackendError::Configuration(
                    "SSM access key and secret key must be set together".to_string(),
                ))
            }
        }

        if let Some(url) = endpoint.endpoint_url.as_deref().filter(|u| !u.is_empty()) {
            loader = loader.endpoint_url(url);
        }

        let config = loader.load().await;
        tracing::info!(
            region = %endpoint.region,
            application = %endpoint.application_name,
            access_key = ?endpoint.masked_access_key(),
            "SSM client configured"
        );

        Ok(Self {
            client: RwLock::new(Client::new(&config)),
            config,
        })
    }

    fn client(&self) -> Client {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn map_sdk_error<E>(operation: &str, key: &str, err: SdkError<E, HttpResponse>) -> BackendError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    if matches!(
        err,
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_)
    ) {
        return BackendError::transport(operation, key, DisplayErrorContext(&err).to_string());
    }
    if let SdkError::ConstructionFailure(_) = err {
        return BackendError::Configuration(DisplayErrorContext(&err).to_string());
    }

    match err.code() {
        Some(NOT_FOUND_CODE) => BackendError::NotFound {
            key: key.to_string(),
        },
        Some(code) if THROTTLED_CODES.contains(&code) => {
            BackendError::transport(operation, key, DisplayErrorContext(&err).to_string())
        }
        _ => match err.raw_response().map(|raw| raw.status().as_u16()) {
            Some(status) if status >= 500 => {
                BackendError::transport(operation, key, DisplayErrorContext(&err).to_string())
            }
            Some(status) => BackendError::Http {
                key: key.to_string(),
                status,
            },
            None => BackendError::transport(operation, key, DisplayErrorContext(&err).to_string()),
        },
    }
}

#[async_trait]
impl ParameterApi for SdkParameterClient {
    async fn names_by_path(&self, path: &str) -> BackendResult<Vec<String>> {
        let client = self.client();
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = client
                .get_parameters_by_path()
                .path(path)
                .recursive(true)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| map_sdk_error("get_all_keys", path, e))?;

            names.extend(page.parameters().iter().filter_map(|p| p.name().map(str::to_string)));
            match page.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }
        Ok(names)
    }

    async fn get_parameter(&self, name: &str) -> BackendResult<String> {
        let output = self
            .client()
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|e| map_sdk_error("get_value", name, e))?;

        output
            .parameter()
            .and_then(|p| p.value())
            .map(str::to_string)
            .ok_or_else(|| BackendError::NotFound {
                key: name.to_string(),
            })
    }

    async fn put_parameter(&self, name: &str, value: &str) -> BackendResult<()> {
        self.client()
            .put_parameter()
            .name(name)
            .value(value)
            .r#type(ParameterType::String)
            .overwrite(true)
            .send()
            .await
            .map_err(|e| map_sdk_error("put_value", name, e))?;
        Ok(())
    }

    async fn delete_parameter(&self, name: &str) -> BackendResult<()> {
        self.client()
            .delete_parameter()
            .name(name)
            .send()
            .await
            .map_err(|e| map_sdk_error("delete_key", name, e))?;
        Ok(())
    }

    fn reset(&self) -> BackendResult<()> {
        *self.client.write().unwrap_or_else(PoisonError::into_inner) = Client::new(&self.config);
        Ok(())
    }
}

/// Key/value view of Parameter Store scoped to one application
#[derive(Debug)]
pub struct SsmStore<C> {
    application: String,
    client: C,
}

impl<C: ParameterApi> SsmStore<C> {
    pub fn new(application: impl Into<String>, client: C) -> Self {
        Self {
            application: application.into(),
            client,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Absolute parameter name for an application-relative key. Empty
    /// segments are dropped; a trailing slash is kept.
    pub fn parameter_name(&self, key: &str) -> String {
        let segments: Vec<&str> = self
            .application
            .split('/')
            .chain(key.trim().split('/'))
            .filter(|segment| !segment.is_empty())
            .collect();

        let mut name = format!("/{}", segments.join("/"));
        if key.trim().ends_with('/') && !name.ends_with('/') {
            name.push('/');
        }
        name
    }

    /// Application-relative key for an absolute parameter name
    pub fn relative_key(&self, name: &str) -> String {
        let root = self.parameter_name("");
        let relative = match name.strip_prefix(root.as_str()) {
            Some(rest) if root != "/" && (rest.is_empty() || rest.starts_with('/')) => rest,
            _ => name,
        };

        if relative.starts_with('/') {
            relative.to_string()
        } else {
            format!("/{}", relative)
        }
    }

    fn checked_name(&self, key: &str) -> BackendResult<String> {
        let name = self.parameter_name(key);
        if key.trim().trim_matches('/').is_empty() || name.chars().any(char::is_whitespace) {
            return Err(BackendError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(name)
    }
}

/// Deepest path that can hold parameters starting with `name`
fn search_path(name: &str) -> &str {
    match name.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &name[..idx],
    }
}

#[async_trait]
impl<C: ParameterApi> KeyValueStore for SsmStore<C> {
    /// Parameter Store lists whole hierarchies, so the nearest enclosing path
    /// is listed and filtered down to names starting with `prefix`.
    async fn get_all_keys(&self, prefix: &str) -> BackendResult<Vec<String>> {
        let wanted = self.parameter_name(prefix);
        let names = self.client.names_by_path(search_path(&wanted)).await?;

        let mut keys: Vec<String> = names
            .iter()
            .filter(|name| name.starts_with(&wanted))
            .map(|name| self.relative_key(name))
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn get_value(&self, key: &str) -> BackendResult<String> {
        let name = self.checked_name(key)?;
        self.client.get_parameter(&name).await
    }

    async fn put_value(&self, key: &str, value: &str) -> BackendResult<()> {
        let name = self.checked_name(key)?;
        self.client.put_parameter(&name, value).await
    }

    async fn delete_key(&self, key: &str) -> BackendResult<()> {
        let name = self.checked_name(key)?;
        match self.client.delete_parameter(&name).await {
            Err(BackendError::NotFound { .. }) => {
                tracing::debug!(parameter = %name, "Parameter already absent");
                Ok(())
            }
            other => other,
        }
    }

    fn name(&self) -> &str {
        "ssm"
    }
}

impl<C: ParameterApi> Reconnect for SsmStore<C> {
    fn reconnect(&self) -> BackendResult<()> {
        self.client.reset()
    }
}
