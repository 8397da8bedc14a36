//! Minimal OCI distribution client: tag to manifest digest, nothing more.

use crate::error::{Error, Result};
use crate::hash;
use crate::oci::DigestResolver;

use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, WWW_AUTHENTICATE};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const DOCKER_HUB: &str = "docker.io";
const DOCKER_HUB_REGISTRY: &str = "registry-1.docker.io";
const CONTENT_DIGEST_HEADER: &str = "Docker-Content-Digest";

const MANIFEST_MEDIA_TYPES: &str = "application/vnd.oci.image.index.v1+json, \
    application/vnd.docker.distribution.manifest.list.v2+json, \
    application/vnd.oci.image.manifest.v1+json, \
    application/vnd.docker.distribution.manifest.v2+json";

/// A parsed `[registry/]repository[:tag|@digest]` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub registry: String,
    pub repository: String,
    /// A tag, or a digest when the reference used `@`.
    pub reference: String,
}

impl ImageReference {
    pub fn parse(input: &str) -> Result<Self> {
        let (name, reference) = match input.split_once('@') {
            Some((name, digest)) => (name, digest.to_string()),
            None => {
                let last_slash = input.rfind('/').map(|i| i + 1).unwrap_or(0);
                match input[last_slash..].rfind(':') {
                    Some(i) => (
                        &input[..last_slash + i],
                        input[last_slash + i + 1..].to_string(),
                    ),
                    None => (input, super::DEFAULT_TAG.to_string()),
                }
            }
        };

        if name.is_empty() || reference.is_empty() {
            return Err(Error::Validation(format!(
                "invalid image reference: {input}"
            )));
        }

        let (registry, repository) = match name.split_once('/') {
            Some((host, rest))
                if host.contains('.') || host.contains(':') || host == "localhost" =>
            {
                (host.to_string(), rest.to_string())
            }
            _ => (DOCKER_HUB.to_string(), name.to_string()),
        };

        let repository = if registry == DOCKER_HUB && !repository.contains('/') {
            format!("library/{repository}")
        } else {
            repository
        };

        Ok(Self {
            registry,
            repository,
            reference,
        })
    }

    /// Host serving the registry API.
    pub fn api_host(&self) -> &str {
        if self.registry == DOCKER_HUB {
            DOCKER_HUB_REGISTRY
        } else {
            &self.registry
        }
    }

    fn scheme(&self) -> &'static str {
        let host = self.registry.split(':').next().unwrap_or_default();
        if host == "localhost" || host == "127.0.0.1" {
            "http"
        } else {
            "https"
        }
    }

    pub fn manifest_url(&self) -> String {
        format!(
            "{}://{}/v2/{}/manifests/{}",
            self.scheme(),
            self.api_host(),
            self.repository,
            self.reference
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegistryCredentials {
    pub username: String,
    pub password: String,
}

/// Resolves image tags against a registry over HTTP.
pub struct RegistryClient {
    client: Client,
    credentials: Option<RegistryCredentials>,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

impl RegistryClient {
    /// `allow_insecure` disables TLS certificate validation; only meant for testing.
    pub fn new(
        credentials: Option<RegistryCredentials>,
        allow_insecure: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(allow_insecure)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Registry(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            credentials: credentials.filter(|c| !c.username.is_empty()),
        })
    }

    fn manifest_request(&self, url: &str, head: bool) -> RequestBuilder {
        let request = if head {
            self.client.head(url)
        } else {
            self.client.get(url)
        };
        request.header(ACCEPT, MANIFEST_MEDIA_TYPES)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        request
            .send()
            .map_err(|e| Error::Registry(e.to_string()))
    }

    /// Answers a `WWW-Authenticate` challenge with the matching authorization.
    fn authorize(&self, challenge: &str, request: RequestBuilder) -> Result<RequestBuilder> {
        let (scheme, params) = parse_challenge(challenge);

        if scheme.eq_ignore_ascii_case("basic") {
            return match &self.credentials {
                Some(c) => Ok(request.basic_auth(&c.username, Some(&c.password))),
                None => Err(Error::Registry(
                    "registry requires credentials but none were given".to_string(),
                )),
            };
        }

        let realm = params
            .get("realm")
            .ok_or_else(|| Error::Registry(format!("unsupported auth challenge: {challenge}")))?;
        let query: Vec<(&str, &str)> = ["service", "scope"]
            .iter()
            .filter_map(|k| params.get(*k).map(|v| (*k, v.as_str())))
            .collect();

        let mut token_request = self.client.get(realm).query(&query);
        if let Some(c) = &self.credentials {
            token_request = token_request.basic_auth(&c.username, Some(&c.password));
        }

        let response = self.send(token_request)?;
        if !response.status().is_success() {
            return Err(Error::Registry(format!(
                "token request to {realm} failed: {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .map_err(|e| Error::Registry(format!("invalid token response: {e}")))?;
        let token = token
            .token
            .or(token.access_token)
            .ok_or_else(|| Error::Registry("token response carried no token".to_string()))?;

        Ok(request.bearer_auth(token))
    }

    fn fetch(&self, url: &str, head: bool) -> Result<Response> {
        let response = self.send(self.manifest_request(url, head))?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::Registry(format!("{url}: unauthorized")))?
            .to_string();

        self.send(self.authorize(&challenge, self.manifest_request(url, head))?)
    }
}

impl DigestResolver for RegistryClient {
    fn digest(&self, reference: &str) -> Result<String> {
        let image = ImageReference::parse(reference)?;
        let url = image.manifest_url();
        debug!("HEAD: {url}");

        let response = self.fetch(&url, true)?;
        if response.status().is_success() {
            if let Some(digest) = response
                .headers()
                .get(CONTENT_DIGEST_HEADER)
                .and_then(|v| v.to_str().ok())
            {
                return Ok(digest.to_string());
            }
        }

        // Some registries omit the digest header on HEAD; hash the manifest instead.
        debug!("GET: {url}");
        let response = self.fetch(&url, false)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Registry(format!("{reference}: {status}")));
        }

        if let Some(digest) = response
            .headers()
            .get(CONTENT_DIGEST_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            return Ok(digest.to_string());
        }

        let body = response
            .bytes()
            .map_err(|e| Error::Registry(format!("failed to read manifest for {reference}: {e}")))?;
        Ok(format!("{}:{}", hash::SHA256, hash::calculate_hash(&body)))
    }
}

/// Splits `Bearer realm="...",service="..."` into its scheme and parameters.
pub fn parse_challenge(header: &str) -> (String, HashMap<String, String>) {
    let header = header.trim();
    let (scheme, rest) = header.split_once(' ').unwrap_or((header, ""));

    let mut params = HashMap::new();
    let mut remaining = rest.trim();
    while !remaining.is_empty() {
        let Some((key, after_key)) = remaining.split_once('=') else {
            break;
        };
        let key = key.trim().trim_start_matches(',').trim().to_ascii_lowercase();

        let (value, tail) = if let Some(quoted) = after_key.strip_prefix('"') {
            match quoted.split_once('"') {
                Some((value, tail)) => (value, tail),
                None => (quoted, ""),
            }
        } else {
            after_key.split_once(',').unwrap_or((after_key, ""))
        };

        params.insert(key, value.to_string());
        remaining = tail.trim_start_matches(',').trim();
    }

    (scheme.to_string(), params)
}
