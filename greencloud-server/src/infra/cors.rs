use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, Method, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use greencloud_config::CorsConfig;
use regex::Regex;
use tower_http::cors::{
    AllowHeaders, AllowMethods, AllowOrigin, CorsLayer, ExposeHeaders,
};
use tracing::debug;

use super::errors::AppError;

/// Paths under this prefix only accept cross-origin GET.
const ACTUATOR_PREFIX: &str = "/actuator";

/// Compiled origin allow-list. Patterns use `*` as a wildcard for any run of
/// characters, e.g. `http://localhost:*`.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    patterns: Vec<Regex>,
}

impl OriginPolicy {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|pattern| compile_pattern(pattern.as_ref().trim()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(origin))
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{body}$"))
}

/// `true` when the Origin names the same host the request was sent to.
fn is_same_origin(origin: &str, host: Option<&str>) -> bool {
    let Some(host) = host else {
        return false;
    };
    origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
        .is_some_and(|authority| authority.eq_ignore_ascii_case(host))
}

pub fn build_cors_layer(config: &CorsConfig, policy: Arc<OriginPolicy>) -> CorsLayer {
    let methods: Vec<Method> = config
        .allowed_methods
        .iter()
        .filter_map(|m| Method::from_bytes(m.trim().as_bytes()).ok())
        .collect();

    let allow_headers = if config.allows_any_header() {
        AllowHeaders::mirror_request()
    } else {
        AllowHeaders::list(parse_header_names(&config.allowed_headers))
    };

    let mut layer = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts| {
                origin.to_str().is_ok_and(|origin| policy.allows(origin))
            },
        ))
        .allow_methods(AllowMethods::list(methods))
        .allow_headers(allow_headers)
        .expose_headers(ExposeHeaders::list(parse_header_names(
            &config.exposed_headers,
        )))
        .max_age(Duration::from_secs(config.max_age));

    if config.allow_credentials {
        layer = layer.allow_credentials(true);
    }

    layer
}

fn parse_header_names(names: &[String]) -> Vec<HeaderName> {
    names
        .iter()
        .filter(|name| name.trim() != "*")
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect()
}

/// Answers 403 to cross-origin requests whose Origin is not allowed. Runs
/// outside the [`CorsLayer`] so rejected requests carry no CORS headers.
/// Actuator preflights advertise GET only.
pub async fn reject_disallowed_origins(
    State(policy): State<Arc<OriginPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let headers = request.headers();
    let Some(origin) = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
    else {
        return next.run(request).await;
    };

    let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());
    if is_same_origin(origin, host) {
        return next.run(request).await;
    }

    if !policy.allows(origin) {
        debug!(origin, "rejected cross-origin request");
        return AppError::forbidden().into_response();
    }

    if !request.uri().path().starts_with(ACTUATOR_PREFIX) {
        return next.run(request).await;
    }

    let preflight = request.method() == Method::OPTIONS;
    let method = if preflight {
        headers
            .get(header::ACCESS_CONTROL_REQUEST_METHOD)
            .and_then(|value| Method::from_bytes(value.as_bytes()).ok())
    } else {
        Some(request.method().clone())
    };
    if method.is_some_and(|m| m != Method::GET) {
        debug!(origin, "rejected cross-origin actuator request");
        return AppError::forbidden().into_response();
    }

    let mut response = next.run(request).await;
    if preflight
        && response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS)
    {
        response.headers_mut().insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET"),
        );
    }
    response
}
