//! Request construction from a source descriptor and a bound candidate.
//!
//! Template placeholders (`{email}`) are filled from bound parameters first,
//! then static parameters, percent-encoded. Parameters not consumed by the
//! template go to the query string for GET sources and to a JSON object
//! body for POST sources. Auth is applied last.

use std::collections::BTreeMap;

use argus_core::catalog::template_placeholders;
use argus_core::enums::HttpMethod;
use argus_core::{AuthDescriptor, FailureKind, QueryCandidate, SourceDescriptor};
use serde_json::{Map, Value};

use crate::error::CallError;
use crate::secrets::SecretResolver;
use crate::transport::TransportRequest;

/// Build the request for `candidate` against `source`.
///
/// # Errors
///
/// - [`FailureKind::Request`] if a placeholder has no value or the template
///   is malformed.
/// - [`FailureKind::Auth`] if the source needs a secret that is not set.
pub fn build_request(
    source: &SourceDescriptor,
    candidate: &QueryCandidate,
    secrets: &dyn SecretResolver,
) -> Result<TransportRequest, CallError> {
    let mut params: BTreeMap<&str, &str> = source
        .static_params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    for (k, v) in &candidate.bound_params {
        params.insert(k.as_str(), v.as_str());
    }

    let placeholders = template_placeholders(&source.endpoint_template)
        .map_err(|e| CallError::new(FailureKind::Request, e.to_string()))?;
    let mut url = source.endpoint_template.clone();
    for name in &placeholders {
        let value = params.get(name).ok_or_else(|| {
            CallError::new(
                FailureKind::Request,
                format!("no value for placeholder '{{{name}}}'"),
            )
        })?;
        url = url.replace(&format!("{{{name}}}"), &urlencoding::encode(value));
    }
    // A placeholder may repeat; its param is only dropped once all are filled.
    for name in &placeholders {
        params.remove(name);
    }

    let mut query: Vec<(String, String)> = Vec::new();
    let mut body = None;
    match source.http_method {
        HttpMethod::Get => {
            query.extend(params.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())));
        }
        HttpMethod::Post => {
            let object: Map<String, Value> = params
                .iter()
                .map(|(k, v)| ((*k).to_string(), Value::String((*v).to_string())))
                .collect();
            body = Some(Value::Object(object));
        }
    }

    let mut headers = source.headers.clone();
    if let Some(name) = source.auth.secret_name() {
        let secret = secrets.resolve(name).ok_or_else(|| {
            CallError::new(
                FailureKind::Auth,
                format!("secret '{name}' is not set for source '{}'", source.id),
            )
        })?;
        match &source.auth {
            AuthDescriptor::Header { name, .. } => {
                headers.insert(name.clone(), secret);
            }
            AuthDescriptor::Query { param, .. } => query.push((param.clone(), secret)),
            AuthDescriptor::Bearer { .. } => {
                headers.insert("Authorization".to_string(), format!("Bearer {secret}"));
            }
            AuthDescriptor::None => {}
        }
    }

    if !query.is_empty() {
        let encoded: Vec<String> = query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        let sep = if url.contains('?') { '&' } else { '?' };
        url = format!("{url}{sep}{}", encoded.join("&"));
    }

    Ok(TransportRequest {
        method: source.http_method,
        url,
        headers,
        body,
    })
}
