//! URL variables: parse and compose `?k=v&k2=v2` onto URIs.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use gavf_value::Dictionary;
use tracing::warn;

use crate::serialize::{dictionary_from_buffer, dictionary_to_buffer};
use crate::Result;

/// Private key carrying an embedded variables dictionary in url-safe
/// base64, so HTTP headers can ride through an intermediate uri without
/// showing up as plain query parameters.
const HTTP_VARS_KEY: &str = "gavlhttpvars";

fn parse_vars(query: &str, vars: &mut Dictionary) {
    for part in query.split('&') {
        if part.is_empty() {
            continue;
        }
        match part.split_once('=') {
            None => {
                vars.set_int(part, 1);
            }
            Some((key, value)) => {
                if !key.is_empty() {
                    vars.set_string(key, value);
                }
            }
        }
    }
}

/// Read the variables off a uri without modifying it.
pub fn url_get_vars(uri: &str, vars: &mut Dictionary) {
    if let Some(pos) = uri.rfind('?') {
        parse_vars(&uri[pos + 1..], vars);
    }
}

/// Split the variables off a uri; returns the bare uri.
pub fn url_split_vars(uri: &str, vars: Option<&mut Dictionary>) -> String {
    match uri.rfind('?') {
        Some(pos) => {
            if let Some(vars) = vars {
                parse_vars(&uri[pos + 1..], vars);
            }
            uri[..pos].to_owned()
        }
        None => uri.to_owned(),
    }
}

/// Append variables onto a uri as query parameters.
///
/// Values are coerced to strings; composite values cannot ride in a uri
/// and are skipped with a warning.
pub fn url_append_vars(uri: &str, vars: &Dictionary) -> String {
    let mut out = uri.to_owned();
    for (name, val) in vars {
        let Some(val_str) = val.to_string_coerced() else {
            warn!(
                name,
                value_type = val.value_type().short_name(),
                "value type not supported in url variables"
            );
            continue;
        };
        let sep = if out.contains('?') { '&' } else { '?' };
        out.push(sep);
        out.push_str(name);
        out.push('=');
        out.push_str(&val_str);
    }
    out
}

/// Pull the embedded HTTP variables out of a uri.
///
/// Returns the uri with the private key removed (other variables stay)
/// and fills `vars` from the base64 payload.
pub fn url_extract_http_vars(uri: &str, vars: &mut Dictionary) -> String {
    let mut url_vars = Dictionary::new();
    let bare = url_split_vars(uri, Some(&mut url_vars));

    if let Some(encoded) = url_vars.get_string(HTTP_VARS_KEY) {
        match URL_SAFE_NO_PAD
            .decode(encoded)
            .ok()
            .and_then(|data| dictionary_from_buffer(&data).ok())
        {
            Some(decoded) => *vars = decoded,
            None => {
                warn!("discarding malformed http vars");
                vars.reset();
            }
        }
        url_vars.remove(HTTP_VARS_KEY);
    }

    url_append_vars(&bare, &url_vars)
}

/// Embed HTTP variables into a uri under the private key, merging with
/// any already present.
pub fn url_append_http_vars(uri: &str, vars: &Dictionary) -> Result<String> {
    if vars.is_empty() {
        return Ok(uri.to_owned());
    }
    let mut url_vars = Dictionary::new();
    let bare = url_split_vars(uri, Some(&mut url_vars));

    let mut http_vars = Dictionary::new();
    if let Some(encoded) = url_vars.get_string(HTTP_VARS_KEY) {
        if let Ok(data) = URL_SAFE_NO_PAD.decode(encoded) {
            if let Ok(decoded) = dictionary_from_buffer(&data) {
                http_vars = decoded;
            }
        }
    }
    http_vars.update_fields(vars);

    let encoded = URL_SAFE_NO_PAD.encode(dictionary_to_buffer(&http_vars)?);
    url_vars.set_string(HTTP_VARS_KEY, &encoded);

    Ok(url_append_vars(&bare, &url_vars))
}
