//! HTTP pieces of batch operation parts.

use crate::error::{BatchError, BatchResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::{Position, Url};

/// HTTP method of a batch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// PATCH.
    Patch,
    /// DELETE.
    Delete,
}

impl HttpMethod {
    /// Returns the method token.
    pub const fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(format!("unknown HTTP method '{other}'")),
        }
    }
}

/// How an operation's URL is written in its request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UriOption {
    /// `GET http://host/service/Customers HTTP/1.1`
    #[default]
    AbsoluteUri,
    /// `GET /service/Customers HTTP/1.1` followed by `Host: host`
    AbsoluteResourcePathAndHost,
    /// `GET Customers HTTP/1.1`, relative to the batch base URI
    RelativeToBatch,
}

/// Returns the reason phrase for common status codes, or an empty string.
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        412 => "Precondition Failed",
        415 => "Unsupported Media Type",
        424 => "Failed Dependency",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        503 => "Service Unavailable",
        _ => "",
    }
}

/// Request-line target and optional `Host` header of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequestTarget {
    pub target: String,
    pub host: Option<String>,
}

/// System resources that look like `$id` references but are not.
const SYSTEM_RESOURCES: &[&str] = &["metadata", "batch", "all", "crossjoin", "entity", "root"];

/// Returns the content id referenced by a `$id/...` URL.
pub(crate) fn content_id_reference(url: &str) -> Option<&str> {
    let rest = url.strip_prefix('$')?;
    let end = rest.find(['/', '?']).unwrap_or(rest.len());
    let id = &rest[..end];
    (!id.is_empty() && !SYSTEM_RESOURCES.contains(&id)).then_some(id)
}

/// Parses a base URI so that relative URLs resolve beneath it.
pub(crate) fn parse_base(base: &str) -> BatchResult<Url> {
    let normalized = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{base}/")
    };
    Url::parse(&normalized).map_err(|e| BatchError::invalid_url(base, e))
}

/// Works out how `url` appears in a request line.
pub(crate) fn request_target(
    url: &str,
    base: Option<&Url>,
    option: UriOption,
) -> BatchResult<RequestTarget> {
    let verbatim = || RequestTarget {
        target: url.to_string(),
        host: None,
    };
    if content_id_reference(url).is_some() {
        return Ok(verbatim());
    }
    let absolute = match Url::parse(url) {
        Ok(parsed) => Some(parsed),
        Err(url::ParseError::RelativeUrlWithoutBase) => match base {
            Some(base) => Some(base.join(url).map_err(|e| BatchError::invalid_url(url, e))?),
            None => None,
        },
        Err(e) => return Err(BatchError::invalid_url(url, e)),
    };
    let Some(absolute) = absolute else {
        return Ok(verbatim());
    };

    let target = match option {
        UriOption::AbsoluteUri => RequestTarget {
            target: absolute.to_string(),
            host: None,
        },
        UriOption::AbsoluteResourcePathAndHost => {
            let host = absolute.host_str().map(|host| match absolute.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            });
            RequestTarget {
                target: absolute[Position::BeforePath..].to_string(),
                host,
            }
        }
        UriOption::RelativeToBatch => {
            let relative = base.and_then(|base| absolute.as_str().strip_prefix(base.as_str()));
            RequestTarget {
                target: relative.map_or_else(|| absolute.to_string(), str::to_string),
                host: None,
            }
        }
    };
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        parse_base("http://host:8080/service").unwrap()
    }

    #[test]
    fn absolute_uri_resolves_against_base() {
        let target = request_target("Customers('ALFKI')", Some(&base()), UriOption::AbsoluteUri).unwrap();
        assert_eq!(target.target, "http://host:8080/service/Customers('ALFKI')");
        assert_eq!(target.host, None);
    }

    #[test]
    fn path_and_host() {
        let target = request_target(
            "Customers?$top=2",
            Some(&base()),
            UriOption::AbsoluteResourcePathAndHost,
        )
        .unwrap();
        assert_eq!(target.target, "/service/Customers?$top=2");
        assert_eq!(target.host.as_deref(), Some("host:8080"));
    }

    #[test]
    fn relative_to_batch_strips_base() {
        let target = request_target(
            "http://host:8080/service/Orders(1)",
            Some(&base()),
            UriOption::RelativeToBatch,
        )
        .unwrap();
        assert_eq!(target.target, "Orders(1)");
    }

    #[test]
    fn relative_without_base_is_verbatim() {
        let target = request_target("Orders", None, UriOption::AbsoluteResourcePathAndHost).unwrap();
        assert_eq!(target.target, "Orders");
        assert_eq!(target.host, None);
    }

    #[test]
    fn content_id_references() {
        assert_eq!(content_id_reference("$1/Orders"), Some("1"));
        assert_eq!(content_id_reference("$new?$select=Name"), Some("new"));
        assert_eq!(content_id_reference("$metadata"), None);
        assert_eq!(content_id_reference("Customers"), None);
        assert_eq!(
            request_target("$1/Orders", Some(&base()), UriOption::AbsoluteUri)
                .unwrap()
                .target,
            "$1/Orders"
        );
    }

    #[test]
    fn methods_parse_case_insensitively() {
        assert_eq!("patch".parse::<HttpMethod>(), Ok(HttpMethod::Patch));
        assert!("TRACE".parse::<HttpMethod>().is_err());
        assert_eq!(reason_phrase(201), "Created");
        assert_eq!(reason_phrase(299), "");
    }
}
