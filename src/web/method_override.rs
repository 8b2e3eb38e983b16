//! HTML forms can only submit GET and POST. A POST carrying
//! `?_method=PATCH` (or `PUT`/`DELETE`) in its query string is rewritten to
//! that method before routing.

use axum::extract::{Query, Request};
use axum::http::{Method, Uri};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Override {
    #[serde(rename = "_method")]
    method: Option<String>,
}

pub fn method_override(mut request: Request) -> Request {
    if request.method() != Method::POST {
        return request;
    }

    if let Some(method) = overridden_method(request.uri()) {
        tracing::trace!(%method, path = request.uri().path(), "Method override");
        *request.method_mut() = method;
    }

    request
}

fn overridden_method(uri: &Uri) -> Option<Method> {
    let Query(query) = Query::<Override>::try_from_uri(uri).ok()?;
    match query.method?.to_ascii_uppercase().as_str() {
        "PATCH" => Some(Method::PATCH),
        "PUT" => Some(Method::PUT),
        "DELETE" => Some(Method::DELETE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(method: Method, uri: &str) -> Request {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn post_with_override_is_rewritten() {
        let req = method_override(request(Method::POST, "/users/1?_method=PATCH"));
        assert_eq!(req.method(), Method::PATCH);
        assert_eq!(req.uri().path(), "/users/1");

        let req = method_override(request(Method::POST, "/users/1?x=1&_method=delete"));
        assert_eq!(req.method(), Method::DELETE);
    }

    #[test]
    fn percent_encoded_override_is_decoded() {
        let req = method_override(request(Method::POST, "/users/1/messages/2?%5Fmethod=DELETE"));
        assert_eq!(req.method(), Method::DELETE);

        let req = method_override(request(Method::POST, "/users/1?_method=%50ATCH"));
        assert_eq!(req.method(), Method::PATCH);
    }

    #[test]
    fn only_post_is_overridden() {
        let req = method_override(request(Method::GET, "/users/1?_method=DELETE"));
        assert_eq!(req.method(), Method::GET);
    }

    #[test]
    fn unknown_override_is_ignored() {
        let req = method_override(request(Method::POST, "/users?_method=TRACE"));
        assert_eq!(req.method(), Method::POST);

        let req = method_override(request(Method::POST, "/users"));
        assert_eq!(req.method(), Method::POST);
    }
}
