//! Response cache keys.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use axum::http::{Request, header};

/// Identifies one cached response.
///
/// Pages render differently per logged-in user, so the `Cookie` header is
/// part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseKey {
    pub prefix: &'static str,
    pub path: String,
    pub query_hash: u64,
    pub vary_hash: u64,
}

impl ResponseKey {
    pub fn for_request<B>(prefix: &'static str, request: &Request<B>) -> Self {
        let cookie = request
            .headers()
            .get_all(header::COOKIE)
            .iter()
            .map(|value| value.as_bytes().to_vec())
            .collect::<Vec<_>>();

        Self {
            prefix,
            path: request.uri().path().to_string(),
            query_hash: hash_value(&request.uri().query().unwrap_or("")),
            vary_hash: hash_value(&cookie),
        }
    }
}

pub fn hash_value<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn request(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn key_varies_by_query_and_cookie() {
        let plain = ResponseKey::for_request("index_page", &request("/", None));
        let paged = ResponseKey::for_request("index_page", &request("/?page=2", None));
        let logged_in =
            ResponseKey::for_request("index_page", &request("/", Some("yatube_session=abc")));

        assert_ne!(plain, paged);
        assert_ne!(plain, logged_in);
        assert_eq!(
            plain,
            ResponseKey::for_request("index_page", &request("/", None))
        );
    }
}
