// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Firmware download over HTTP(S).

use std::io::{ErrorKind, Read};

use tracing::{debug, info};
use url::Url;

use crate::error::FetchError;

pub const MAX_REDIRECTS: usize = 5;
const CHUNK_SIZE: usize = 8 * 1024;
/// Largest body accepted as a firmware image.
pub const MAX_IMAGE_SIZE: u64 = 16 * 1024 * 1024;

pub struct HttpResponse {
    pub status: u16,
    pub location: Option<String>,
    pub content_length: Option<u64>,
    pub body: Box<dyn Read + Send>,
}

/// A single GET without redirect handling.
pub trait HttpClient {
    fn get(&self, url: &str) -> Result<HttpResponse, FetchError>;
}

pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().redirects(0).build(),
        }
    }
}

impl Default for UreqClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for UreqClient {
    fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let response = match self.agent.get(url).call() {
            Ok(r) => r,
            // Non-2xx statuses are still responses; redirects land here.
            Err(ureq::Error::Status(_, r)) => r,
            Err(e) => return Err(FetchError::Network(e.to_string())),
        };
        Ok(HttpResponse {
            status: response.status(),
            location: response.header("Location").map(str::to_string),
            content_length: response
                .header("Content-Length")
                .and_then(|v| v.trim().parse().ok()),
            body: Box::new(response.into_reader()),
        })
    }
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// Resolve a `Location` header against the URL that produced it.
fn resolve(base: &str, location: &str) -> Result<String, FetchError> {
    let invalid = |source| FetchError::InvalidUrl {
        url: location.to_string(),
        source,
    };
    let base = Url::parse(base).map_err(invalid)?;
    Ok(base.join(location).map_err(invalid)?.into())
}

/// Fetch `url`, following redirects, and return the whole body.
///
/// `on_progress` receives strictly increasing fractions and ends at 1.0.
pub fn download<C, F>(client: &C, url: &str, mut on_progress: F) -> Result<Vec<u8>, FetchError>
where
    C: HttpClient + ?Sized,
    F: FnMut(f32),
{
    let mut current = url.to_string();
    let mut redirects = 0;

    let response = loop {
        let response = client.get(&current)?;
        if !is_redirect(response.status) {
            break response;
        }
        if redirects == MAX_REDIRECTS {
            return Err(FetchError::TooManyRedirects);
        }
        redirects += 1;
        let location = response.location.ok_or(FetchError::MissingLocation)?;
        current = resolve(&current, &location)?;
        debug!(status = response.status, to = %current, "following redirect");
    };

    if response.status != 200 {
        return Err(FetchError::Status(response.status));
    }

    let total = response.content_length.filter(|&n| n > 0);
    if let Some(n) = total.filter(|&n| n > MAX_IMAGE_SIZE) {
        return Err(FetchError::TooLarge(n));
    }
    let mut body = response.body;
    let mut data = Vec::with_capacity(total.unwrap_or(0) as usize);
    let mut chunk = [0u8; CHUNK_SIZE];
    let mut reported = 0.0f32;

    loop {
        let n = match body.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        data.extend_from_slice(&chunk[..n]);
        if data.len() as u64 > MAX_IMAGE_SIZE {
            return Err(FetchError::TooLarge(data.len() as u64));
        }
        if let Some(total) = total {
            let fraction = (data.len() as f64 / total as f64).min(1.0) as f32;
            if fraction > reported {
                reported = fraction;
                on_progress(fraction);
            }
        }
    }

    if reported < 1.0 {
        on_progress(1.0);
    }
    info!(url = %current, bytes = data.len(), "firmware downloaded");
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::io::Cursor;

    struct Scripted {
        status: u16,
        location: Option<&'static str>,
        body: Vec<u8>,
        content_length: Option<u64>,
    }

    #[derive(Default)]
    struct ScriptedClient {
        routes: HashMap<String, Scripted>,
        requests: RefCell<Vec<String>>,
    }

    impl ScriptedClient {
        fn route(
            mut self,
            url: &str,
            status: u16,
            location: Option<&'static str>,
            body: Vec<u8>,
        ) -> Self {
            let content_length = Some(body.len() as u64);
            self.routes.insert(
                url.to_string(),
                Scripted {
                    status,
                    location,
                    body,
                    content_length,
                },
            );
            self
        }

        fn content_length(mut self, url: &str, length: Option<u64>) -> Self {
            if let Some(route) = self.routes.get_mut(url) {
                route.content_length = length;
            }
            self
        }
    }

    impl HttpClient for ScriptedClient {
        fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
            self.requests.borrow_mut().push(url.to_string());
            let route = self
                .routes
                .get(url)
                .ok_or_else(|| FetchError::Network(format!("no route to {}", url)))?;
            Ok(HttpResponse {
                status: route.status,
                location: route.location.map(str::to_string),
                content_length: route.content_length,
                body: Box::new(Cursor::new(route.body.clone())),
            })
        }
    }

    #[test]
    fn test_redirect_then_body() {
        let payload: Vec<u8> = (0..20_000).map(|i| i as u8).collect();
        let client = ScriptedClient::default()
            .route("https://a.example/fw.bin", 302, Some("https://cdn.example/fw.bin"), Vec::new())
            .route("https://cdn.example/fw.bin", 200, None, payload.clone());

        let mut progress = Vec::new();
        let data = download(&client, "https://a.example/fw.bin", |p| progress.push(p)).unwrap();

        assert_eq!(data, payload);
        assert!(progress.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(progress.last(), Some(&1.0));
        assert_eq!(progress.len(), 3);
        assert_eq!(client.requests.borrow().len(), 2);
    }

    #[test]
    fn test_root_relative_location() {
        let client = ScriptedClient::default()
            .route("https://a.example/latest", 301, Some("/files/v2.bin"), Vec::new())
            .route("https://a.example/files/v2.bin", 200, None, vec![1, 2, 3]);
        let data = download(&client, "https://a.example/latest", |_| {}).unwrap();
        assert_eq!(data, vec![1, 2, 3]);
    }

    #[test]
    fn test_redirect_limit() {
        let client = ScriptedClient::default().route(
            "https://loop.example/a",
            307,
            Some("https://loop.example/a"),
            Vec::new(),
        );
        let err = download(&client, "https://loop.example/a", |_| {}).unwrap_err();
        assert!(matches!(err, FetchError::TooManyRedirects));
        assert_eq!(client.requests.borrow().len(), MAX_REDIRECTS + 1);
    }

    #[test]
    fn test_redirect_without_location() {
        let client = ScriptedClient::default().route("https://a.example/", 302, None, Vec::new());
        let err = download(&client, "https://a.example/", |_| {}).unwrap_err();
        assert!(matches!(err, FetchError::MissingLocation));
    }

    #[test]
    fn test_non_200_fails() {
        let client =
            ScriptedClient::default().route("https://a.example/fw", 404, None, b"nope".to_vec());
        let err = download(&client, "https://a.example/fw", |_| panic!("no progress on failure"))
            .unwrap_err();
        assert!(matches!(err, FetchError::Status(404)));
    }

    #[test]
    fn test_network_failure() {
        let client = ScriptedClient::default();
        let err = download(&client, "https://down.example/", |_| {}).unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }

    #[test]
    fn test_without_content_length_reports_once() {
        let client = ScriptedClient::default()
            .route("http://h/fw", 200, None, vec![7; 30_000])
            .content_length("http://h/fw", None);
        let mut progress = Vec::new();
        let data = download(&client, "http://h/fw", |p| progress.push(p)).unwrap();
        assert_eq!(data.len(), 30_000);
        assert_eq!(progress, vec![1.0]);
    }

    #[test]
    fn test_huge_content_length_is_rejected() {
        let client = ScriptedClient::default()
            .route("https://a.example/fw", 200, None, vec![1, 2, 3])
            .content_length("https://a.example/fw", Some(u64::MAX / 2));
        let err = download(&client, "https://a.example/fw", |_| {}).unwrap_err();
        assert!(matches!(err, FetchError::TooLarge(n) if n == u64::MAX / 2));
    }

    #[test]
    fn test_protocol_relative_location() {
        let client = ScriptedClient::default()
            .route("https://a.example/fw.bin", 302, Some("//cdn.example/fw.bin"), Vec::new())
            .route("https://cdn.example/fw.bin", 200, None, vec![9; 10]);
        let data = download(&client, "https://a.example/fw.bin", |_| {}).unwrap();
        assert_eq!(data, vec![9; 10]);
    }

    #[test]
    fn test_resolve() {
        let r = |base, location| resolve(base, location).unwrap();
        assert_eq!(r("https://a.b/x/y", "https://c.d/z"), "https://c.d/z");
        assert_eq!(r("https://a.b/x/y", "/z"), "https://a.b/z");
        assert_eq!(r("https://a.b", "/z"), "https://a.b/z");
        assert_eq!(r("https://a.b/x/y", "z"), "https://a.b/x/z");
        assert_eq!(
            r("https://a.example/fw.bin", "//cdn.example/fw.bin"),
            "https://cdn.example/fw.bin"
        );
        assert_eq!(r("https://a.example/dl?f=a/b", "fw.bin"), "https://a.example/fw.bin");
    }

    #[test]
    fn test_unparsable_base_is_an_error() {
        assert!(matches!(resolve("not a url", "/z"), Err(FetchError::InvalidUrl { .. })));
    }
}
