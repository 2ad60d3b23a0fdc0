//! Resource client for the shop REST API.
//!
//! Everything that touches the network goes through [`ResourceApi`]. The
//! HTTP implementation is built once from [`Config`] and maps transport,
//! status and body failures onto [`ApiError`].

use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::model::{Filter, ProductPage, SeriesPoint, Statistics};
use reqwest::blocking::{Client, Response};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

pub trait ResourceApi: Send + Sync {
    fn statistics(&self) -> Result<Statistics>;

    fn line_chart(&self, filter: Filter) -> Result<Vec<SeriesPoint>>;

    fn list_products(&self, page: u32, search: &str) -> Result<ProductPage>;

    fn delete_product(&self, id: u64) -> Result<()>;
}

pub struct HttpApi {
    base: Url,
    client: Client,
}

impl HttpApi {
    pub fn new(config: &Config) -> Result<Self> {
        let base = config.base()?;
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("shop-admin/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Network)?;
        Ok(Self { base, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| ApiError::Config(format!("cannot build URL for {path}: {e}")))
    }

    pub fn statistics_url(&self) -> Result<Url> {
        self.endpoint("api/dashboard/statistics")
    }

    pub fn line_chart_url(&self, filter: Filter) -> Result<Url> {
        let mut url = self.endpoint("api/dashboard/line-chart")?;
        url.query_pairs_mut().append_pair("filter", filter.as_query());
        Ok(url)
    }

    pub fn list_url(&self, page: u32, search: &str) -> Result<Url> {
        let mut url = self.endpoint("api/products/list")?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("search", search);
        Ok(url)
    }

    pub fn delete_url(&self, id: u64) -> Result<Url> {
        self.endpoint(&format!("api/products/delete/{id}"))
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "GET");
        let resp = self.client.get(url.clone()).send().map_err(ApiError::Network)?;
        let body = ensure_success(resp)?.text().map_err(ApiError::Network)?;
        serde_json::from_str(&body).map_err(|e| {
            warn!(%url, error = %e, "malformed response body");
            ApiError::from(e)
        })
    }
}

fn ensure_success(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(ApiError::Server {
            status,
            url: resp.url().to_string(),
        })
    }
}

impl ResourceApi for HttpApi {
    fn statistics(&self) -> Result<Statistics> {
        self.get_json(self.statistics_url()?)
    }

    fn line_chart(&self, filter: Filter) -> Result<Vec<SeriesPoint>> {
        self.get_json(self.line_chart_url(filter)?)
    }

    fn list_products(&self, page: u32, search: &str) -> Result<ProductPage> {
        self.get_json(self.list_url(page, search)?)
    }

    fn delete_product(&self, id: u64) -> Result<()> {
        let url = self.delete_url(id)?;
        debug!(%url, "DELETE");
        let resp = self.client.delete(url).send().map_err(ApiError::Network)?;
        ensure_success(resp)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Answers exactly one request with the given status and body, returning
    /// the request line it received.
    fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            let head = String::from_utf8_lossy(&head).to_string();
            head.lines().next().unwrap_or_default().to_string()
        });
        (format!("http://{addr}"), handle)
    }

    fn api_for(base_url: &str) -> HttpApi {
        let config = Config {
            base_url: base_url.to_string(),
            timeout_secs: 5,
            ..Config::default()
        };
        // Loopback servers must not be routed through a proxy from the environment
        HttpApi {
            base: config.base().unwrap(),
            client: Client::builder()
                .timeout(config.timeout())
                .no_proxy()
                .build()
                .unwrap(),
        }
    }

    #[test]
    fn new_rejects_invalid_base() {
        let config = Config {
            base_url: "localhost:8002".to_string(),
            ..Config::default()
        };
        assert!(matches!(HttpApi::new(&config), Err(ApiError::Config(_))));
    }

    #[test]
    fn builds_urls_from_single_base() {
        let api = api_for("http://localhost:8002/");
        assert_eq!(
            api.statistics_url().unwrap().as_str(),
            "http://localhost:8002/api/dashboard/statistics"
        );
        assert_eq!(
            api.line_chart_url(Filter::Month).unwrap().as_str(),
            "http://localhost:8002/api/dashboard/line-chart?filter=month"
        );
        assert_eq!(
            api.list_url(2, "").unwrap().as_str(),
            "http://localhost:8002/api/products/list?page=2&search="
        );
        assert_eq!(
            api.delete_url(42).unwrap().as_str(),
            "http://localhost:8002/api/products/delete/42"
        );
    }

    #[test]
    fn search_text_is_encoded() {
        let api = api_for("http://localhost:8002");
        let url = api.list_url(1, "red & blue").unwrap();
        assert_eq!(url.query(), Some("page=1&search=red+%26+blue"));
    }

    #[test]
    fn base_path_prefix_is_kept() {
        let api = api_for("https://example.com/shop");
        assert_eq!(
            api.statistics_url().unwrap().as_str(),
            "https://example.com/shop/api/dashboard/statistics"
        );
    }

    #[test]
    fn list_products_parses_body() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"data":[{"id":1,"name":"Widget","price":9.99,"quantity":5,"description":"x"}],"current_page":1,"last_page":1,"per_page":10}"#,
        );
        let page = api_for(&base).list_products(1, "wid").unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].name, "Widget");
        assert_eq!(
            server.join().unwrap(),
            "GET /api/products/list?page=1&search=wid HTTP/1.1"
        );
    }

    #[test]
    fn line_chart_sends_filter() {
        let (base, server) = serve_once("200 OK", r#"[{"x":"2024-01-01","y":3}]"#);
        let points = api_for(&base).line_chart(Filter::Year).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value, 3.0);
        assert_eq!(
            server.join().unwrap(),
            "GET /api/dashboard/line-chart?filter=year HTTP/1.1"
        );
    }

    #[test]
    fn delete_accepts_empty_success() {
        let (base, server) = serve_once("204 No Content", "");
        api_for(&base).delete_product(9).unwrap();
        assert_eq!(server.join().unwrap(), "DELETE /api/products/delete/9 HTTP/1.1");
    }

    #[test]
    fn non_success_status_is_server_error() {
        let (base, server) = serve_once("404 Not Found", r#"{"message":"missing"}"#);
        let err = api_for(&base).delete_product(3).unwrap_err();
        server.join().unwrap();
        match err {
            ApiError::Server { status, url } => {
                assert_eq!(status.as_u16(), 404);
                assert!(url.ends_with("/api/products/delete/3"));
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_body_is_parse_error() {
        let (base, server) = serve_once("200 OK", r#"{"total_products": "#);
        let err = api_for(&base).statistics().unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, ApiError::Parse(_)), "{err:?}");
    }

    #[test]
    fn refused_connection_is_network_error() {
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let err = api_for(&format!("http://{addr}")).statistics().unwrap_err();
        assert!(matches!(err, ApiError::Network(_)), "{err:?}");
    }
}
