// ── Camera endpoint URLs ──

use url::Url;

use crate::config::EndpointConfig;
use crate::error::CoreError;
use crate::model::CameraFeed;

/// Plain stream endpoint, e.g. `http://172.31.0.101:81/stream`.
pub fn stream_url(config: &EndpointConfig, feed: &CameraFeed) -> Result<Url, CoreError> {
    let mut url = Url::parse("http://localhost/")?;
    url.set_ip_host(feed.ip)
        .map_err(|()| CoreError::InvalidEndpoint {
            camera: feed.id,
            reason: format!("cannot use {} as host", feed.ip),
        })?;
    url.set_port(Some(config.port))
        .map_err(|()| CoreError::InvalidEndpoint {
            camera: feed.id,
            reason: format!("cannot use port {}", config.port),
        })?;
    url.set_path(&config.path);
    Ok(url)
}

/// Endpoint with cache-defeating parameters, forcing a new connection
/// rather than reuse of a cached response.
pub fn fresh_stream_url(
    config: &EndpointConfig,
    feed: &CameraFeed,
    stream_key: u64,
    timestamp_millis: i64,
) -> Result<Url, CoreError> {
    let mut url = stream_url(config, feed)?;
    url.query_pairs_mut()
        .append_pair("key", &stream_key.to_string())
        .append_pair("t", &timestamp_millis.to_string());
    Ok(url)
}
