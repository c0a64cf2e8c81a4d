//! Reader-proxy URL normalization.

use tracing::{error, info, warn};

/// Reader proxy every fetched page goes through.
pub const READER_PREFIX: &str = "https://r.jina.ai/";

const READER_HOST: &str = "r.jina.ai/";

/// Rewrite `url` into the canonical `https://r.jina.ai/<scheme>://<target>` form.
///
/// Existing reader prefixes are stripped first, so the result is the same
/// whether or not the input was already formatted.
pub fn format_for_reader(url: &str) -> String {
    let mut target = url.trim();
    if let Some(index) = target.rfind(READER_HOST) {
        target = &target[index + READER_HOST.len()..];
        info!("Stripped existing reader prefix, base URL: {}", target);
    }

    let target = if target.starts_with("http://") || target.starts_with("https://") {
        target.to_string()
    } else {
        format!("https://{}", target)
    };

    let mut formatted = format!("{}{}", READER_PREFIX, target);
    while formatted.contains("https://https://") {
        formatted = formatted.replace("https://https://", "https://");
        warn!("Removed duplicated scheme: {}", formatted);
    }

    if !formatted.starts_with("https://r.jina.ai/http") {
        error!("Malformed reader URL: {}", formatted);
    }
    info!("Reader URL: {}", formatted);
    formatted
}
