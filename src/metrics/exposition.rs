use prometheus::{Encoder, Registry, TextEncoder};

/// Render every metric in `registry` in the Prometheus text format
pub fn render_text(registry: &Registry) -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();

    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;

    Ok(String::from_utf8(buffer)?)
}
