use std::cmp::Reverse;

use crate::variant::{ManifestVariantSet, Variant, VariantKind};

/// The two documents republished for every channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistPair {
    /// Every non audio-only variant, highest resolution first
    pub master: String,
    /// Only the highest resolution variant
    pub best: String,
}

/// Renders a variant set into a master and a best playlist.
///
/// Returns `None` when there is no video variant left to publish.
#[must_use]
pub fn synthesize(set: &ManifestVariantSet) -> Option<PlaylistPair> {
    let mut variants: Vec<&Variant> = set.variants.iter().collect();
    // Stable, equal heights keep manifest order
    variants.sort_by_key(|v| Reverse(v.height()));

    let blocks = variants
        .into_iter()
        .filter(|v| v.kind != VariantKind::AudioOnly)
        .map(render_variant)
        .collect::<Vec<String>>();

    let best_block = blocks.first()?;

    let header = render_header(set.version);
    Some(PlaylistPair {
        master: format!("{header}{}", blocks.concat()),
        best: format!("{header}{best_block}"),
    })
}

fn render_header(version: Option<usize>) -> String {
    match version {
        Some(version) => format!("#EXTM3U\n#EXT-X-VERSION:{version}\n"),
        None => "#EXTM3U\n".to_string(),
    }
}

/// `#EXT-X-STREAM-INF` line followed by the variant URI
fn render_variant(variant: &Variant) -> String {
    let mut attributes = Vec::with_capacity(4);

    if let Some(program_id) = &variant.program_id {
        attributes.push(format!("PROGRAM-ID={program_id}"));
    }
    if let Some(bandwidth) = variant.bandwidth.filter(|b| *b > 0) {
        attributes.push(format!("BANDWIDTH={bandwidth}"));
    }
    if !variant.codecs.is_empty() {
        attributes.push(format!("CODECS=\"{}\"", variant.codecs.join(",")));
    }
    if let Some(resolution) = variant
        .resolution
        .filter(|r| r.width > 0 && r.height > 0)
    {
        attributes.push(format!("RESOLUTION={resolution}"));
    }

    format!(
        "#EXT-X-STREAM-INF:{}\n{}\n",
        attributes.join(","),
        variant.uri
    )
}
