use m3u8_rs::{MasterPlaylist, Playlist, QuotedOrUnquoted, VariantStream};
use reqwest::{Url, header::HeaderMap};
use tracing::{debug, info, instrument};

use crate::{
    error::ChannelError,
    http::Fetcher,
    variant::{ManifestVariantSet, Resolution, Variant, VariantKind},
};

const STREAM_INF_TAG: &str = "#EXT-X-STREAM-INF:";

/// Fetches a located manifest and turns it into a [`ManifestVariantSet`]
///
/// A media playlist (no variants to choose from) yields an empty set.
///
/// # Errors
/// Errors when the manifest cannot be fetched or is not an HLS playlist
#[instrument(skip(fetcher, headers), fields(url = %manifest_url))]
pub async fn extract_variants<F: Fetcher>(
    fetcher: &F,
    manifest_url: &Url,
    headers: &HeaderMap,
) -> Result<ManifestVariantSet, ChannelError> {
    let body = fetcher
        .fetch_text(manifest_url, headers)
        .await
        .map_err(|e| ChannelError::Extraction {
            url: manifest_url.clone(),
            reason: e.to_string(),
        })?;

    parse_manifest(manifest_url, &body)
}

/// # Errors
/// Errors when `body` is not an HLS playlist
pub fn parse_manifest(
    manifest_url: &Url,
    body: &str,
) -> Result<ManifestVariantSet, ChannelError> {
    let body = fill_missing_bandwidth(body);

    match m3u8_rs::parse_playlist_res(body.as_bytes()) {
        Ok(Playlist::MasterPlaylist(playlist)) => Ok(variant_set(manifest_url, playlist)),
        Ok(Playlist::MediaPlaylist(_)) => {
            debug!("Manifest is a media playlist, nothing to choose from");
            Ok(ManifestVariantSet::default())
        }
        Err(_) => Err(ChannelError::Extraction {
            url: manifest_url.clone(),
            reason: "not an HLS playlist".to_string(),
        }),
    }
}

/// `m3u8-rs` drops `#EXT-X-STREAM-INF` entries without `BANDWIDTH`, give them a `0` placeholder
fn fill_missing_bandwidth(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    for line in body.lines() {
        match line.strip_prefix(STREAM_INF_TAG) {
            Some(attributes)
                if !attributes.starts_with("BANDWIDTH=") && !attributes.contains(",BANDWIDTH=") =>
            {
                debug!("Variant without bandwidth: {line}");
                out.push_str(STREAM_INF_TAG);
                out.push_str("BANDWIDTH=0");
                if !attributes.is_empty() {
                    out.push(',');
                    out.push_str(attributes);
                }
            }
            _ => out.push_str(line),
        }
        out.push('\n');
    }
    out
}

fn variant_set(manifest_url: &Url, playlist: MasterPlaylist) -> ManifestVariantSet {
    let variants = playlist
        .variants
        .into_iter()
        .filter(|v| !v.is_i_frame)
        .map(|v| variant(manifest_url, v))
        .collect::<Vec<Variant>>();

    info!(
        "Available qualities: {}",
        variants
            .iter()
            .map(|v| v
                .resolution
                .map_or("Unknown resolution".to_string(), |r| r.to_string()))
            .collect::<Vec<String>>()
            .join(", ")
    );

    ManifestVariantSet {
        version: playlist.version,
        variants,
    }
}

fn variant(manifest_url: &Url, stream: VariantStream) -> Variant {
    let codecs: Vec<String> = stream
        .codecs
        .as_deref()
        .map(|c| {
            c.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();

    let resolution = stream.resolution.map(|r| Resolution {
        width: r.width,
        height: r.height,
    });

    let program_id = stream
        .other_attributes
        .as_ref()
        .and_then(|attrs| attrs.get("PROGRAM-ID"))
        .map(|id| match id {
            QuotedOrUnquoted::Quoted(s) | QuotedOrUnquoted::Unquoted(s) => s.clone(),
        });

    // Republished playlists are served from elsewhere, relative URIs would break
    let uri = manifest_url
        .join(&stream.uri)
        .map_or(stream.uri.clone(), |u| u.to_string());

    Variant {
        kind: VariantKind::classify(stream.video.as_deref(), resolution, &codecs),
        uri,
        bandwidth: Some(stream.bandwidth).filter(|b| *b > 0),
        program_id,
        codecs,
        resolution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{http::testing::StaticFetcher, playlist::synthesize};

    const MANIFEST_URL: &str = "https://cdn.example.com/live/channel/master.m3u8";

    const TWITCH_LIKE: &str = concat!(
        "#EXTM3U\n",
        "#EXT-X-VERSION:3\n",
        "#EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH=1427999,CODECS=\"avc1.4D401F,mp4a.40.2\",RESOLUTION=1280x720,VIDEO=\"720p30\"\n",
        "720p/index.m3u8\n",
        "#EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH=6000000,CODECS=\"avc1.64002A,mp4a.40.2\",RESOLUTION=1920x1080,VIDEO=\"chunked\"\n",
        "https://other.example.com/1080p/index.m3u8\n",
        "#EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH=160000,CODECS=\"mp4a.40.2\",VIDEO=\"audio_only\"\n",
        "audio_only/index.m3u8\n",
    );

    fn manifest_url() -> Url {
        Url::parse(MANIFEST_URL).unwrap()
    }

    #[test]
    fn converts_master_playlist() {
        let set = parse_manifest(&manifest_url(), TWITCH_LIKE).unwrap();

        assert_eq!(set.version, Some(3));
        assert_eq!(set.variants.len(), 3);

        let hd = &set.variants[0];
        assert_eq!(hd.uri, "https://cdn.example.com/live/channel/720p/index.m3u8");
        assert_eq!(hd.bandwidth, Some(1_427_999));
        assert_eq!(hd.program_id.as_deref(), Some("1"));
        assert_eq!(hd.codecs, ["avc1.4D401F", "mp4a.40.2"]);
        assert_eq!(
            hd.resolution,
            Some(Resolution {
                width: 1280,
                height: 720
            })
        );
        assert_eq!(hd.kind, VariantKind::Video);

        assert_eq!(set.variants[1].uri, "https://other.example.com/1080p/index.m3u8");
        assert_eq!(set.variants[2].kind, VariantKind::AudioOnly);
    }

    #[test]
    fn keeps_variants_without_bandwidth() {
        let manifest = concat!(
            "#EXTM3U\n",
            "#EXT-X-STREAM-INF:RESOLUTION=1280x720,AVERAGE-BANDWIDTH=2000000\n",
            "720p.m3u8\n",
            "#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360\n",
            "360p.m3u8\n",
            "#EXT-X-STREAM-INF:\n",
            "bare.m3u8\n",
        );

        let set = parse_manifest(&manifest_url(), manifest).unwrap();

        assert_eq!(
            set.variants
                .iter()
                .map(|v| (v.uri.rsplit('/').next().unwrap(), v.bandwidth))
                .collect::<Vec<_>>(),
            [
                ("720p.m3u8", None),
                ("360p.m3u8", Some(800_000)),
                ("bare.m3u8", None)
            ]
        );
        assert_eq!(set.variants[0].height(), 720);

        let pair = synthesize(&set).unwrap();
        assert_eq!(
            pair.best,
            concat!(
                "#EXTM3U\n",
                "#EXT-X-STREAM-INF:RESOLUTION=1280x720\n",
                "https://cdn.example.com/live/channel/720p.m3u8\n",
            )
        );
    }

    #[test]
    fn bandwidth_placeholder_only_where_missing() {
        let filled = fill_missing_bandwidth(concat!(
            "#EXTM3U\n",
            "#EXT-X-STREAM-INF:RESOLUTION=640x360\n",
            "a.m3u8\n",
            "#EXT-X-STREAM-INF:CODECS=\"avc1.4d401f,mp4a.40.2\",BANDWIDTH=500000\n",
            "b.m3u8\n",
        ));

        assert_eq!(
            filled,
            concat!(
                "#EXTM3U\n",
                "#EXT-X-STREAM-INF:BANDWIDTH=0,RESOLUTION=640x360\n",
                "a.m3u8\n",
                "#EXT-X-STREAM-INF:CODECS=\"avc1.4d401f,mp4a.40.2\",BANDWIDTH=500000\n",
                "b.m3u8\n",
            )
        );
    }

    #[test]
    fn media_playlist_has_no_variants() {
        let media = concat!(
            "#EXTM3U\n",
            "#EXT-X-VERSION:3\n",
            "#EXT-X-TARGETDURATION:6\n",
            "#EXT-X-MEDIA-SEQUENCE:100\n",
            "#EXTINF:6.0,\n",
            "segment100.ts\n",
        );

        let set = parse_manifest(&manifest_url(), media).unwrap();
        assert!(set.variants.is_empty());
    }

    #[test]
    fn rejects_html() {
        let err = parse_manifest(&manifest_url(), "<html><body>Offline</body></html>").unwrap_err();
        assert!(matches!(err, ChannelError::Extraction { .. }));
    }

    #[tokio::test]
    async fn unreachable_manifest_is_an_extraction_error() {
        let fetcher = StaticFetcher::default();

        let err = extract_variants(&fetcher, &manifest_url(), &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Extraction { url, .. } if url.as_str() == MANIFEST_URL));
    }

    #[tokio::test]
    async fn fetches_and_parses() {
        let fetcher = StaticFetcher::default().with_page(MANIFEST_URL, TWITCH_LIKE);

        let set = extract_variants(&fetcher, &manifest_url(), &HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(set.variants.len(), 3);
    }
}
