use std::fmt;

const AUDIO_CODECS: &[&str] = &["mp4a", "ac-3", "ec-3", "opus", "flac", "mp3"];
const VIDEO_CODECS: &[&str] = &["avc1", "avc3", "hvc1", "hev1", "av01", "vp09"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u64,
    pub height: u64,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantKind {
    Video,
    AudioOnly,
    Unknown,
}

impl VariantKind {
    /// Guesses what a variant carries from its `VIDEO` group, resolution and codecs
    #[must_use]
    pub fn classify(
        video_group: Option<&str>,
        resolution: Option<Resolution>,
        codecs: &[String],
    ) -> Self {
        if video_group.is_some_and(|g| g.eq_ignore_ascii_case("audio_only")) {
            return Self::AudioOnly;
        }

        if resolution.is_some() || codecs.iter().any(|c| codec_in(c, VIDEO_CODECS)) {
            return Self::Video;
        }

        if !codecs.is_empty() && codecs.iter().all(|c| codec_in(c, AUDIO_CODECS)) {
            return Self::AudioOnly;
        }

        Self::Unknown
    }
}

/// `avc1.4d401f` belongs to `avc1`
fn codec_in(codec: &str, family: &[&str]) -> bool {
    let name = codec.split('.').next().unwrap_or_default();
    family.iter().any(|f| name.eq_ignore_ascii_case(f))
}

/// One selectable quality of a multivariant playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub uri: String,
    pub bandwidth: Option<u64>,
    pub program_id: Option<String>,
    pub codecs: Vec<String>,
    pub resolution: Option<Resolution>,
    pub kind: VariantKind,
}

impl Variant {
    /// Ordering height, a variant without resolution sorts as 0
    #[must_use]
    pub fn height(&self) -> u64 {
        self.resolution.map_or(0, |r| r.height)
    }
}

/// Variants of a located manifest together with its advertised protocol version
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestVariantSet {
    pub version: Option<usize>,
    pub variants: Vec<Variant>,
}
