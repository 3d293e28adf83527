use std::collections::HashSet;
use std::process::Command;

/// One encoder/container pairing the recorder can target.
///
/// `video_encoder`/`audio_encoder` of `None` hand codec selection to ffmpeg's
/// container defaults, which is what the last-resort profile does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodingProfile {
    pub name: &'static str,
    pub mime: &'static str,
    pub extension: &'static str,
    pub video_encoder: Option<&'static str>,
    pub audio_encoder: Option<&'static str>,
    /// Muxer passed to `-f`, required because the recording goes to a pipe.
    pub muxer: &'static str,
    /// Extra output arguments the container needs.
    pub mux_args: &'static [&'static str],
}

impl EncodingProfile {
    /// Encoders this profile cannot work without.
    pub fn required_encoders(&self) -> impl Iterator<Item = &'static str> {
        self.video_encoder.into_iter().chain(self.audio_encoder)
    }
}

/// The always-acceptable fallback: Matroska with ffmpeg's default codecs.
pub const GENERIC_PROFILE: EncodingProfile = EncodingProfile {
    name: "matroska-default",
    mime: "video/x-matroska",
    extension: "mkv",
    video_encoder: None,
    audio_encoder: None,
    muxer: "matroska",
    mux_args: &[],
};

/// Profiles in preference order. The fragmented-MP4 flags let the mp4 muxer
/// write to a non-seekable pipe.
pub const CANDIDATE_PROFILES: [EncodingProfile; 4] = [
    EncodingProfile {
        name: "mp4-h264-aac",
        mime: "video/mp4",
        extension: "mp4",
        video_encoder: Some("libx264"),
        audio_encoder: Some("aac"),
        muxer: "mp4",
        mux_args: &[
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "frag_keyframe+empty_moov+default_base_moof",
        ],
    },
    EncodingProfile {
        name: "webm-vp9-opus",
        mime: "video/webm",
        extension: "webm",
        video_encoder: Some("libvpx-vp9"),
        audio_encoder: Some("libopus"),
        muxer: "webm",
        mux_args: &["-pix_fmt", "yuv420p"],
    },
    EncodingProfile {
        name: "webm-vp8-vorbis",
        mime: "video/webm",
        extension: "webm",
        video_encoder: Some("libvpx"),
        audio_encoder: Some("libvorbis"),
        muxer: "webm",
        mux_args: &["-pix_fmt", "yuv420p"],
    },
    GENERIC_PROFILE,
];

/// Which encoders the local ffmpeg build ships.
///
/// `Unknown` (listing failed) supports nothing, which routes negotiation to
/// [`GENERIC_PROFILE`]; any deeper problem then surfaces when the recorder
/// actually spawns ffmpeg, with a real error message.
#[derive(Clone, Debug)]
pub struct EncoderInventory {
    names: Option<HashSet<String>>,
}

impl EncoderInventory {
    /// Ask `ffmpeg -encoders` what is available.
    pub fn detect() -> Self {
        let out = Command::new("ffmpeg")
            .args(["-hide_banner", "-encoders"])
            .output();
        match out {
            Ok(out) if out.status.success() => Self {
                names: Some(parse_encoder_list(&String::from_utf8_lossy(&out.stdout))),
            },
            _ => {
                tracing::warn!("could not list ffmpeg encoders, using container defaults");
                Self::unknown()
            }
        }
    }

    pub fn unknown() -> Self {
        Self { names: None }
    }

    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: Some(names.into_iter().map(Into::into).collect()),
        }
    }

    pub fn supports(&self, encoder: &str) -> bool {
        match &self.names {
            Some(names) => names.contains(encoder),
            None => false,
        }
    }
}

/// Pick the first candidate whose encoders are all present.
///
/// Always succeeds: the final candidate requires nothing, so an empty or
/// unknown inventory still yields a usable profile.
pub fn negotiate(inventory: &EncoderInventory) -> EncodingProfile {
    let chosen = CANDIDATE_PROFILES
        .iter()
        .find(|p| p.required_encoders().all(|enc| inventory.supports(enc)))
        .copied()
        .unwrap_or(GENERIC_PROFILE);
    tracing::debug!(profile = chosen.name, "negotiated recording profile");
    chosen
}

/// Extract encoder names from `ffmpeg -encoders` output. Names are the second
/// column of the rows below the `------` separator.
fn parse_encoder_list(listing: &str) -> HashSet<String> {
    let mut names = HashSet::new();
    let mut in_table = false;
    for line in listing.lines() {
        if !in_table {
            in_table = line.trim_start().starts_with("------");
            continue;
        }
        if let Some(name) = line.split_whitespace().nth(1) {
            names.insert(name.to_string());
        }
    }
    names
}
