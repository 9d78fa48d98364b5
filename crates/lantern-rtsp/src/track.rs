//! Track recognition and construction from SDP media descriptions.
//!
//! A DESCRIBE response yields one [`MediaDescription`] per media; this module
//! maps each onto a typed [`Track`] (H.264, AAC, Opus, or generic) and
//! resolves per-track control URLs against the Content-Base URL.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use url::Url;

use crate::error::{Error, Result};
use crate::sdp::{Attribute, MediaDescription};

/// RTP clock rate of every H.264 track.
pub const H264_CLOCK_RATE: u32 = 90_000;

/// A recognised RTSP track.
#[derive(Debug, Clone)]
pub enum Track {
    H264(TrackH264),
    Aac(TrackAac),
    Opus(TrackOpus),
    Generic(TrackGeneric),
}

impl Track {
    /// RTP payload type.
    pub fn payload_type(&self) -> u8 {
        match self {
            Self::H264(t) => t.payload_type,
            Self::Aac(t) => t.payload_type,
            Self::Opus(t) => t.payload_type,
            Self::Generic(t) => t.payload_type,
        }
    }

    /// RTP clock rate in Hz.
    pub fn clock_rate(&self) -> u32 {
        match self {
            Self::H264(_) => H264_CLOCK_RATE,
            Self::Aac(t) => t.clock_rate,
            Self::Opus(t) => t.clock_rate,
            Self::Generic(t) => t.clock_rate,
        }
    }

    /// The `a=control:` attribute value, "" when absent.
    pub fn control(&self) -> &str {
        match self {
            Self::H264(t) => &t.control,
            Self::Aac(t) => &t.control,
            Self::Opus(t) => &t.control,
            Self::Generic(t) => &t.control,
        }
    }

    /// Absolute URL used to SETUP this track.
    pub fn url(&self, content_base: Option<&Url>) -> Result<Url> {
        resolve_track_url(self.control(), content_base)
    }
}

/// An H.264 video track.
#[derive(Debug, Clone)]
pub struct TrackH264 {
    pub payload_type: u8,
    pub sps: Vec<u8>,
    pub pps: Vec<u8>,
    pub control: String,
}

impl TrackH264 {
    /// Build an H.264 track from its parameter sets.
    ///
    /// The SPS must be at least 4 bytes: profile-level-id is the hex of
    /// bytes 1..4.
    pub fn new(payload_type: u8, sps: Vec<u8>, pps: Vec<u8>) -> Result<Self> {
        if sps.len() < 4 {
            return Err(Error::SpsInvalid);
        }
        Ok(Self {
            payload_type,
            sps,
            pps,
            control: String::new(),
        })
    }

    /// The `a=rtpmap` value for this track.
    pub fn rtpmap(&self) -> String {
        format!("{} H264/90000", self.payload_type)
    }

    /// The `a=fmtp` value for this track.
    pub fn fmtp(&self) -> String {
        let sprop = format!("{},{}", STANDARD.encode(&self.sps), STANDARD.encode(&self.pps));
        let profile_level_id = hex::encode_upper(&self.sps[1..4]);
        format!(
            "{} packetization-mode=1; sprop-parameter-sets={sprop}; profile-level-id={profile_level_id}",
            self.payload_type
        )
    }

    /// The SDP media description advertising this track.
    pub fn media_description(&self) -> MediaDescription {
        MediaDescription {
            media: "video".into(),
            formats: vec![self.payload_type.to_string()],
            attributes: vec![
                Attribute::new("rtpmap", self.rtpmap()),
                Attribute::new("fmtp", self.fmtp()),
            ],
        }
    }
}

/// An AAC (mpeg4-generic) audio track. Codec configuration parsing lives
/// with the RTP depacketizer; only the addressing fields are kept here.
#[derive(Debug, Clone)]
pub struct TrackAac {
    pub payload_type: u8,
    pub clock_rate: u32,
    pub control: String,
}

/// An Opus audio track.
#[derive(Debug, Clone)]
pub struct TrackOpus {
    pub payload_type: u8,
    pub clock_rate: u32,
    pub control: String,
}

/// Any other media, kept for SETUP/PLAY bookkeeping.
#[derive(Debug, Clone)]
pub struct TrackGeneric {
    pub payload_type: u8,
    pub clock_rate: u32,
    pub control: String,
}

fn parse_payload_type(s: &str) -> Result<u8> {
    s.parse::<u8>()
        .map_err(|_| Error::PayloadTypeInvalid(s.to_string()))
}

/// Clock rate from the `<codec>/<clock>[/<extra>]` half of an rtpmap value.
fn parse_clock_rate(rtpmap: &str, codec_and_clock: &str) -> Result<u32> {
    codec_and_clock
        .split('/')
        .nth(1)
        .and_then(|c| c.parse::<u32>().ok())
        .ok_or_else(|| Error::RtpMapInvalid(rtpmap.to_string()))
}

/// Recognise a track from an SDP media description.
///
/// Video media with an `rtpmap` of `<pt> H264/90000` become [`Track::H264`];
/// audio media whose codec begins `mpeg4-generic/` (case-insensitive) become
/// [`Track::Aac`] and `opus/` become [`Track::Opus`]. Everything else falls
/// back to [`Track::Generic`], which still requires a parseable rtpmap.
pub fn track_from_media_description(md: &MediaDescription) -> Result<Track> {
    let control = md.control().to_string();

    if md.media == "video" {
        if let Some(rtpmap) = md.attribute("rtpmap") {
            let rtpmap = rtpmap.trim();
            let vals: Vec<&str> = rtpmap.split(' ').collect();
            if vals.len() == 2 && vals[1] == "H264/90000" {
                let payload_type = parse_payload_type(vals[0])?;
                let (sps, pps) = match h264_config_from_media_description(md) {
                    Ok(conf) => conf,
                    // Parameter sets may arrive in-band instead of the SDP.
                    Err(_) => (Vec::new(), Vec::new()),
                };
                return Ok(Track::H264(TrackH264 {
                    payload_type,
                    sps,
                    pps,
                    control,
                }));
            }
        }
    }

    if md.media == "audio" {
        if let Some(rtpmap) = md.attribute("rtpmap") {
            let vals: Vec<&str> = rtpmap.split(' ').collect();
            if vals.len() == 2 {
                let payload_type = parse_payload_type(vals[0])?;

                if vals[1].to_lowercase().starts_with("mpeg4-generic/") {
                    return Ok(Track::Aac(TrackAac {
                        payload_type,
                        clock_rate: parse_clock_rate(rtpmap, vals[1])?,
                        control,
                    }));
                }

                if vals[1].starts_with("opus/") {
                    return Ok(Track::Opus(TrackOpus {
                        payload_type,
                        clock_rate: parse_clock_rate(rtpmap, vals[1])?,
                        control,
                    }));
                }
            }
        }
    }

    tracing::debug!(media = %md.media, "unrecognized codec, treating track as generic");

    let format = md.formats.first().ok_or(Error::NoFormats)?;
    let payload_type = parse_payload_type(format)?;
    let rtpmap = md.attribute("rtpmap").ok_or(Error::RtpMapMissing)?;
    let vals: Vec<&str> = rtpmap.trim().split(' ').collect();
    if vals.len() != 2 {
        return Err(Error::RtpMapInvalid(rtpmap.to_string()));
    }
    let clock_rate = parse_clock_rate(rtpmap, vals[1])?;

    Ok(Track::Generic(TrackGeneric {
        payload_type,
        clock_rate,
        control,
    }))
}

/// Extract SPS and PPS from an H.264 media's `a=fmtp` attribute.
pub fn h264_config_from_media_description(md: &MediaDescription) -> Result<(Vec<u8>, Vec<u8>)> {
    let fmtp = md.attribute("fmtp").ok_or(Error::FmtpMissing)?;

    let (_, params) = fmtp
        .split_once(' ')
        .ok_or_else(|| Error::FmtpInvalid(fmtp.to_string()))?;

    for kv in params.split(';') {
        let kv = kv.trim();
        if kv.is_empty() {
            continue;
        }

        let (key, value) = kv
            .split_once('=')
            .ok_or_else(|| Error::FmtpInvalid(fmtp.to_string()))?;

        if key == "sprop-parameter-sets" {
            let (sps_b64, pps_b64) = value
                .split_once(',')
                .ok_or_else(|| Error::SpropInvalid(fmtp.to_string()))?;

            let sps = STANDARD
                .decode(sps_b64)
                .map_err(|_| Error::SpropInvalid(fmtp.to_string()))?;
            let pps = STANDARD
                .decode(pps_b64)
                .map_err(|_| Error::SpropInvalid(fmtp.to_string()))?;

            return Ok((sps, pps));
        }
    }

    Err(Error::SpropMissing(fmtp.to_string()))
}

/// Resolve a track's control attribute against the Content-Base URL.
///
/// Absent control resolves to the Content-Base itself. An absolute
/// `rtsp://` control keeps its path but takes host and credentials from the
/// Content-Base. Anything else is appended to the Content-Base, with a `/`
/// inserted unless the base already ends in one or the control is a bare
/// query string.
pub fn resolve_track_url(control: &str, content_base: Option<&Url>) -> Result<Url> {
    let content_base = content_base.ok_or(Error::ContentBaseMissing)?;

    if control.is_empty() {
        return Ok(content_base.clone());
    }

    if control.starts_with("rtsp://") {
        let mut resolved = Url::parse(control)?;
        resolved.set_host(content_base.host_str())?;
        // Infallible for hierarchical rtsp URLs.
        let _ = resolved.set_port(content_base.port());
        let _ = resolved.set_username(content_base.username());
        let _ = resolved.set_password(content_base.password());
        return Ok(resolved);
    }

    let mut base = content_base.to_string();
    if !control.starts_with('?') && !base.ends_with('/') {
        base.push('/');
    }
    Ok(Url::parse(&format!("{base}{control}"))?)
}
