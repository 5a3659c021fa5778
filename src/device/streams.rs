use serde::{Deserialize, Serialize};

use crate::device::settings::ResolvedAddress;

/// RTMP preview suffixes, in preference order.
const RTMP_PREVIEWS: [&str; 3] = ["main", "ext", "sub"];

/// RTSP previews as (codec, quality), in preference order.
const RTSP_PREVIEWS: [(&str, &str); 3] = [("h264", "main"), ("h264", "sub"), ("h265", "main")];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportContainer {
    #[serde(rename = "rtmp-query")]
    RtmpQuery,
    #[serde(rename = "rtsp")]
    Rtsp,
}

/// A constructed, unverified stream URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamCandidate {
    pub name: String,
    pub id: String,
    pub url: String,
    pub container: TransportContainer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec_hint: Option<String>,
}

/// Builds the six stream candidates for a camera: the RTMP previews first,
/// then the RTSP previews.
pub fn derive_stream_candidates(address: &ResolvedAddress) -> Vec<StreamCandidate> {
    let mut candidates = Vec::with_capacity(RTMP_PREVIEWS.len() + RTSP_PREVIEWS.len());

    let channel = address.channel;
    for preview in RTMP_PREVIEWS {
        let id = format!("{}.bcs", preview);
        let url = format!(
            "rtmp://{}/bcs/channel{}_{}?channel={}&stream=0&user={}&password={}",
            address.rtmp_address(),
            channel,
            id,
            channel,
            address.username,
            address.password
        );

        candidates.push(StreamCandidate {
            name: format!("RTMP {}", preview),
            id,
            url,
            container: TransportContainer::RtmpQuery,
            codec_hint: None,
        });
    }

    // RTSP paths count channels from 1; widened so u32::MAX still gets a successor.
    let padded = format!("{:02}", u64::from(channel) + 1);
    for (codec, quality) in RTSP_PREVIEWS {
        let segment = format!("{}Preview_{}_{}", codec, padded, quality);
        let codec_hint = segment.chars().take(4).collect::<String>();

        candidates.push(StreamCandidate {
            name: format!("RTSP {} {}", codec.to_uppercase(), quality),
            url: format!("rtsp://{}/{}", address.rtsp_address(), segment),
            id: segment,
            container: TransportContainer::Rtsp,
            codec_hint: Some(codec_hint),
        });
    }

    candidates
}
