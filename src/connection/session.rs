use crate::amf::{Amf0Value, ObjectEncoding};
use crate::connection::{ConnectionState, StreamIds};
use crate::server::Role;
use crate::{Error, Result};
use log::warn;
use std::collections::HashMap;
use url::Url;

/// Fields captured from the `connect` command object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectInfo {
    pub app: Option<String>,
    pub flash_ver: Option<String>,
    pub swf_url: Option<String>,
    pub tc_url: Option<String>,
    /// `tcUrl` when it parses as a URL
    pub tc_url_parsed: Option<Url>,
    pub fpad: Option<bool>,
    pub audio_codecs: Option<f64>,
    pub video_codecs: Option<f64>,
    pub video_function: Option<f64>,
    pub page_url: Option<String>,
    pub object_encoding: ObjectEncoding,
}

fn string_field(object: &HashMap<String, Amf0Value>, key: &str) -> Result<Option<String>> {
    match object.get(key) {
        None | Some(Amf0Value::Null) | Some(Amf0Value::Undefined) => Ok(None),
        Some(value) => value
            .as_string()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| Error::amf_decode(format!("connect: {} must be a string, got {}", key, value.kind()))),
    }
}

fn number_field(object: &HashMap<String, Amf0Value>, key: &str) -> Result<Option<f64>> {
    match object.get(key) {
        None | Some(Amf0Value::Null) | Some(Amf0Value::Undefined) => Ok(None),
        Some(value) => value
            .as_number()
            .map(Some)
            .ok_or_else(|| Error::amf_decode(format!("connect: {} must be a number, got {}", key, value.kind()))),
    }
}

fn boolean_field(object: &HashMap<String, Amf0Value>, key: &str) -> Result<Option<bool>> {
    match object.get(key) {
        None | Some(Amf0Value::Null) | Some(Amf0Value::Undefined) => Ok(None),
        Some(value) => value
            .as_boolean()
            .map(Some)
            .ok_or_else(|| Error::amf_decode(format!("connect: {} must be a boolean, got {}", key, value.kind()))),
    }
}

impl ConnectInfo {
    pub fn from_command_object(command_object: &Amf0Value) -> Result<Self> {
        let object = command_object.as_object().ok_or_else(|| {
            Error::amf_decode(format!(
                "connect: command object must be an object, got {}",
                command_object.kind()
            ))
        })?;

        let tc_url = string_field(object, "tcUrl")?;
        let tc_url_parsed = match tc_url.as_deref().map(Url::parse) {
            Some(Ok(url)) => Some(url),
            Some(Err(e)) => {
                warn!("connect: unparsable tcUrl {:?}: {}", tc_url, e);
                None
            }
            None => None,
        };

        Ok(ConnectInfo {
            app: string_field(object, "app")?,
            flash_ver: string_field(object, "flashVer")?,
            swf_url: string_field(object, "swfUrl")?,
            tc_url,
            tc_url_parsed,
            fpad: boolean_field(object, "fpad")?,
            audio_codecs: number_field(object, "audioCodecs")?,
            video_codecs: number_field(object, "videoCodecs")?,
            video_function: number_field(object, "videoFunction")?,
            page_url: string_field(object, "pageUrl")?,
            object_encoding: number_field(object, "objectEncoding")?
                .map(ObjectEncoding::from_number)
                .unwrap_or_default(),
        })
    }
}

/// The stream a connection is bound to after `publish` or `play`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamBinding {
    pub name: String,
    pub role: Role,
    /// "live", "record" or "append"; publishers only
    pub publish_type: Option<String>,
    /// Message stream the command arrived on
    pub stream_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerBandwidth {
    pub size: u32,
    pub limit_type: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLength {
    pub stream_id: u32,
    pub buffer_ms: u32,
}

/// Per-connection session fields, owned by the read loop.
#[derive(Debug, Default)]
pub struct Session {
    pub state: ConnectionState,
    pub connect: Option<ConnectInfo>,

    /// Encoding used for replies; always AMF0
    pub object_encoding: ObjectEncoding,

    pub stream_ids: StreamIds,
    pub binding: Option<StreamBinding>,

    /// Window acknowledgement size announced by the peer
    pub peer_window_ack_size: Option<u32>,
    pub peer_bandwidth: Option<PeerBandwidth>,
    pub buffer_length: Option<BufferLength>,
    pub last_ping_response: Option<u32>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to `next`, rejecting transitions the state machine does not allow
    pub fn transition(&mut self, next: ConnectionState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::invalid_state(format!(
                "Cannot move from {:?} to {:?}",
                self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }

    pub fn is_publisher(&self) -> bool {
        self.binding.as_ref().is_some_and(|b| b.role == Role::Publisher)
    }

    pub fn app(&self) -> Option<&str> {
        self.connect.as_ref().and_then(|c| c.app.as_deref())
    }
}
