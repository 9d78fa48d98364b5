//! Minimal SDP media-description model (RFC 8866 subset).
//!
//! Only the fields track recognition needs: the media name from the `m=`
//! line, the payload formats, and the `a=` attribute list. Session-level
//! parsing and generation live with the RTSP session, not here.

/// One `a=` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One media description (`m=` line plus its attributes).
#[derive(Debug, Clone, Default)]
pub struct MediaDescription {
    /// Media type from the `m=` line: "video", "audio", "application", ...
    pub media: String,
    /// Payload formats from the `m=` line, in declaration order.
    pub formats: Vec<String>,
    /// `a=` attributes, in declaration order.
    pub attributes: Vec<Attribute>,
}

impl MediaDescription {
    /// Value of the first attribute with the given key, if any.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }

    /// The `a=control:` value, or "" when absent.
    pub fn control(&self) -> &str {
        self.attribute("control").unwrap_or("")
    }
}
