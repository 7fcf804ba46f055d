//! Rich message attachments: a title, body text, color, author metadata, and
//! a table of fields.
//!
//! <https://api.slack.com/reference/messaging/attachments>

mod color;
mod field;

pub use color::{hex_rgb, Color, Rgb};
pub use field::AttachmentField;

use field::FieldRequest;
use serde::Serialize;
use serde_with::skip_serializing_none;
use url::Url;

/// One attachment, built per send and not retained by the client.
#[derive(Clone, Debug, PartialEq)]
pub struct Attachment {
    /// Plaintext summary for clients that can't render attachments.
    pub fallback: String,
    pub title: String,
    pub text: String,
    pub title_link: Option<Url>,
    pub color: Option<Rgb>,
    pub pretext: Option<String>,
    pub author_name: Option<String>,
    pub author_link: Option<Url>,
    pub author_icon: Option<Url>,
    pub image_url: Option<Url>,
    /// Rendered in order.
    pub fields: Option<Vec<AttachmentField>>,
}

#[skip_serializing_none]
#[derive(Serialize)]
struct AttachmentRequest<'a> {
    fallback: &'a str,
    title: &'a str,
    text: &'a str,
    pretext: Option<&'a str>,
    author_name: Option<&'a str>,
    author_link: Option<&'a Url>,
    author_icon: Option<&'a Url>,
    title_link: Option<&'a Url>,
    image_url: Option<&'a Url>,
    color: Option<String>,
    fields: Option<Vec<FieldRequest<'a>>>,
}

impl Attachment {
    pub fn new<F, T, X>(fallback: F, title: T, text: X) -> Self
    where
        F: Into<String>,
        T: Into<String>,
        X: Into<String>,
    {
        Attachment {
            fallback: fallback.into(),
            title: title.into(),
            text: text.into(),
            title_link: None,
            color: None,
            pretext: None,
            author_name: None,
            author_link: None,
            author_icon: None,
            image_url: None,
            fields: None,
        }
    }

    pub fn with_title_link(mut self, url: Url) -> Self {
        self.title_link = Some(url);
        self
    }

    /// Accepts an [Rgb], a `(red, green, blue)` tuple, or a reference to any
    /// [Color].
    pub fn with_color<C: Into<Rgb>>(mut self, color: C) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_pretext<T: Into<String>>(mut self, pretext: T) -> Self {
        self.pretext = Some(pretext.into());
        self
    }

    pub fn with_author_name<T: Into<String>>(mut self, name: T) -> Self {
        self.author_name = Some(name.into());
        self
    }

    pub fn with_author_link(mut self, url: Url) -> Self {
        self.author_link = Some(url);
        self
    }

    pub fn with_author_icon(mut self, url: Url) -> Self {
        self.author_icon = Some(url);
        self
    }

    pub fn with_image_url(mut self, url: Url) -> Self {
        self.image_url = Some(url);
        self
    }

    /// Append a field, keeping any already present.
    pub fn with_field(mut self, field: AttachmentField) -> Self {
        self.fields.get_or_insert_with(Vec::new).push(field);
        self
    }

    /// The JSON object Slack expects for this attachment, classifying fields
    /// as short against `max_length_for_short_field`.
    pub fn to_json(
        &self,
        max_length_for_short_field: usize,
    ) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self.to_request(max_length_for_short_field))
    }

    fn to_request(&self, max_len: usize) -> AttachmentRequest<'_> {
        AttachmentRequest {
            fallback: &self.fallback,
            title: &self.title,
            text: &self.text,
            pretext: self.pretext.as_deref(),
            author_name: self.author_name.as_deref(),
            author_link: self.author_link.as_ref(),
            author_icon: self.author_icon.as_ref(),
            title_link: self.title_link.as_ref(),
            image_url: self.image_url.as_ref(),
            color: self.color.as_ref().map(hex_rgb),
            fields: self
                .fields
                .as_ref()
                .filter(|xs| !xs.is_empty())
                .map(|xs| xs.iter().map(|x| x.to_request(max_len)).collect()),
        }
    }
}

/// The serialized form of an attachment at a fixed short field threshold.
pub(crate) struct AttachmentWithThreshold<'a> {
    pub attachment: &'a Attachment,
    pub max_length_for_short_field: usize,
}

impl Serialize for AttachmentWithThreshold<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.attachment
            .to_request(self.max_length_for_short_field)
            .serialize(serializer)
    }
}
