use serde::Serialize;

/// A key/value pair shown in a table at the bottom of an attachment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentField {
    pub title: String,
    pub value: String,
}

/// <https://api.slack.com/reference/messaging/attachments#field_objects>
#[derive(Serialize)]
pub(super) struct FieldRequest<'a> {
    title: &'a str,
    value: &'a str,
    short: bool,
}

impl AttachmentField {
    pub fn new<T: Into<String>, V: Into<String>>(title: T, value: V) -> Self {
        AttachmentField {
            title: title.into(),
            value: value.into(),
        }
    }

    /// Whether both the title and value are no longer than `max_len` bytes,
    /// hinting that Slack can lay this field out side by side with others.
    pub fn is_short(&self, max_len: usize) -> bool {
        self.title.len() <= max_len && self.value.len() <= max_len
    }

    pub(super) fn to_request(&self, max_len: usize) -> FieldRequest<'_> {
        FieldRequest {
            title: &self.title,
            value: &self.value,
            short: self.is_short(max_len),
        }
    }
}
