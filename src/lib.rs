//! Post plain messages and rich attachments to a Slack incoming webhook.
//!
//! A [Client] is built once from a [ClientConfig] and posts every message to
//! the same webhook URL. Each send is classified into a [Delivery], which is
//! either awaited ([Client::post_message]) or handed to a completion callback
//! ([Client::send_message]).
//!
//! ```no_run
//! use slack_hook::{Attachment, AttachmentField, Client, ClientConfig};
//!
//! # async fn run() -> Result<(), slack_hook::ConfigError> {
//! let config = ClientConfig::parse("https://hooks.slack.com/services/T0/B0/x")?
//!     .with_username("bob")
//!     .with_icon_emoji("thumbsup");
//! let client = Client::from_config(config);
//!
//! let delivery = client.post_message("Hello").await;
//! assert!(delivery.success);
//!
//! let attachment = Attachment::new("Deployed", "Deploy", "api v42 is live")
//!     .with_color((0.2, 0.8, 0.2))
//!     .with_field(AttachmentField::new("Version", "v42"));
//! client.send_attachment(&attachment, None);
//! # Ok(())
//! # }
//! ```

pub mod attachment;
pub mod client;
pub mod config;
pub mod error;
pub mod transport;

pub use attachment::{Attachment, AttachmentField, Color, Rgb};
pub use client::{Client, Completion, Delivery};
pub use config::ClientConfig;
pub use error::{ConfigError, HookError, TransportError};
pub use transport::{HookResponse, ReqwestTransport, Transport};
