//! Post plain messages and attachments to a single incoming webhook.

use crate::{
    attachment::{Attachment, AttachmentWithThreshold},
    config::ClientConfig,
    error::{ConfigError, HookError, TransportError},
    transport::{HookResponse, ReqwestTransport, Transport},
};
use reqwest::StatusCode;
use serde::Serialize;
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, info, warn};

/// Called once with the outcome of a send.
pub type Completion = Box<dyn FnOnce(Delivery) + Send + 'static>;

/// The outcome of a single send.
///
/// | `success` | `response` | `error` | meaning                         |
/// |-----------|------------|---------|---------------------------------|
/// | `true`    | `Some`     | `None`  | status 200                      |
/// | `false`   | `Some`     | `None`  | any other status, including 2xx |
/// | `false`   | `None`     | `Some`  | encoding or transport failure   |
#[derive(Debug)]
pub struct Delivery {
    pub success: bool,
    pub response: Option<HookResponse>,
    pub error: Option<HookError>,
}

impl Delivery {
    fn failed(e: HookError) -> Self {
        Delivery {
            success: false,
            response: None,
            error: Some(e),
        }
    }
}

/// A webhook client. Cloning is cheap and clones share configuration, the
/// short field threshold, and the transport.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    // Read, never written, during a send.
    max_length_for_short_field: AtomicUsize,
    transport: Box<dyn Transport>,
}

/// <https://api.slack.com/messaging/webhooks>
#[derive(Serialize)]
struct MessageRequest<'a> {
    #[serde(flatten)]
    params: BTreeMap<String, String>,
    text: &'a str,
}

// Carries no channel, username, or icon overrides.
#[derive(Serialize)]
struct AttachmentsRequest<'a> {
    attachments: [AttachmentWithThreshold<'a>; 1],
}

impl Client {
    pub fn new<T: Transport + 'static>(config: ClientConfig, transport: T) -> Self {
        let max_len = config.initial_max_length_for_short_field();

        Client {
            inner: Arc::new(Inner {
                config,
                max_length_for_short_field: AtomicUsize::new(max_len),
                transport: Box::new(transport),
            }),
        }
    }

    /// A client posting via the shared [ReqwestTransport].
    pub fn from_config(config: ClientConfig) -> Self {
        Client::new(config, ReqwestTransport::default())
    }

    /// A client with no channel, username, or icon overrides.
    pub fn with_webhook_url(webhook_url: &str) -> Result<Self, ConfigError> {
        ClientConfig::parse(webhook_url).map(Client::from_config)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn max_length_for_short_field(&self) -> usize {
        self.inner.max_length_for_short_field.load(Ordering::Relaxed)
    }

    /// Affects attachments serialized from now on, across all clones.
    pub fn set_max_length_for_short_field(&self, n: usize) {
        self.inner
            .max_length_for_short_field
            .store(n, Ordering::Relaxed);
    }

    /// The overrides sent alongside plain messages, keyed as the webhook
    /// expects. Unset values are omitted.
    pub fn message_parameters(&self) -> BTreeMap<String, String> {
        let config = &self.inner.config;
        let mut params = BTreeMap::new();

        if let Some(x) = config.channel() {
            params.insert("channel".to_owned(), x.to_owned());
        }
        if let Some(x) = config.username() {
            params.insert("username".to_owned(), x.to_owned());
        }
        if let Some(x) = config.icon_emoji() {
            params.insert("iconEmoji".to_owned(), x.to_owned());
        }
        if let Some(x) = config.icon_url() {
            params.insert("iconURL".to_owned(), x.to_string());
        }

        params
    }

    /// The JSON body [Client::send_message] would post.
    pub fn message_body(&self, text: &str) -> Result<Vec<u8>, HookError> {
        let req = MessageRequest {
            params: self.message_parameters(),
            text,
        };

        Ok(serde_json::to_vec(&req)?)
    }

    /// The JSON body [Client::send_attachment] would post, using the current
    /// short field threshold.
    pub fn attachment_body(&self, attachment: &Attachment) -> Result<Vec<u8>, HookError> {
        let req = AttachmentsRequest {
            attachments: [AttachmentWithThreshold {
                attachment,
                max_length_for_short_field: self.max_length_for_short_field(),
            }],
        };

        Ok(serde_json::to_vec(&req)?)
    }

    /// Post a plain text message, waiting for the outcome.
    pub async fn post_message(&self, text: &str) -> Delivery {
        match self.message_body(text) {
            Ok(body) => self.dispatch(body).await,
            Err(e) => not_sent(e),
        }
    }

    /// Post a single attachment, waiting for the outcome.
    pub async fn post_attachment(&self, attachment: &Attachment) -> Delivery {
        match self.attachment_body(attachment) {
            Ok(body) => self.dispatch(body).await,
            Err(e) => not_sent(e),
        }
    }

    /// Post a plain text message in the background, calling `on_complete`
    /// exactly once with the outcome.
    ///
    /// The send runs on the current Tokio runtime. Outside one, nothing is
    /// sent, `None` is returned, and `on_complete` is called straight away
    /// with a [HookError::Runtime] failure. Completions of concurrent sends
    /// may arrive in any order.
    pub fn send_message(
        &self,
        text: &str,
        on_complete: Option<Completion>,
    ) -> Option<JoinHandle<()>> {
        self.spawn(self.message_body(text), on_complete)
    }

    /// Post a single attachment in the background, calling `on_complete`
    /// exactly once with the outcome. Behaves as [Client::send_message]
    /// outside a Tokio runtime.
    ///
    /// The attachment is serialized before returning, so it needn't outlive
    /// this call.
    pub fn send_attachment(
        &self,
        attachment: &Attachment,
        on_complete: Option<Completion>,
    ) -> Option<JoinHandle<()>> {
        self.spawn(self.attachment_body(attachment), on_complete)
    }

    fn spawn(
        &self,
        body: Result<Vec<u8>, HookError>,
        on_complete: Option<Completion>,
    ) -> Option<JoinHandle<()>> {
        let handle = match Handle::try_current() {
            Ok(x) => x,
            Err(e) => {
                let delivery = not_sent(HookError::Runtime(e));
                if let Some(f) = on_complete {
                    f(delivery);
                }
                return None;
            }
        };

        let client = self.clone();

        Some(handle.spawn(async move {
            let delivery = match body {
                Ok(body) => client.dispatch(body).await,
                Err(e) => not_sent(e),
            };

            if let Some(f) = on_complete {
                f(delivery);
            }
        }))
    }

    async fn dispatch(&self, body: Vec<u8>) -> Delivery {
        let url = self.inner.config.webhook_url();
        // The URL itself is the credential, so only the host is logged.
        let host = url.host_str().unwrap_or_default();

        debug!("Posting {} bytes to webhook at {}", body.len(), host);
        let delivery = classify(self.inner.transport.post(url, body).await);

        match (&delivery.response, &delivery.error) {
            (_, Some(e)) => warn!("Webhook request to {} failed: {}", host, e),
            (Some(res), None) if !delivery.success => {
                warn!("Webhook at {} responded with {}", host, res.status)
            }
            _ => info!("Posted to webhook at {}", host),
        }

        delivery
    }
}

fn not_sent(e: HookError) -> Delivery {
    warn!("Not posting to webhook: {}", e);
    Delivery::failed(e)
}

/// Only a 200 counts as success. Other 2xx statuses do not.
fn classify(res: Result<HookResponse, TransportError>) -> Delivery {
    match res {
        Ok(res) => Delivery {
            success: res.status == StatusCode::OK,
            response: Some(res),
            error: None,
        },
        Err(e) => Delivery::failed(HookError::Transport(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::AttachmentField;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use tokio::sync::oneshot;
    use url::Url;

    /// Records bodies and answers every request the same way.
    struct StubTransport {
        bodies: Arc<Mutex<Vec<Value>>>,
        answer: fn() -> Result<HookResponse, TransportError>,
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn post(&self, _url: &Url, body: Vec<u8>) -> Result<HookResponse, TransportError> {
            let json = serde_json::from_slice(&body).unwrap();
            self.bodies.lock().unwrap().push(json);
            (self.answer)()
        }
    }

    fn stub(
        config: ClientConfig,
        answer: fn() -> Result<HookResponse, TransportError>,
    ) -> (Client, Arc<Mutex<Vec<Value>>>) {
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let transport = StubTransport {
            bodies: bodies.clone(),
            answer,
        };

        (Client::new(config, transport), bodies)
    }

    fn ok() -> Result<HookResponse, TransportError> {
        Ok(HookResponse::new(StatusCode::OK))
    }

    fn bare() -> ClientConfig {
        ClientConfig::parse("http://example.com").unwrap()
    }

    fn full() -> ClientConfig {
        bare()
            .with_channel("#puppies")
            .with_username("bob")
            .with_icon_emoji(":thumbsup:")
            .with_icon_url(Url::parse("http://example.com/example.png").unwrap())
    }

    fn body_json(x: Result<Vec<u8>, HookError>) -> Value {
        serde_json::from_slice(&x.unwrap()).unwrap()
    }

    #[test]
    fn test_construction() {
        assert!(Client::with_webhook_url("http://example.com").is_ok());
        assert_eq!(
            Client::with_webhook_url("").err(),
            Some(ConfigError::MissingWebhookUrl)
        );
    }

    #[test]
    fn test_empty_message_parameters() {
        let client = Client::from_config(bare());

        assert!(client.message_parameters().is_empty());
    }

    #[test]
    fn test_message_parameters() {
        let client = Client::from_config(full());

        let expected: BTreeMap<String, String> = [
            ("channel", "#puppies"),
            ("username", "bob"),
            ("iconEmoji", ":thumbsup:"),
            ("iconURL", "http://example.com/example.png"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();

        assert_eq!(client.message_parameters(), expected);
    }

    #[test]
    fn test_message_body() {
        let client = Client::from_config(full());

        assert_eq!(
            body_json(client.message_body("Hello")),
            json!({
                "channel": "#puppies",
                "username": "bob",
                "iconEmoji": ":thumbsup:",
                "iconURL": "http://example.com/example.png",
                "text": "Hello",
            })
        );

        let bare = Client::from_config(bare());
        assert_eq!(body_json(bare.message_body("Hi")), json!({ "text": "Hi" }));
    }

    #[test]
    fn test_attachment_body_omits_message_parameters() {
        let client = Client::from_config(full());
        let attachment = Attachment::new("fb", "t", "x");

        assert_eq!(
            body_json(client.attachment_body(&attachment)),
            json!({ "attachments": [{ "fallback": "fb", "title": "t", "text": "x" }] })
        );
    }

    #[test]
    fn test_threshold_read_at_serialization() {
        let client = Client::from_config(bare().with_max_length_for_short_field(50));
        let attachment = Attachment::new("fb", "t", "x")
            .with_field(AttachmentField::new("Headline", "Description"));

        assert_eq!(client.max_length_for_short_field(), 50);
        let short = body_json(client.attachment_body(&attachment));
        assert_eq!(short["attachments"][0]["fields"][0]["short"], json!(true));

        client.clone().set_max_length_for_short_field(5);
        assert_eq!(client.max_length_for_short_field(), 5);
        let long = body_json(client.attachment_body(&attachment));
        assert_eq!(long["attachments"][0]["fields"][0]["short"], json!(false));
    }

    #[test]
    fn test_classify() {
        let x = classify(Ok(HookResponse::new(StatusCode::OK)));
        assert!(x.success && x.response.is_some() && x.error.is_none());

        let x = classify(Ok(HookResponse::new(StatusCode::CREATED)));
        assert!(!x.success && x.response.is_some() && x.error.is_none());

        let x = classify(Ok(HookResponse::new(StatusCode::NO_CONTENT)));
        assert!(!x.success);

        let x = classify(Err(TransportError::other("d", 1, "m")));
        assert!(!x.success && x.response.is_none() && x.error.is_some());
    }

    #[tokio::test]
    async fn test_post_message_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::Json(json!({ "text": "Hello" })))
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let client = Client::with_webhook_url(&format!("{}/hook", server.url())).unwrap();
        let res = client.post_message("Hello").await;

        mock.assert_async().await;
        assert!(res.success);
        assert!(res.error.is_none());
        assert_eq!(res.response.unwrap().status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_post_message_not_found() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .with_status(404)
            .with_body("no_service")
            .create_async()
            .await;

        let client = Client::with_webhook_url(&format!("{}/hook", server.url())).unwrap();
        let res = client.post_message("Hello").await;

        mock.assert_async().await;
        assert!(!res.success);
        assert!(res.error.is_none());
        assert_eq!(res.response.unwrap().status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_post_attachment_transport_error() {
        let (client, bodies) = stub(full(), || {
            Err(TransportError::other("com.test.domain", -123, "unreachable"))
        });

        let res = client.post_attachment(&Attachment::new("fb", "t", "x")).await;

        assert!(!res.success);
        assert!(res.response.is_none());
        match res.error {
            Some(HookError::Transport(e)) => {
                assert_eq!(e.code(), Some(-123));
                assert_eq!(e.domain(), Some("com.test.domain"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let bodies = bodies.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        for key in ["channel", "username", "iconEmoji", "iconURL"] {
            assert!(bodies[0].get(key).is_none(), "unexpected key: {}", key);
        }
    }

    #[tokio::test]
    async fn test_send_message_completes_once() {
        let (client, bodies) = stub(full(), ok);
        let (tx, rx) = oneshot::channel();

        client
            .send_message(
                "Hello",
                Some(Box::new(move |d: Delivery| tx.send(d).unwrap())),
            )
            .unwrap()
            .await
            .unwrap();

        let delivery = rx.await.unwrap();
        assert!(delivery.success);
        assert!(delivery.error.is_none());
        assert_eq!(bodies.lock().unwrap()[0]["text"], json!("Hello"));
    }

    #[tokio::test]
    async fn test_send_attachment_completes_once() {
        let (client, bodies) = stub(bare(), || Ok(HookResponse::new(StatusCode::NOT_FOUND)));
        let (tx, rx) = oneshot::channel();

        let attachment = Attachment::new("fb", "t", "x").with_color((1.0, 0.0, 0.0));
        client
            .send_attachment(
                &attachment,
                Some(Box::new(move |d: Delivery| tx.send(d).unwrap())),
            )
            .unwrap()
            .await
            .unwrap();

        let delivery = rx.await.unwrap();
        assert!(!delivery.success);
        assert!(delivery.error.is_none());
        assert_eq!(delivery.response.unwrap().status, StatusCode::NOT_FOUND);
        assert_eq!(
            bodies.lock().unwrap()[0]["attachments"][0]["color"],
            json!("#ff0000")
        );
    }

    #[tokio::test]
    async fn test_send_without_completion() {
        let (client, bodies) = stub(bare(), ok);

        client.send_message("Hello", None).unwrap().await.unwrap();

        assert_eq!(bodies.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_sends() {
        let (client, bodies) = stub(bare(), ok);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let tx = tx.clone();
                client.send_message(
                    &format!("message {}", i),
                    Some(Box::new(move |d: Delivery| tx.send(d.success).unwrap())),
                )
            })
            .collect();
        drop(tx);

        for h in handles {
            h.unwrap().await.unwrap();
        }

        let mut n = 0;
        while let Some(success) = rx.recv().await {
            assert!(success);
            n += 1;
        }
        assert_eq!(n, 8);
        assert_eq!(bodies.lock().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_post_message_transport_error() {
        let (client, bodies) = stub(full(), || {
            Err(TransportError::other("com.test.domain", -123, "unreachable"))
        });

        let res = client.post_message("Hello").await;

        assert!(!res.success);
        assert!(res.response.is_none());
        match res.error {
            Some(HookError::Transport(e)) => {
                assert_eq!(e.code(), Some(-123));
                assert_eq!(e.domain(), Some("com.test.domain"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(bodies.lock().unwrap()[0]["channel"], json!("#puppies"));
    }

    #[tokio::test]
    async fn test_send_message_transport_error() {
        let (client, _) = stub(bare(), || {
            Err(TransportError::other("com.test.domain", -123, "unreachable"))
        });
        let (tx, rx) = oneshot::channel();

        client
            .send_message(
                "Hello",
                Some(Box::new(move |d: Delivery| tx.send(d).unwrap())),
            )
            .unwrap()
            .await
            .unwrap();

        let delivery = rx.await.unwrap();
        assert!(!delivery.success);
        assert!(delivery.response.is_none());
        assert!(matches!(
            delivery.error,
            Some(HookError::Transport(TransportError::Other { code: -123, .. }))
        ));
    }

    #[tokio::test]
    async fn test_encoding_failure_sends_nothing() {
        let (client, bodies) = stub(bare(), ok);
        let (tx, rx) = oneshot::channel();

        let e = serde_json::from_str::<Value>("{").unwrap_err();
        client
            .spawn(
                Err(HookError::Serialization(e)),
                Some(Box::new(move |d: Delivery| tx.send(d).unwrap())),
            )
            .unwrap()
            .await
            .unwrap();

        let delivery = rx.await.unwrap();
        assert!(!delivery.success);
        assert!(delivery.response.is_none());
        assert!(matches!(delivery.error, Some(HookError::Serialization(_))));
        assert!(bodies.lock().unwrap().is_empty());
    }

    #[test]
    fn test_send_outside_runtime() {
        let (client, bodies) = stub(bare(), ok);
        let calls = Arc::new(Mutex::new(Vec::new()));

        let c = calls.clone();
        let handle = client.send_message(
            "Hello",
            Some(Box::new(move |d: Delivery| c.lock().unwrap().push(d))),
        );
        assert!(handle.is_none());

        let handle = client.send_attachment(&Attachment::new("fb", "t", "x"), None);
        assert!(handle.is_none());

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].success);
        assert!(matches!(calls[0].error, Some(HookError::Runtime(_))));
        assert!(bodies.lock().unwrap().is_empty());
    }

    #[test]
    fn test_threshold_owned_by_client() {
        let client = Client::from_config(bare().with_max_length_for_short_field(12));
        let clone = client.clone();
        let attachment = Attachment::new("fb", "t", "x")
            .with_field(AttachmentField::new("Headline", "Description"));

        assert_eq!(client.max_length_for_short_field(), 12);

        clone.set_max_length_for_short_field(5);
        assert_eq!(client.max_length_for_short_field(), 5);
        assert_eq!(clone.max_length_for_short_field(), 5);

        let body = body_json(client.attachment_body(&attachment));
        assert_eq!(body["attachments"][0]["fields"][0]["short"], json!(false));
    }
}
