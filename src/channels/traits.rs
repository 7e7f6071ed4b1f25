use crate::store::UserId;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Inbound text message from a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub channel: String,
    pub user_id: UserId,
    pub chat_id: i64,
    pub text: String,
}

/// Markup dialect for message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMarkup {
    /// Telegram's legacy Markdown (`*bold*`, `[text](url)`).
    Markdown,
}

/// A custom reply keyboard: rows of button labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyKeyboard {
    pub rows: Vec<Vec<String>>,
    /// Hide the keyboard after one tap.
    pub one_time: bool,
}

impl ReplyKeyboard {
    /// Every label on the keyboard, row by row.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(String::as_str)
    }
}

/// Outbound message to a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat_id: i64,
    pub text: String,
    pub markup: Option<TextMarkup>,
    pub disable_link_preview: bool,
    pub keyboard: Option<ReplyKeyboard>,
}

impl OutboundMessage {
    /// Plain text with no keyboard.
    #[must_use]
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            markup: None,
            disable_link_preview: false,
            keyboard: None,
        }
    }

    #[must_use]
    pub fn with_keyboard(mut self, keyboard: ReplyKeyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    #[must_use]
    pub fn markdown(mut self) -> Self {
        self.markup = Some(TextMarkup::Markdown);
        self
    }

    #[must_use]
    pub fn without_link_preview(mut self) -> Self {
        self.disable_link_preview = true;
        self
    }
}

/// Channel adapter contract. New transports only need to implement this trait.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Stable channel identifier (e.g. `telegram`).
    fn id(&self) -> &'static str;

    /// Deliver one message.
    async fn send(&self, message: OutboundMessage) -> anyhow::Result<()>;

    /// Start receiving inbound messages and forwarding them to the runtime.
    async fn run(&self, inbound_tx: mpsc::Sender<InboundMessage>) -> anyhow::Result<()>;

    /// Best-effort health probe.
    async fn health_check(&self) -> anyhow::Result<bool>;
}
