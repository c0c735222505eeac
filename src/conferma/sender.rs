//! Out-of-band delivery of confirmation messages.

use anyhow::Result;
use tracing::info;

/// Delivery abstraction (email, IM, anything that reaches the address).
///
/// Implementations may block; the provider calls them from a blocking thread.
///
/// `address` is the sanitized value, and sanitizing escapes `:` as `&#58;`.
/// Channels whose addresses carry a colon (`tel:` URIs, Matrix IDs such as
/// `@u:server`) must decode it before delivery.
pub trait Sender: Send + Sync {
    /// Deliver `text` to `address` or return an error.
    fn send(&self, address: &str, text: &str) -> Result<()>;
}

/// Plain functions and closures are senders.
impl<F> Sender for F
where
    F: Fn(&str, &str) -> Result<()> + Send + Sync,
{
    fn send(&self, address: &str, text: &str) -> Result<()> {
        self(address, text)
    }
}

/// Local dev sender that logs the message instead of delivering it.
#[derive(Clone, Debug)]
pub struct LogSender;

impl Sender for LogSender {
    fn send(&self, address: &str, text: &str) -> Result<()> {
        info!(address = %address, message = %text, "confirmation send stub");
        Ok(())
    }
}
