//! Outbound mail seam.

use tracing::info;

/// Delivery channel for verification codes. The server only decides what
/// to send and to whom; transport is deployment-specific.
pub trait Mailer: Send + Sync {
    fn send_verification_code(&self, email: &str, code: &str);
}

/// Writes the code to the log instead of sending mail. In development the
/// log line is the delivery channel.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send_verification_code(&self, email: &str, code: &str) {
        info!(email = %email, code = %code, "Verification code issued");
    }
}
