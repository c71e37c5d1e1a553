mod email;
mod napcat;
mod telegram;

pub use email::EmailChannel;
pub use napcat::NapcatChannel;
pub use telegram::{TELEGRAM_MESSAGE_LIMIT, TelegramChannel};

use super::ChannelError;

/// Turn a non-success response into [`ChannelError::Status`].
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ChannelError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ChannelError::Status {
        status: status.as_u16(),
        body,
    })
}

fn endpoint(base: &url::Url, path: &str) -> String {
    format!("{}/{path}", base.as_str().trim_end_matches('/'))
}
