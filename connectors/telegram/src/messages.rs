//! Publishing notifications rendered as Telegram HTML.

use chrono::{DateTime, Local, TimeZone};
use wpp_core::{BotStatus, Notifier};

/// A notification about publishing progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    PublishSucceeded { title: String, site_url: String },
    PublishFailed { title: String, error: String },
    BatchStarted { count: u32 },
    BatchCompleted { succeeded: u32, failed: u32 },
    Paused,
    Resumed,
    Status(BotStatus),
}

impl Notification {
    /// Render with the current local time.
    #[must_use]
    pub fn render_now(&self) -> String {
        self.render(&Local::now())
    }

    /// Render as HTML, stamped with `at`.
    #[must_use]
    pub fn render<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        let stamp = at.format("%Y-%m-%d %H:%M:%S");
        match self {
            Self::PublishSucceeded { title, site_url } => format!(
                "✅ <b>Published</b>\n\n📝 {}\n🌐 {}\n⏰ {stamp}",
                escape_html(title),
                escape_html(site_url)
            ),
            Self::PublishFailed { title, error } => format!(
                "❌ <b>Publish failed</b>\n\n📝 {}\n⚠️ {}\n⏰ {stamp}",
                escape_html(title),
                escape_html(error)
            ),
            Self::BatchStarted { count } => format!(
                "🚀 <b>Batch started</b>\n\n📊 {count} posts queued\n⏰ {stamp}"
            ),
            Self::BatchCompleted { succeeded, failed } => format!(
                "🎉 <b>Batch complete</b>\n\n✅ Succeeded: {succeeded}\n❌ Failed: {failed}\n⏰ {stamp}"
            ),
            Self::Paused => "⏸️ <b>Paused</b>\n\nSend /resume to continue.".to_string(),
            Self::Resumed => "▶️ <b>Resumed</b>\n\nPublishing continues.".to_string(),
            Self::Status(status) => {
                let state = if status.is_paused {
                    "⏸️ Paused"
                } else {
                    "▶️ Running"
                };
                let current = status
                    .current_item
                    .as_deref()
                    .map(|item| format!("🔄 Working on: {}\n", escape_html(item)))
                    .unwrap_or_default();
                format!(
                    "📊 <b>Status</b>\n\n{state}\n📝 Queued: {}\n✅ Done: {}\n❌ Failed: {}\n{current}⏰ {stamp}",
                    status.queue_length, status.completed_count, status.failed_count
                )
            }
        }
    }
}

/// Render `notification` now and hand it to `notifier`.
pub async fn notify<N: Notifier + ?Sized>(notifier: &N, notification: &Notification) -> bool {
    notifier.send(&notification.render_now()).await
}

/// Escape text for Telegram's HTML parse mode.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_publish_succeeded_escapes_title() {
        let text = Notification::PublishSucceeded {
            title: "Tips & <Tricks>".into(),
            site_url: "https://blog.example".into(),
        }
        .render(&at());

        assert!(text.starts_with("✅ <b>Published</b>"));
        assert!(text.contains("Tips &amp; &lt;Tricks&gt;"));
        assert!(text.contains("https://blog.example"));
        assert!(text.ends_with("2026-03-01 09:30:00"));
    }

    #[test]
    fn test_batch_completed_counts() {
        let text = Notification::BatchCompleted {
            succeeded: 8,
            failed: 2,
        }
        .render(&at());
        assert!(text.contains("Succeeded: 8"));
        assert!(text.contains("Failed: 2"));
    }

    #[test]
    fn test_status_with_and_without_item() {
        let mut status = BotStatus {
            is_paused: true,
            queue_length: 4,
            completed_count: 10,
            failed_count: 1,
            current_item: None,
        };

        let text = Notification::Status(status.clone()).render(&at());
        assert!(text.contains("⏸️ Paused"));
        assert!(text.contains("Queued: 4"));
        assert!(!text.contains("Working on"));

        status.is_paused = false;
        status.current_item = Some("Spring recipes".into());
        let text = Notification::Status(status).render(&at());
        assert!(text.contains("▶️ Running"));
        assert!(text.contains("🔄 Working on: Spring recipes\n"));
    }

    #[test]
    fn test_pause_and_resume_are_fixed() {
        assert!(Notification::Paused.render(&at()).contains("/resume"));
        assert!(Notification::Resumed.render(&at()).starts_with("▶️"));
    }
}
