//! Email notification of newly collected articles.
//!
//! Renders the new-article batch as an HTML body with a plain-text
//! alternative and delivers it over SMTP. The pipeline marks the URLs as
//! sent only after delivery succeeds.

use crate::config::EmailConfig;
use crate::types::{Article, Result, TrackerError};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

const ABSTRACT_PREVIEW_CHARS: usize = 400;

pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Send the batch to every configured recipient. An empty batch is a
    /// successful no-op.
    pub async fn send_articles(&self, articles: &[Article]) -> Result<()> {
        if articles.is_empty() {
            info!("no articles to send, skipping email");
            return Ok(());
        }
        if self.config.recipients.is_empty() {
            return Err(TrackerError::Email(
                "no recipients configured".to_string(),
            ));
        }

        let subject = format!("Research article update - {} new articles", articles.len());
        let message = self.build_message(&subject, articles)?;
        let transport = self.build_transport()?;

        transport
            .send(message)
            .await
            .map_err(|e| TrackerError::Email(e.to_string()))?;

        info!(
            count = articles.len(),
            recipients = self.config.recipients.len(),
            "notification email sent"
        );
        Ok(())
    }

    fn build_message(&self, subject: &str, articles: &[Article]) -> Result<Message> {
        let from: Mailbox = self
            .config
            .sender
            .parse()
            .map_err(|e| TrackerError::Email(format!("invalid sender address: {}", e)))?;

        let mut builder = Message::builder().from(from).subject(subject);
        for recipient in &self.config.recipients {
            let to: Mailbox = recipient.parse().map_err(|e| {
                TrackerError::Email(format!("invalid recipient '{}': {}", recipient, e))
            })?;
            builder = builder.to(to);
        }

        builder
            .multipart(MultiPart::alternative_plain_html(
                render_text(articles),
                render_html(articles),
            ))
            .map_err(|e| TrackerError::Email(e.to_string()))
    }

    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let credentials = Credentials::new(
            self.config.sender.clone(),
            self.config.password.clone(),
        );

        let builder = if self.config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_server)
                .map_err(|e| TrackerError::Email(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.smtp_server)
        };

        Ok(builder
            .port(self.config.smtp_port)
            .credentials(credentials)
            .build())
    }
}

fn render_html(articles: &[Article]) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"UTF-8\"></head>\n<body>\n\
         <h1>Latest research articles</h1>\n\
         <p>New articles matching your keywords:</p>\n",
    );

    for article in articles {
        html.push_str("<div style=\"margin-bottom:24px\">\n");
        html.push_str(&format!(
            "  <div><b><a href=\"{}\">{}</a></b></div>\n",
            escape_html(&article.url),
            escape_html(&article.title)
        ));
        if !article.journal.is_empty() {
            html.push_str(&format!("  <div><i>{}</i></div>\n", escape_html(&article.journal)));
        }
        if !article.authors.is_empty() {
            html.push_str(&format!(
                "  <div>{}</div>\n",
                escape_html(&article.authors.join(", "))
            ));
        }
        if !article.abstract_text.is_empty() {
            html.push_str(&format!(
                "  <p>{}</p>\n",
                escape_html(&truncate(&article.abstract_text, ABSTRACT_PREVIEW_CHARS))
            ));
        }
        let mut meta = Vec::new();
        if let Some(date) = &article.published_date {
            meta.push(format!("Published: {}", date));
        }
        if let Some(doi) = &article.doi {
            meta.push(format!("DOI: {}", doi));
        }
        if !meta.is_empty() {
            html.push_str(&format!(
                "  <div style=\"color:#777\">{}</div>\n",
                escape_html(&meta.join(" | "))
            ));
        }
        html.push_str("</div>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_text(articles: &[Article]) -> String {
    let mut text = String::from("Latest research articles\n\n");
    for (index, article) in articles.iter().enumerate() {
        text.push_str(&format!("{}. {}\n", index + 1, article.title));
        if !article.journal.is_empty() {
            text.push_str(&format!("   Journal: {}\n", article.journal));
        }
        if !article.authors.is_empty() {
            text.push_str(&format!("   Authors: {}\n", article.authors.join(", ")));
        }
        if let Some(date) = &article.published_date {
            text.push_str(&format!("   Published: {}\n", date));
        }
        text.push_str(&format!("   {}\n\n", article.url));
    }
    text
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}...", truncated.trim_end())
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article() -> Article {
        Article {
            title: "A <new> Battery design".to_string(),
            url: "https://example.com/articles/1".to_string(),
            abstract_text: "Improved cathode & anode chemistry.".to_string(),
            authors: vec!["J. Doe".to_string(), "R. Roe".to_string()],
            published_date: Some("2024-05-01".to_string()),
            journal: "Advanced Materials".to_string(),
            keywords: vec![],
            doi: Some("10.1000/x".to_string()),
            source_id: "advanced_materials".to_string(),
        }
    }

    #[test]
    fn html_body_escapes_and_lists_fields() {
        let html = render_html(&[article()]);
        assert!(html.contains("A &lt;new&gt; Battery design"));
        assert!(html.contains("https://example.com/articles/1"));
        assert!(html.contains("Advanced Materials"));
        assert!(html.contains("J. Doe, R. Roe"));
        assert!(html.contains("cathode &amp; anode"));
        assert!(html.contains("DOI: 10.1000/x"));
    }

    #[test]
    fn text_body_numbers_articles() {
        let text = render_text(&[article(), article()]);
        assert!(text.contains("1. A <new> Battery design"));
        assert!(text.contains("2. A <new> Battery design"));
        assert!(text.contains("Published: 2024-05-01"));
    }

    #[test]
    fn truncate_preserves_short_text() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("0123456789abc", 10), "0123456789...");
    }
}
