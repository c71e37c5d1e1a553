//! Articles pushed to the relay by an external feed watcher.

use super::registry::{ExtractInput, Extracted};
use crate::ingest::ParseError;
use crate::utils::json::{first_str, int_at, parse_timestamp, str_at};
use crate::utils::text::excerpt;
use hookrelay_sdk::objects::Fields;
use serde_json::Value;
use time::OffsetDateTime;

pub const ARTICLE_KIND: &str = "article";
pub const BATCH_KIND: &str = "article_batch";

fn article_fields(payload: &Value, article: &Value) -> (Fields, Option<OffsetDateTime>) {
    let mut fields = Fields::new();
    fields.insert_opt(
        "feed_name",
        first_str(article, &[&["feed_title"], &["feed_name"]])
            .or_else(|| first_str(payload, &[&["feed_title"], &["feed_name"]])),
    );
    fields.insert_opt("title", str_at(article, &["title"]));
    fields.insert_opt("url", first_str(article, &[&["link"], &["url"]]));
    fields.insert_opt("author", str_at(article, &["author"]));
    let published = first_str(article, &[&["published"], &["updated"]]);
    fields.insert_opt("published", published);
    fields.insert_opt(
        "description",
        first_str(article, &[&["description"], &["summary"]]).map(excerpt),
    );
    (fields, published.and_then(parse_timestamp))
}

pub fn article(input: &ExtractInput<'_>) -> Result<Extracted, ParseError> {
    let article = input
        .payload
        .get("article")
        .filter(|a| a.is_object())
        .ok_or(ParseError::MissingField("article"))?;
    let (fields, occurred_at) = article_fields(input.payload, article);
    Ok(Extracted::event_at(fields, occurred_at))
}

/// A batch is announced through its first article plus the total count.
pub fn article_batch(input: &ExtractInput<'_>) -> Result<Extracted, ParseError> {
    let articles = input
        .payload
        .get("articles")
        .and_then(Value::as_array)
        .ok_or(ParseError::MissingField("articles"))?;
    let Some(first) = articles.first() else {
        return Ok(Extracted::no_event("empty article batch"));
    };

    let (mut fields, occurred_at) = article_fields(input.payload, first);
    let total = int_at(input.payload, &["total_articles"])
        .unwrap_or_else(|| i64::try_from(articles.len()).unwrap_or(i64::MAX));
    fields.insert("total_articles", total);
    Ok(Extracted::event_at(fields, occurred_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookrelay_sdk::objects::{FieldValue, SourcePlatform};
    use serde_json::json;

    fn input<'a>(kind: &'a str, payload: &'a Value) -> ExtractInput<'a> {
        ExtractInput {
            platform: &SourcePlatform::Rss,
            kind,
            payload,
        }
    }

    #[test]
    fn test_single_article() {
        let payload = json!({"article": {
            "feed_title": "Rust Blog",
            "title": "Announcing 2.0",
            "link": "https://blog.example/2-0",
            "author": "Team",
            "published": "Wed, 01 May 2024 10:30:00 +0000",
            "description": "Short"
        }});
        let Extracted::Event { fields, occurred_at } =
            article(&input(ARTICLE_KIND, &payload)).unwrap()
        else {
            panic!("expected event");
        };
        assert_eq!(fields.text("feed_name"), Some("Rust Blog"));
        assert_eq!(fields.text("url"), Some("https://blog.example/2-0"));
        assert_eq!(fields.text("description"), Some("Short"));
        assert!(occurred_at.is_some());
    }

    #[test]
    fn test_batch_uses_first_article() {
        let payload = json!({
            "feed_title": "News",
            "articles": [{"title": "One"}, {"title": "Two"}, {"title": "Three"}]
        });
        let Extracted::Event { fields, .. } = article_batch(&input(BATCH_KIND, &payload)).unwrap()
        else {
            panic!("expected event");
        };
        assert_eq!(fields.text("title"), Some("One"));
        assert_eq!(fields.text("feed_name"), Some("News"));
        assert_eq!(fields.get("total_articles"), Some(&FieldValue::Integer(3)));
    }

    #[test]
    fn test_empty_batch_is_no_event() {
        let payload = json!({"articles": []});
        assert!(matches!(
            article_batch(&input(BATCH_KIND, &payload)).unwrap(),
            Extracted::NoEvent(_)
        ));
    }
}
