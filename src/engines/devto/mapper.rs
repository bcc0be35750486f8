use super::client::DevToArticle;
use crate::constants::DEVTO_ENGINE;
use crate::types::NormalizedPost;
use chrono::{DateTime, FixedOffset, SecondsFormat};

fn rfc3339(ts: Option<DateTime<FixedOffset>>) -> Option<String> {
    ts.map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

pub fn map_post(article: &DevToArticle) -> NormalizedPost {
    NormalizedPost {
        id: article.id.to_string(),
        title: article.title.clone(),
        content: article.body_markdown.clone(),
        slug: article.slug.clone(),
        url: article.url.clone(),
        source_id: format!("{}-{}", DEVTO_ENGINE, article.id),
        published_at: rfc3339(article.published_at),
        updated_at: rfc3339(article.edited_at),
        tags: article.tag_list.clone(),
    }
}

pub fn map_posts(articles: &[DevToArticle]) -> Vec<NormalizedPost> {
    articles.iter().map(map_post).collect()
}
