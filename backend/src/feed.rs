//! RSS 2.0 feed generation from the article list.

use billet_shared::{Article, SiteConfig};
use rss::{Channel, ChannelBuilder, EnclosureBuilder, GuidBuilder, Item, ItemBuilder};

/// Articles included in the feed.
pub const FEED_ARTICLE_LIMIT: usize = 20;

/// RSS `<author>` wants a mailbox; article authors only carry a name.
const FEED_AUTHOR_MAILBOX: &str = "noreply@example.com";

/// Build the feed channel: metadata from the site configuration, one item
/// per article linking to `{site_url}/blog/{slug}`.
pub fn build_channel(site: &SiteConfig, articles: &[Article], site_url: &str) -> Channel {
    let site_url = site_url.trim_end_matches('/');
    let items: Vec<Item> = articles
        .iter()
        .map(|article| article_to_item(article, site_url))
        .collect();

    ChannelBuilder::default()
        .title(site.site_name.clone())
        .link(site_url.to_string())
        .description(site.site_description.clone())
        .language(Some("fr".to_string()))
        .items(items)
        .build()
}

fn article_to_item(article: &Article, site_url: &str) -> Item {
    let link = format!("{site_url}/blog/{}", article.slug);
    let categories: Vec<rss::Category> = article
        .categories
        .iter()
        .map(|category| {
            rss::CategoryBuilder::default()
                .name(category.name.clone())
                .build()
        })
        .collect();

    let mut item = ItemBuilder::default();
    item.title(article.title.clone())
        .link(Some(link.clone()))
        .guid(GuidBuilder::default().permalink(true).value(link).build())
        .description(article.description.clone())
        .pub_date(article.published_at.to_rfc2822())
        .categories(categories);

    if let Some(author) = &article.author {
        item.author(format!("{FEED_AUTHOR_MAILBOX} ({})", author.name));
    }
    if let Some(cover) = &article.cover {
        item.enclosure(
            EnclosureBuilder::default()
                .url(cover.url.clone())
                .length("0".to_string())
                .mime_type("image/jpeg".to_string())
                .build(),
        );
    }

    item.build()
}
