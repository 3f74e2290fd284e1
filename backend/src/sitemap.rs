//! Sitemap generation: static pages plus one entry per published article.

use billet_shared::Article;
use chrono::{DateTime, Utc};

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl ChangeFrequency {
    fn as_str(self) -> &'static str {
        match self {
            ChangeFrequency::Daily => "daily",
            ChangeFrequency::Weekly => "weekly",
            ChangeFrequency::Monthly => "monthly",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub url: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub change_frequency: ChangeFrequency,
    pub priority: f32,
}

/// Static pages first, then one entry per article under
/// `{site_url}/blog/{slug}` with its publication date as lastmod.
pub fn build_entries(site_url: &str, articles: &[Article]) -> Vec<SitemapEntry> {
    let site_url = site_url.trim_end_matches('/');

    let mut entries = vec![
        page_entry(site_url.to_string(), ChangeFrequency::Weekly, 1.0),
        page_entry(format!("{site_url}/blog"), ChangeFrequency::Daily, 0.9),
        page_entry(format!("{site_url}/about"), ChangeFrequency::Monthly, 0.7),
        page_entry(format!("{site_url}/contact"), ChangeFrequency::Monthly, 0.7),
    ];

    entries.extend(articles.iter().map(|article| SitemapEntry {
        url: format!("{site_url}/blog/{}", article.slug),
        last_modified: Some(article.published_at),
        change_frequency: ChangeFrequency::Monthly,
        priority: 0.8,
    }));

    entries
}

fn page_entry(url: String, change_frequency: ChangeFrequency, priority: f32) -> SitemapEntry {
    SitemapEntry {
        url,
        last_modified: None,
        change_frequency,
        priority,
    }
}

/// Render the entries as a sitemap XML document.
pub fn to_xml(entries: &[SitemapEntry]) -> String {
    let mut xml = String::with_capacity(4096);

    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(&format!(r#"<urlset xmlns="{SITEMAP_NS}">"#));
    xml.push('\n');

    for entry in entries {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&entry.url)));
        if let Some(last_modified) = entry.last_modified {
            xml.push_str(&format!(
                "    <lastmod>{}</lastmod>\n",
                last_modified.format("%Y-%m-%d")
            ));
        }
        xml.push_str(&format!(
            "    <changefreq>{}</changefreq>\n",
            entry.change_frequency.as_str()
        ));
        xml.push_str(&format!("    <priority>{:.1}</priority>\n", entry.priority));
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use billet_shared::ArticleContent;
    use chrono::TimeZone;

    use super::*;

    fn article(slug: &str, year: i32) -> Article {
        Article {
            id: format!("doc-{slug}"),
            slug: slug.to_string(),
            title: slug.to_string(),
            description: String::new(),
            content: ArticleContent::Markdown(String::new()),
            cover: None,
            author: None,
            categories: vec![],
            published_at: Utc.with_ymd_and_hms(year, 5, 1, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn entry_count_is_static_pages_plus_articles() {
        let articles = vec![article("premier", 2024), article("second", 2023)];
        let entries = build_entries("https://blog.example.com", &articles);
        assert_eq!(entries.len(), 4 + articles.len());
    }

    #[test]
    fn article_entries_point_at_blog_slug_urls() {
        let entries = build_entries("https://blog.example.com/", &[article("premier", 2024)]);
        let article_entry = entries.last().expect("article entry");
        assert_eq!(article_entry.url, "https://blog.example.com/blog/premier");
        assert_eq!(article_entry.change_frequency, ChangeFrequency::Monthly);
        assert_eq!(article_entry.priority, 0.8);
        assert!(article_entry.last_modified.is_some());
    }

    #[test]
    fn static_pages_keep_their_documented_priorities() {
        let entries = build_entries("https://blog.example.com", &[]);
        assert_eq!(entries[0].url, "https://blog.example.com");
        assert_eq!(entries[0].priority, 1.0);
        assert_eq!(entries[1].url, "https://blog.example.com/blog");
        assert_eq!(entries[1].change_frequency, ChangeFrequency::Daily);
        assert_eq!(entries[2].url, "https://blog.example.com/about");
        assert_eq!(entries[3].url, "https://blog.example.com/contact");
    }

    #[test]
    fn xml_lists_every_entry_with_escaping() {
        let entries = build_entries("https://blog.example.com", &[article("a-b", 2024)]);
        let xml = to_xml(&entries);

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(&format!(r#"<urlset xmlns="{SITEMAP_NS}">"#)));
        assert_eq!(xml.matches("<url>").count(), entries.len());
        assert!(xml.contains("<loc>https://blog.example.com/blog/a-b</loc>"));
        assert!(xml.contains("<lastmod>2024-05-01</lastmod>"));
        assert!(xml.contains("<changefreq>monthly</changefreq>"));
        assert!(xml.contains("<priority>0.8</priority>"));

        let escaped = to_xml(&[SitemapEntry {
            url: "https://blog.example.com/?a=1&b=2".to_string(),
            last_modified: None,
            change_frequency: ChangeFrequency::Weekly,
            priority: 0.5,
        }]);
        assert!(escaped.contains("<loc>https://blog.example.com/?a=1&amp;b=2</loc>"));
    }
}
