use crate::fetcher::Fetcher;
use crate::types::{EnrichConfig, EnrichedContent, FeedItem};
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Main-content regions searched for an embedded video, most specific first.
pub const CONTENT_CONTAINERS: &[&str] = &[
    ".news-body",
    ".entry-content",
    "article",
    "main",
    "#content",
    ".content",
];

const ELLIPSIS: &str = "...";

/// Derives the message, thumbnail and video reference for a feed item.
pub struct Enricher {
    fetcher: Arc<Fetcher>,
    config: EnrichConfig,
}

impl Enricher {
    pub fn new(fetcher: Arc<Fetcher>, config: EnrichConfig) -> Self {
        Self { fetcher, config }
    }

    /// Never fails: every extraction step that finds nothing leaves its field
    /// empty, and the message body is always produced.
    pub async fn enrich(&self, item: &FeedItem) -> EnrichedContent {
        let landing_page = if item.link.is_empty() {
            None
        } else {
            self.fetcher.fetch_page(&item.link).await
        };

        let thumbnail_url = match &item.embedded_thumbnail_url {
            Some(url) => Some(url.clone()),
            None if is_rich_source(&item.link, &self.config.rich_domains) => {
                self.scrape_thumbnail(item, landing_page.as_deref()).await
            }
            None => None,
        };

        let video_source_url = match landing_page {
            Some(html) => self.discover_video(html).await,
            None => None,
        };

        let summary = summarize(&item.summary_html, self.config.summary_limit);
        let message_body = format_message(item.display_title(), &summary, &item.link);

        if thumbnail_url.is_none() {
            debug!("No thumbnail found for {}", item.id);
        }

        EnrichedContent {
            message_body,
            thumbnail_url,
            video_source_url,
        }
    }

    async fn scrape_thumbnail(&self, item: &FeedItem, landing_page: Option<&str>) -> Option<String> {
        let page_url = item.thumbnail_page_url();
        let html = if page_url == item.link {
            landing_page.map(str::to_string)
        } else {
            self.fetcher.fetch_page(page_url).await
        };
        let html = html?;

        let placeholders = self.config.placeholder_markers.clone();
        match tokio::task::spawn_blocking(move || extract_thumbnail(&html, &placeholders)).await {
            Ok(thumbnail) => thumbnail,
            Err(e) => {
                warn!("Thumbnail extraction for {} failed: {}", page_url, e);
                None
            }
        }
    }

    async fn discover_video(&self, html: String) -> Option<String> {
        let hosts = self.config.video_hosts.clone();
        let base = self.config.video_base_url.clone();
        let found = tokio::task::spawn_blocking(move || {
            find_video_iframe(&html, &hosts).map(|src| canonical_watch_url(&normalize_video_url(&src, &base)))
        })
        .await;

        match found {
            Ok(url) => url,
            Err(e) => {
                warn!("Video discovery failed: {}", e);
                None
            }
        }
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// True when the link's host is one of `domains` or a subdomain of one.
pub fn is_rich_source(link: &str, domains: &[String]) -> bool {
    let Ok(url) = Url::parse(link) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    domains
        .iter()
        .any(|domain| host == domain || host.ends_with(&format!(".{domain}")))
}

/// Absolute http(s) address that is not a known placeholder asset.
pub fn is_valid_image(src: &str, placeholders: &[String]) -> bool {
    (src.starts_with("http://") || src.starts_with("https://"))
        && !placeholders.iter().any(|marker| src.contains(marker.as_str()))
}

fn non_empty_attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element.value().attr(name).map(str::trim).filter(|v| !v.is_empty())
}

fn image_source(img: ElementRef<'_>) -> Option<&str> {
    non_empty_attr(img, "data-src").or_else(|| non_empty_attr(img, "src"))
}

/// Picks a representative image from a landing page: the image in the first
/// `<figure>`, then `og:image`, then the first valid `<img>`.
pub fn extract_thumbnail(html: &str, placeholders: &[String]) -> Option<String> {
    let document = Html::parse_document(html);
    let img = selector("img")?;
    let valid = |src: &&str| is_valid_image(src, placeholders);

    let figure = selector("figure").and_then(|figure| document.select(&figure).next());
    if let Some(src) = figure
        .and_then(|figure| figure.select(&img).next())
        .and_then(image_source)
        .filter(valid)
    {
        return Some(src.to_string());
    }

    if let Some(og_image) = selector(r#"meta[property="og:image"]"#) {
        if let Some(content) = document
            .select(&og_image)
            .next()
            .and_then(|meta| meta.value().attr("content"))
            .map(str::trim)
            .filter(valid)
        {
            return Some(content.to_string());
        }
    }

    document
        .select(&img)
        .filter_map(image_source)
        .find(valid)
        .map(str::to_string)
}

fn video_src<'a>(iframe: ElementRef<'a>, hosts: &[String]) -> Option<&'a str> {
    iframe
        .value()
        .attr("src")
        .filter(|src| hosts.iter().any(|host| src.contains(host.as_str())))
}

/// Finds the `src` of an iframe pointing at one of `hosts`, looking inside
/// the main-content containers before falling back to the whole document.
pub fn find_video_iframe(html: &str, hosts: &[String]) -> Option<String> {
    let document = Html::parse_document(html);
    let iframe = selector("iframe[src]")?;

    for css in CONTENT_CONTAINERS {
        let Some(container) = selector(css).and_then(|sel| document.select(&sel).next()) else {
            continue;
        };
        if let Some(src) = container.select(&iframe).find_map(|el| video_src(el, hosts)) {
            return Some(src.to_string());
        }
    }

    document
        .select(&iframe)
        .find_map(|el| video_src(el, hosts))
        .map(str::to_string)
}

/// Makes protocol-relative and root-relative iframe sources absolute.
pub fn normalize_video_url(src: &str, base: &str) -> String {
    let src = src.trim();
    if let Some(rest) = src.strip_prefix("//") {
        format!("https://{rest}")
    } else if src.starts_with('/') {
        format!("{}{}", base.trim_end_matches('/'), src)
    } else {
        src.to_string()
    }
}

fn watch_url(host: &str, id: &str) -> Option<String> {
    Url::parse_with_params(&format!("https://{host}/watch"), &[("v", id)])
        .ok()
        .map(String::from)
}

fn is_youtube_host(host: &str) -> bool {
    ["youtube.com", "youtube-nocookie.com"]
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
}

/// Rewrites an embed URL to its watch-page form.
///
/// `/embed/{id}` becomes `watch?v={id}`, a `watch?v=` URL is rebuilt around
/// its `v` parameter, anything else is returned unchanged.
pub fn canonical_watch_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let Some(host) = parsed.host_str() else {
        return url.to_string();
    };
    let watch_host = if is_youtube_host(host) {
        "www.youtube.com"
    } else {
        host
    };

    let segments: Vec<&str> = parsed.path_segments().map(|s| s.collect()).unwrap_or_default();

    if let Some(pos) = segments.iter().position(|s| *s == "embed") {
        if let Some(id) = segments.get(pos + 1).filter(|id| !id.is_empty()) {
            if let Some(watch) = watch_url(watch_host, id) {
                return watch;
            }
        }
    }

    if segments.last() == Some(&"watch") {
        let video_id = parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())
            .filter(|v| !v.is_empty());
        if let Some(watch) = video_id.and_then(|id| watch_url(watch_host, &id)) {
            return watch;
        }
    }

    url.to_string()
}

/// Strips markup and caps the text at `limit` characters, marking a cut with
/// an ellipsis.
pub fn summarize(summary_html: &str, limit: usize) -> String {
    if summary_html.trim().is_empty() {
        return String::new();
    }

    let fragment = Html::parse_fragment(summary_html);
    let text: String = fragment.root_element().text().collect();
    let text = text.trim();

    if text.chars().count() > limit {
        let mut truncated: String = text.chars().take(limit).collect();
        truncated.push_str(ELLIPSIS);
        truncated
    } else {
        text.to_string()
    }
}

/// Telegram HTML body for a news item.
pub fn format_message(title: &str, summary: &str, link: &str) -> String {
    let mut msg = format!(
        "<b><blockquote>{}</blockquote></b>\n",
        htmlescape::encode_minimal(title)
    );
    if !summary.is_empty() {
        msg.push_str(&format!(
            "<b><blockquote expandable><i>{}</i></blockquote></b>\n",
            htmlescape::encode_minimal(summary)
        ));
    }
    msg.push_str(&format!(
        "<b><blockquote><a href=\"{}\">Read Full News</a></blockquote></b>",
        htmlescape::encode_minimal(link)
    ));
    msg
}

/// Caption for the follow-up video message.
pub fn video_caption(item: &FeedItem) -> String {
    match &item.title {
        Some(title) => format!(
            "<b><blockquote>{}</blockquote></b>",
            htmlescape::encode_minimal(title)
        ),
        None => "Premiered Video".to_string(),
    }
}
