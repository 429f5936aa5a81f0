//! RSS feed generation.
//!
//! Builds the site-wide feed and the per-tag feeds from published entries.

use chrono::{NaiveDate, NaiveTime};
use rss::{CategoryBuilder, ChannelBuilder, GuidBuilder, ItemBuilder, validation::Validate};

use super::document::Entry;
use super::tags::TagCount;
use crate::config::SiteConfig;

#[derive(thiserror::Error, Debug)]
pub enum FeedError {
    #[error("rss validation failed: {0}")]
    Validation(String),
}

/// RSS feed builder bound to one site.
pub struct FeedBuilder<'a> {
    site: &'a SiteConfig,
}

impl<'a> FeedBuilder<'a> {
    pub fn new(site: &'a SiteConfig) -> Self {
        Self { site }
    }

    fn base_url(&self) -> &str {
        self.site.url.trim_end_matches('/')
    }

    /// The site-wide feed.
    pub fn render<'e, T: Entry + 'e>(
        &self,
        entries: impl IntoIterator<Item = &'e T>,
    ) -> Result<String, FeedError> {
        let link = format!("{}{}", self.base_url(), T::COLLECTION.url_prefix());
        self.render_channel(&self.site.title, &link, entries)
    }

    /// The feed of a single tag.
    pub fn render_tag<'e, T: Entry + 'e>(
        &self,
        tag: &TagCount,
        entries: impl IntoIterator<Item = &'e T>,
    ) -> Result<String, FeedError> {
        let title = format!("{} - {}", self.site.title, tag.display);
        let link = format!("{}{}", self.base_url(), tag.url);
        self.render_channel(&title, &link, entries)
    }

    fn render_channel<'e, T: Entry + 'e>(
        &self,
        title: &str,
        link: &str,
        entries: impl IntoIterator<Item = &'e T>,
    ) -> Result<String, FeedError> {
        let published: Vec<&T> = entries.into_iter().filter(|e| !e.is_draft()).collect();

        let last_build_date = published
            .iter()
            .filter_map(|e| e.lastmod())
            .max()
            .map(rfc2822);

        let items: Vec<rss::Item> = published
            .iter()
            .filter_map(|entry| self.entry_to_item(*entry))
            .collect();

        let channel = ChannelBuilder::default()
            .title(title)
            .link(link)
            .description(&self.site.description)
            .language(Some(self.site.language.clone()))
            .managing_editor(self.author())
            .webmaster(self.author())
            .last_build_date(last_build_date)
            .generator(Some("folio".to_string()))
            .items(items)
            .build();

        channel
            .validate()
            .map_err(|e| FeedError::Validation(e.to_string()))?;
        Ok(channel.to_string())
    }

    /// Convert an entry to an rss item. Entries without a date are skipped.
    fn entry_to_item<T: Entry>(&self, entry: &T) -> Option<rss::Item> {
        let date = entry.date()?;
        let link = format!("{}{}", self.base_url(), entry.url());

        let categories: Vec<rss::Category> = entry
            .tags()
            .iter()
            .map(|tag| CategoryBuilder::default().name(tag.clone()).build())
            .collect();

        Some(
            ItemBuilder::default()
                .title(Some(entry.title().to_string()))
                .link(Some(link.clone()))
                .guid(Some(GuidBuilder::default().permalink(true).value(link).build()))
                .description(entry.summary().map(str::to_string))
                .pub_date(Some(rfc2822(date)))
                .author(self.author())
                .categories(categories)
                .build(),
        )
    }

    /// RSS author format: "email (Name)".
    fn author(&self) -> Option<String> {
        self.site
            .email
            .as_ref()
            .map(|email| format!("{email} ({})", self.site.author))
    }
}

fn rfc2822(date: NaiveDate) -> String {
    date.and_time(NaiveTime::MIN).and_utc().to_rfc2822()
}
