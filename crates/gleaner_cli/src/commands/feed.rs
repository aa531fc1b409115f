use clap::ValueEnum;
use console::style;
use gleaner::feed::{FeedItem, get_feed_info, get_feed_items};

use crate::commands::shared::{CliResult, build_transport};
use crate::config::Config;

/// Output format for feed previews.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

/// One feed item for display.
#[derive(Debug, Clone, serde::Serialize, tabled::Tabled)]
pub(crate) struct FeedItemDisplay {
    #[tabled(rename = "Published")]
    pub published: String,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Link")]
    pub link: String,
}

impl From<&FeedItem> for FeedItemDisplay {
    fn from(item: &FeedItem) -> Self {
        Self {
            published: item.published.format("%Y-%m-%d %H:%M UTC").to_string(),
            title: truncate(&item.title, 60),
            link: item.link.clone(),
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Fetch a feed and print its normalized items.
pub(crate) async fn handle_feed(
    url: &str,
    limit: usize,
    output: OutputFormat,
    config: &Config,
) -> CliResult<()> {
    let transport = build_transport(config)?;
    let info = get_feed_info(transport.as_ref(), url).await?;
    let mut items = get_feed_items(transport.as_ref(), url).await?;
    items.sort_by(|a, b| b.published.cmp(&a.published));
    items.truncate(limit);

    match output {
        OutputFormat::Table => {
            println!(
                "{} ({:?}) {}",
                style(&info.title).bold(),
                info.dialect,
                style(&info.link).dim()
            );
            let rows: Vec<FeedItemDisplay> = items.iter().map(FeedItemDisplay::from).collect();
            let mut table = tabled::Table::new(rows);
            table.with(tabled::settings::Style::rounded());
            println!("{table}");
        }
        OutputFormat::Json => {
            let doc = serde_json::json!({ "info": info, "items": items });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_truncate_keeps_short_titles() {
        assert_eq!(truncate("Episode 1", 60), "Episode 1");
    }

    #[test]
    fn test_truncate_long_titles_by_chars() {
        let title = "é".repeat(70);
        let out = truncate(&title, 10);
        assert_eq!(out.chars().count(), 10);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn test_display_row_from_item() {
        let item = FeedItem {
            title: "Hello".to_string(),
            link: "https://example.com/1".to_string(),
            description: String::new(),
            published: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
            thumbnail: String::new(),
            raw_data: String::new(),
        };
        let row = FeedItemDisplay::from(&item);
        assert_eq!(row.published, "2024-05-01 12:30 UTC");
        assert_eq!(row.link, "https://example.com/1");
    }
}
