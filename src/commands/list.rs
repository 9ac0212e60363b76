//! List posts from the content repository

use anyhow::Result;
use std::io::Write;

use crate::content::PostSummary;
use crate::listing::{ListingController, LoadMore};
use crate::Site;

/// Print posts page by page, loading more until the repository runs out
/// or `max_pages` pages have been loaded
pub async fn run(site: &Site, max_pages: Option<u32>) -> Result<()> {
    let listing = collect(site, max_pages).await?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let cursor = listing.cursor();
    writeln!(
        out,
        "Posts ({}, page {} of {}):",
        listing.len(),
        cursor.page,
        cursor.total_pages
    )?;
    for post in listing.posts() {
        writeln!(out, "  {}", format_line(&post))?;
    }
    if listing.has_more() {
        writeln!(out, "  ... more posts available")?;
    }

    Ok(())
}

/// Load up to `max_pages` pages through the listing controller
pub async fn collect(site: &Site, max_pages: Option<u32>) -> Result<ListingController> {
    let page_size = site.config.page_size;
    let listing = ListingController::load(site.posts.clone(), page_size).await?;

    let mut loaded = 1;
    while max_pages.map_or(true, |max| loaded < max) {
        match listing.load_more().await? {
            LoadMore::Loaded { added } => {
                tracing::debug!("Loaded {} more posts", added);
                loaded += 1;
            }
            LoadMore::Exhausted | LoadMore::InFlight => break,
        }
    }

    Ok(listing)
}

fn format_line(post: &PostSummary) -> String {
    format!(
        "{} - {} by {} [{}]",
        post.first_publication_date.as_deref().unwrap_or("-"),
        post.data.title,
        post.data.author,
        post.uid.as_deref().unwrap_or("")
    )
}
