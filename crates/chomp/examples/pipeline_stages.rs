//! Example: Watch a page shrink through the cleaning stages
//!
//! Run with: cargo run -p chomp --example pipeline_stages [URL]
//!
//! Without a URL a built-in sample page is used.

use chomp::{
    deduplicate, fetch_page, filter_noise, render, resolve_images, select_content, Config,
    Document,
};
use url::Url;

const SAMPLE: &str = r#"<html><head><base href="https://blog.example.com/posts/"></head><body>
<nav><a href="/">Home</a> <a href="/archive">Archive</a></nav>
<div id="page">
  <article>
    <h1>Borrowing without tears</h1>
    <p>The borrow checker tracks who may read and who may write each value.</p>
    <img src="diagram.png" alt="Borrow graph">
    <p>Shared references may be copied freely, mutable ones are unique.</p>
    <p>The borrow checker tracks who may read and who may write each value.</p>
  </article>
  <div class="newsletter"><span>Subscribe</span></div>
</div>
<div class="cookie-banner">We use cookies</div>
<footer>Copyright 2024</footer>
</body></html>"#;

fn stage(name: &str, document: &Document) {
    println!("  {:<10} {:>4} nodes", name, document.len());
}

fn show_stages(html: &str, base_url: Option<Url>) -> Result<(), chomp::ConvertError> {
    let config = Config::default();
    let mut document = Document::parse(html)?;
    if let Some(url) = base_url {
        document = document.with_base_url(url);
    }

    println!("Stages:");
    stage("parsed", &document);
    let document = filter_noise(&document, &config);
    stage("filtered", &document);
    let document = select_content(&document, &config);
    stage("selected", &document);
    let document = deduplicate(&document);
    stage("deduped", &document);

    for retain_images in [false, true] {
        let config = config.clone().with_retain_images(retain_images);
        let markdown = render(&resolve_images(&document, &config), &config)?;
        println!("\nretain_images = {}:\n{}", retain_images, markdown);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let Some(url) = std::env::args().nth(1) else {
        if let Err(e) = show_stages(SAMPLE, None) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        return;
    };

    let page = match fetch_page(&url).await {
        Ok(page) => page,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    println!("{} ({} bytes)\n", page.url, page.body.len());

    let base = Url::parse(&page.url).ok();
    if let Err(e) = show_stages(&page.body, base) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
