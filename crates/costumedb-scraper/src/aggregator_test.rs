use super::*;
use crate::browser::fake::{FakeElement, FakeLauncher, FakePage, FakeSession};
use crate::error::BrowserErrorKind;

const PAGE: &str = "https://costumewall.com/dress-like-jack-sparrow/";

fn scraper() -> AggregatorLinkScraper {
    AggregatorLinkScraper::new(AggregatorSettings {
        ready_timeout: Duration::ZERO,
        settle_delay: Duration::ZERO,
    })
}

fn anchor(href: &str, text: &str) -> FakeElement {
    FakeElement::new(text).attr("href", href)
}

fn base() -> Url {
    Url::parse(PAGE).unwrap()
}

// ---------------------------------------------------------------------------
// clean_page_title
// ---------------------------------------------------------------------------

#[test]
fn title_prefix_and_suffix_are_stripped() {
    assert_eq!(
        clean_page_title("How to Dress Like Jack Sparrow Costume Guide"),
        Some("Jack Sparrow".to_owned())
    );
    assert_eq!(
        clean_page_title("Dress Like Wednesday Addams Costume"),
        Some("Wednesday Addams".to_owned())
    );
    assert_eq!(
        clean_page_title("DIY Link Cosplay"),
        Some("Link".to_owned())
    );
}

#[test]
fn title_without_boilerplate_is_kept() {
    assert_eq!(clean_page_title("  Captain Hook "), Some("Captain Hook".to_owned()));
}

#[test]
fn boilerplate_only_title_is_none() {
    assert_eq!(clean_page_title("   "), None);
}

// ---------------------------------------------------------------------------
// classify_link
// ---------------------------------------------------------------------------

#[test]
fn direct_marketplace_link_is_canonicalized() {
    let link = classify_link(
        "https://www.amazon.com/Pirate-Hat/dp/b08xyz1234/ref=sr_1?tag=cw-20",
        Some(&base()),
    )
    .unwrap();
    assert_eq!(link.url, "https://www.amazon.com/dp/B08XYZ1234");
    assert_eq!(link.product_id.as_deref(), Some("B08XYZ1234"));
    assert!(link.is_target_marketplace());
}

#[test]
fn redirect_link_resolves_to_same_canonical_url() {
    let direct = classify_link("https://www.amazon.com/dp/B08XYZ1234", Some(&base())).unwrap();
    let redirect = classify_link(
        "https://geni.us/hat?GR_URL=https%3A%2F%2Fwww.amazon.com%2Fdp%2FB08XYZ1234%3Fth%3D1",
        Some(&base()),
    )
    .unwrap();
    assert_eq!(redirect, direct);
}

#[test]
fn redirect_to_schemeless_marketplace_url_is_recognised() {
    let link = classify_link(
        "https://geni.us/x?GR_URL=www.amazon.com%2Fdp%2FB07J4Q7LFQ",
        Some(&base()),
    )
    .unwrap();
    assert_eq!(link.url, "https://www.amazon.com/dp/B07J4Q7LFQ");
    assert_eq!(link.product_id.as_deref(), Some("B07J4Q7LFQ"));
    assert!(link.is_target_marketplace());
}

#[test]
fn redirect_to_schemeless_external_url_gets_https() {
    let link = classify_link(
        "https://geni.us/sash?GR_URL=www.etsy.com%2Flisting%2F123%2Fsash",
        Some(&base()),
    )
    .unwrap();
    assert_eq!(link.url, "https://www.etsy.com/listing/123/sash");
    assert!(!link.is_target_marketplace());
}

#[test]
fn external_retailer_link_keeps_raw_url() {
    let link = classify_link("https://www.etsy.com/listing/123/pirate-sash", Some(&base())).unwrap();
    assert_eq!(link.url, "https://www.etsy.com/listing/123/pirate-sash");
    assert!(!link.is_target_marketplace());
}

#[test]
fn non_product_links_are_skipped() {
    for href in [
        "#comments",
        "/about/",
        "https://costumewall.com/category/movies/",
        "mailto:hello@costumewall.com",
        "javascript:void(0)",
        "https://www.pinterest.com/pin/create/button/?url=x",
        "https://www.amazon.com/s?k=pirate+hat",
        "",
    ] {
        assert_eq!(classify_link(href, Some(&base())), None, "href {href:?}");
    }
}

#[test]
fn label_falls_back_to_product_id_then_host() {
    let marketplace = DiscoveredLink {
        url: "https://www.amazon.com/dp/B08XYZ1234".to_owned(),
        product_id: Some("B08XYZ1234".to_owned()),
    };
    let external = DiscoveredLink {
        url: "https://www.etsy.com/listing/1".to_owned(),
        product_id: None,
    };
    assert_eq!(choose_label(Some(" Hat "), Some("Buy"), &marketplace), "Hat");
    assert_eq!(choose_label(Some(""), Some(" Buy now "), &marketplace), "Buy now");
    assert_eq!(choose_label(None, Some(""), &marketplace), "Product B08XYZ1234");
    assert_eq!(choose_label(None, None, &external), "etsy.com");
}

// ---------------------------------------------------------------------------
// scrape_page
// ---------------------------------------------------------------------------

fn guide_page() -> FakePage {
    FakePage::new()
        .text("body", "")
        .text("h1", "How to Dress Like Jack Sparrow Costume Guide")
        .element("a", anchor("/", "Home"))
        .element(
            "a",
            anchor("https://www.amazon.com/Pirate-Hat/dp/B08XYZ1234/ref=x", "Pirate Hat"),
        )
        .element(
            "a",
            anchor(
                "https://geni.us/hat?GR_URL=https%3A%2F%2Fwww.amazon.com%2Fdp%2FB08XYZ1234",
                "Same hat again",
            ),
        )
        .element("a", FakeElement::broken())
        .element(
            "a",
            anchor("https://www.amazon.com/gp/product/B07WIG0001", "").attr("title", "Dreadlock Wig"),
        )
        .element("a", anchor("https://www.etsy.com/listing/99/sash", "Red Sash"))
}

#[tokio::test]
async fn discovers_deduplicated_products_in_order() {
    let session = FakeSession::new().page(PAGE, guide_page());
    let page = scraper().scrape_page(&session, PAGE).await.unwrap();

    assert_eq!(page.title, "Jack Sparrow");
    assert_eq!(page.source_url, PAGE);
    let urls: Vec<&str> = page.products.iter().map(|p| p.canonical_url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://www.amazon.com/dp/B08XYZ1234",
            "https://www.amazon.com/dp/B07WIG0001",
            "https://www.etsy.com/listing/99/sash",
        ]
    );
    let labels: Vec<&str> = page.products.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, vec!["Pirate Hat", "Dreadlock Wig", "Red Sash"]);
    assert_eq!(page.marketplace_count(), 2);
    assert_eq!(session.scripts().len(), 1);
}

#[tokio::test]
async fn hotspot_anchors_take_precedence_over_page_links() {
    let page = FakePage::new()
        .text("body", "")
        .element(".hotspot a", anchor("https://www.amazon.com/dp/B0HOTSPOT1", "Boots"))
        .element("a", anchor("https://www.amazon.com/dp/B0SIDEBAR1", "Sidebar ad"));
    let session = FakeSession::new().page(PAGE, page);
    let page = scraper().scrape_page(&session, PAGE).await.unwrap();
    assert_eq!(page.products.len(), 1);
    assert_eq!(page.products[0].canonical_url, "https://www.amazon.com/dp/B0HOTSPOT1");
    assert_eq!(page.title, UNTITLED);
}

#[tokio::test]
async fn page_without_marketplace_links_is_valid() {
    let page = FakePage::new()
        .text("body", "")
        .text("h1", "Dress Like Nobody")
        .element("a", anchor("/contact/", "Contact"));
    let session = FakeSession::new().page(PAGE, page);
    let page = scraper().scrape_page(&session, PAGE).await.unwrap();
    assert!(page.products.is_empty());
    assert_eq!(page.title, "Nobody");
}

#[tokio::test]
async fn missing_body_is_not_ready() {
    let session = FakeSession::new();
    let err = scraper().scrape_page(&session, PAGE).await.unwrap_err();
    assert!(matches!(err, ScrapeError::NotReady { .. }));
}

#[tokio::test]
async fn launcher_variant_retries_and_closes_session() {
    let session = FakeSession::new()
        .page(PAGE, guide_page())
        .fail_navigation(PAGE, BrowserErrorKind::Timeout, 1);
    let launcher = FakeLauncher::new(session.clone());
    let page = scraper()
        .scrape_with_launcher(&launcher, RetryPolicy::new(2, Duration::ZERO), PAGE)
        .await
        .unwrap();
    assert_eq!(page.marketplace_count(), 2);
    assert_eq!(session.visits().len(), 2);
    assert_eq!(session.close_count(), 1);
    assert_eq!(launcher.launch_count(), 1);
}

#[tokio::test]
async fn launcher_failure_is_launch_error() {
    let launcher = FakeLauncher::failing("chrome not found");
    let err = scraper()
        .scrape_with_launcher(&launcher, RetryPolicy::no_retry(), PAGE)
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::Launch(_)));
}
