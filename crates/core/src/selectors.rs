//! Selector catalogs used by the pre-cleaner and force extraction.
//!
//! These are data, not logic: the cleaner walks them in order and never
//! embeds selector strings of its own. Grouped roughly by the kind of
//! boilerplate they target so entries stay maintainable.

/// Selectors marking main article content. Elements matching any of these,
/// plus all their ancestors and descendants, are exempt from every removal
/// pass.
pub const PROTECTED_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role=\"main\"]",
    "[itemprop=\"articleBody\"]",
    ".article-body",
    ".article-content",
    ".article__body",
    ".post-content",
    ".post-body",
    ".entry-content",
    ".story-body",
    ".story-content",
    ".c-entry-content",
    ".rich-text",
    "#article-body",
];

/// Boilerplate selectors removed unless protected.
pub const NEGATIVE_SELECTORS: &[&str] = &[
    // sidebars and secondary columns
    "aside",
    ".sidebar",
    ".side-bar",
    "#sidebar",
    ".rail",
    ".secondary",
    "[role=\"complementary\"]",
    // comments
    "#comments",
    ".comments",
    ".comment-section",
    ".comments-area",
    "#disqus_thread",
    ".disqus",
    // newsletter / subscription widgets
    ".newsletter",
    ".newsletter-signup",
    ".newsletter-form",
    ".subscribe",
    ".subscription",
    ".signup-form",
    ".email-signup",
    ".inline-signup",
    // advertising
    ".ad",
    ".ads",
    ".advert",
    ".advertisement",
    ".ad-container",
    ".ad-wrapper",
    ".ad-slot",
    ".ad-unit",
    ".google-ad",
    "[id^=\"google_ads\"]",
    "[class^=\"ad-\"]",
    "[data-ad-slot]",
    // social sharing
    ".social",
    ".social-share",
    ".share",
    ".share-bar",
    ".share-buttons",
    ".sharing",
    ".social-links",
    ".social-media",
    // related / recommended content
    ".related",
    ".related-posts",
    ".related-articles",
    ".related-content",
    ".recommended",
    ".recirc",
    ".read-more",
    ".more-stories",
    ".also-read",
    ".you-might-like",
    // navigation and footers
    "nav",
    "header.site-header",
    ".navigation",
    ".navbar",
    ".nav-menu",
    ".menu",
    ".breadcrumb",
    ".breadcrumbs",
    "footer",
    ".footer",
    ".site-footer",
    // widgets, toolbars, carousels
    ".widget",
    ".toolbar",
    ".carousel",
    ".slider",
    ".gallery-nav",
    // tag / meta / byline chrome
    ".tags",
    ".tag-list",
    ".post-tags",
    ".post-meta",
    ".entry-meta",
    ".article-meta",
    ".byline-block",
    // popups, modals, banners
    ".popup",
    ".modal",
    ".overlay",
    ".cookie-banner",
    ".cookie-consent",
    ".gdpr",
    "#cookie-notice",
    // hidden elements
    "[hidden]",
    "[style*=\"display:none\"]",
    "[style*=\"display: none\"]",
    "[aria-hidden=\"true\"]",
    // interactive form controls
    "form",
    "button",
    "input",
    "select",
    "textarea",
    // calls to action, donation asks
    ".cta",
    ".call-to-action",
    ".donate",
    ".donation",
    ".support-us",
    ".contribute",
    ".paywall-prompt",
    // pagination
    ".pagination",
    ".pager",
    ".page-numbers",
    // profile / bio blocks
    ".author-bio",
    ".author-box",
    ".profile-card",
    ".about-author",
    // trending / popular blocks
    ".trending",
    ".popular",
    ".most-read",
    ".top-stories",
    // platform-specific boilerplate
    ".wp-block-buttons",
    ".sharedaddy",
    ".jp-relatedposts",
    ".outbrain",
    ".taboola",
    "[id^=\"taboola-\"]",
    ".medium-feed",
    ".pocket-btn",
];

/// Lazy-load attribute names probed in order when an image has no usable
/// `src`. Names containing "srcset" are written to `srcset` instead.
pub const LAZY_SRC_ATTRIBUTES: &[&str] = &[
    "data-src",
    "data-lazy-src",
    "data-original",
    "data-url",
    "data-hi-res-src",
    "data-image-src",
    "data-srcset",
    "data-lazy-srcset",
];

/// Substrings identifying placeholder image sources that should be replaced
/// by a lazy-load attribute.
pub const PLACEHOLDER_SRC_PATTERNS: &[&str] = &[
    "placeholder",
    "spacer.",
    "blank.",
    "1x1",
    "pixel.",
    "grey.gif",
    "gray.gif",
    "loading.",
    "lazy.",
    "transparent.",
];

/// Generic content-container selectors tried by force extraction, in order,
/// when the scoring algorithm comes up empty.
pub const GENERIC_CONTENT_SELECTORS: &[&str] = &[
    ".post-content",
    ".entry-content",
    ".article-content",
    ".content",
    "article",
    "main",
    "[role=\"main\"]",
];

/// Selectors whose presence marks a structured article container; used only
/// as an extraction-confidence signal, never for removal.
pub const STRUCTURED_ARTICLE_SELECTORS: &[&str] = &[
    "article",
    "[itemscope][itemtype*=\"Article\"]",
    "[itemprop=\"articleBody\"]",
];
