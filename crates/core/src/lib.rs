pub mod article;
pub mod bypass;
pub mod clean;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod markdown;
pub mod metadata;
pub mod parse;
pub mod paywall;
pub mod pipeline;
pub mod readability;
pub mod scoring;
pub mod selectors;
pub mod siteconfig;
pub mod sites;

pub use article::{ArchiveSource, ArticleContent};
pub use bypass::{BypassConfig, BypassOrchestrator, BypassResult, StrategySource};
pub use clean::{CleanConfig, CleaningResult, clean_html};
pub use error::{ExtractError, FetchError, FetchErrorKind, Result};
pub use extract::{ExtractConfig, ExtractedContent, extract_content};
pub use fetch::{FetchConfig, FetchIdentity, FetchResult, fetch_url};
pub use markdown::{MarkdownOptions, MarkdownResult, format_markdown};
pub use metadata::{ExtractedMetadata, extract_metadata};
pub use parse::Document;
pub use paywall::{PaywallConfig, PaywallSignal, detect_paywall};
pub use pipeline::{PipelineConfig, PipelineConfigBuilder, extract_article};
pub use readability::{Readability, ReadabilityOptions, parse_article};
pub use siteconfig::{SiteConfig, SiteConfigTable};
pub use sites::{ExtractorRegistry, ExtractorResult, SiteExtractor};
