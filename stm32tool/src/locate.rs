//! Finding the download link of a vendor package.

use regex::Regex;
use stm32tool_target::Family;

use crate::config::Config;
use crate::fetch::{FetchError, Fetcher};

/// Element carrying the download link on a package page.
const LINK_TAG: &str = "div";
const LINK_ID: &str = "dlLink";
/// Attribute holding the site-relative download path.
const LINK_ATTRIBUTE: &str = "data-download-path";

/// Something that knows where the package of a series can be downloaded.
pub trait LinkLocator {
    /// The absolute download URL, or `None` if no link could be found.
    fn locate(&self, family: Family, series: u8) -> Result<Option<String>, FetchError>;
}

/// A [`LinkLocator`] reading the product page of a package on the vendor website.
pub struct VendorPageLocator<'a, F> {
    fetcher: &'a F,
    config: &'a Config,
    tags: Regex,
    attributes: Regex,
}

impl<'a, F: Fetcher> VendorPageLocator<'a, F> {
    pub fn new(fetcher: &'a F, config: &'a Config) -> Result<Self, regex::Error> {
        Ok(Self {
            fetcher,
            config,
            tags: Regex::new(&format!(r"(?is)<{LINK_TAG}\b([^>]*)>"))?,
            attributes: Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)?,
        })
    }

    /// The download link found in `html`, prefixed with `base_url`.
    ///
    /// If several elements match, the last one is used.
    pub fn find_download_link(&self, html: &str, base_url: &str) -> Option<String> {
        self.tags
            .captures_iter(html)
            .filter_map(|tag| {
                let attributes = tag.get(1)?.as_str();
                let mut id = None;
                let mut path = None;
                for attribute in self.attributes.captures_iter(attributes) {
                    let value = attribute.get(2).or_else(|| attribute.get(3))?.as_str();
                    match &attribute[1] {
                        "id" => id = Some(value),
                        LINK_ATTRIBUTE => path = Some(value),
                        _ => {}
                    }
                }
                (id == Some(LINK_ID)).then_some(path).flatten()
            })
            .last()
            .map(|path| format!("{base_url}{path}"))
    }
}

impl<F: Fetcher> LinkLocator for VendorPageLocator<'_, F> {
    fn locate(&self, family: Family, series: u8) -> Result<Option<String>, FetchError> {
        let page = self.config.package_page(family, series);
        tracing::debug!("Looking for the package link on {page}");

        let html = self.fetcher.fetch_text(&page)?;
        Ok(self.find_download_link(&html, &self.config.website_base_url))
    }
}
