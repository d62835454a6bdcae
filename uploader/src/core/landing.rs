//! Landing-page URL rewriting.
//!
//! Works on the raw query string so every parameter we do not own (`token`,
//! `oxd`, ...) comes out exactly as configured, in the same order.

use url::form_urlencoded;

use crate::error::{UploaderError, UploaderResult};

const CHANNEL: &str = "channel";
const QUERY: &str = "q";

/// Parsed landing-page template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandingTemplate {
    prefix: String,
    pairs: Vec<String>,
    fragment: Option<String>,
    base_channel: String,
}

impl LandingTemplate {
    /// Parse a template; `base_channel` overrides the template's channel value
    pub fn parse(template: &str, base_channel: Option<&str>) -> UploaderResult<Self> {
        let template = template.trim();
        if template.is_empty() {
            return Err(UploaderError::config("landing page template is empty"));
        }

        let (without_fragment, fragment) = match template.split_once('#') {
            Some((head, frag)) => (head, Some(frag.to_string())),
            None => (template, None),
        };
        let (prefix, query) = without_fragment
            .split_once('?')
            .unwrap_or((without_fragment, ""));

        let pairs: Vec<String> = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(str::to_string)
            .collect();

        let template_channel = pairs
            .iter()
            .find(|pair| pair_key(pair) == CHANNEL)
            .map(|pair| pair_value(pair).to_string());

        let base_channel = match base_channel.map(str::trim).filter(|b| !b.is_empty()) {
            Some(base) => base.to_string(),
            None => template_channel
                .map(|value| value.trim_end_matches(|c: char| c.is_ascii_digit()).to_string())
                .filter(|base| !base.is_empty())
                .ok_or_else(|| {
                    UploaderError::config("landing page template has no channel value and no base_channel is set")
                })?,
        };

        Ok(Self {
            prefix: prefix.to_string(),
            pairs,
            fragment,
            base_channel,
        })
    }

    pub fn base_channel(&self) -> &str {
        &self.base_channel
    }

    /// URL for layer `index` (1-based) of a row searching for `query`
    pub fn render(&self, query: &str, index: u32) -> String {
        let channel = format!("{}{}", self.base_channel, index);
        let encoded_query: String = form_urlencoded::byte_serialize(query.trim().as_bytes()).collect();

        let mut saw_channel = false;
        let mut saw_query = false;
        let mut pairs: Vec<String> = self
            .pairs
            .iter()
            .map(|pair| match pair_key(pair) {
                CHANNEL => {
                    saw_channel = true;
                    format!("{CHANNEL}={channel}")
                }
                QUERY => {
                    saw_query = true;
                    format!("{QUERY}={encoded_query}")
                }
                _ => pair.clone(),
            })
            .collect();

        if !saw_channel {
            pairs.push(format!("{CHANNEL}={channel}"));
        }
        if !saw_query {
            pairs.push(format!("{QUERY}={encoded_query}"));
        }

        let mut url = format!("{}?{}", self.prefix, pairs.join("&"));
        if let Some(fragment) = &self.fragment {
            url.push('#');
            url.push_str(fragment);
        }
        url
    }
}

fn pair_key(pair: &str) -> &str {
    pair.split_once('=').map(|(key, _)| key).unwrap_or(pair)
}

fn pair_value(pair: &str) -> &str {
    pair.split_once('=').map(|(_, value)| value).unwrap_or("")
}
