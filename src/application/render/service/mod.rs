mod config;

use comrak::{Arena, format_html, nodes::AstNode, parse_document};

use crate::application::render::types::{Converter, ConverterOptions, RenderError};

use config::{build_sanitizer, comrak_options};

/// Comrak-based converter. Raw HTML passes through untouched unless the
/// caller asks for sanitisation, in which case Ammonia runs over the output
/// with `<thinking>` kept on the allow-list.
pub struct ComrakConverter {
    sanitizer: ammonia::Builder<'static>,
}

impl ComrakConverter {
    pub fn new() -> Self {
        Self {
            sanitizer: build_sanitizer(),
        }
    }
}

impl Default for ComrakConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter for ComrakConverter {
    fn parse(&self, markdown: &str, options: &ConverterOptions) -> Result<String, RenderError> {
        let comrak = comrak_options(options);
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &comrak);
        let html = render_html_stage(root, &comrak)?;

        if options.sanitize {
            Ok(self.sanitizer.clean(&html).to_string())
        } else {
            Ok(html)
        }
    }
}

fn render_html_stage<'a>(
    root: &'a AstNode<'a>,
    options: &comrak::Options<'static>,
) -> Result<String, RenderError> {
    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::parse(err.to_string()))?;
    Ok(html)
}
