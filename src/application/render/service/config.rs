use ammonia::Builder as AmmoniaBuilder;
use comrak::options::Options;

use crate::application::render::types::ConverterOptions;

/// Tag kept verbatim in converter output and styled as a distinct block.
pub(crate) const THINKING_TAG: &str = "thinking";

pub(crate) fn comrak_options(options: &ConverterOptions) -> Options<'static> {
    let mut comrak = Options::default();

    let ext = &mut comrak.extension;
    ext.strikethrough = options.gfm;
    ext.table = options.gfm;
    ext.autolink = options.gfm;
    ext.tasklist = options.gfm;
    ext.tagfilter = false;

    let render = &mut comrak.render;
    render.hardbreaks = options.breaks;
    render.github_pre_lang = options.gfm;
    render.r#unsafe = true;

    comrak
}

pub(crate) fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    builder.add_tags(&[THINKING_TAG, "input"]);
    builder.add_generic_attributes(&["class", "id"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled"]);
    builder.add_tag_attributes("th", &["align"]);
    builder.add_tag_attributes("td", &["align"]);
    builder.add_tag_attributes("code", &["class"]);
    builder.add_tag_attributes("pre", &["lang"]);

    builder
}
