use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};

const BLOCKED_SCHEMES: [&str; 3] = ["javascript:", "vbscript:", "data:"];

/// Render stage markdown to HTML for the result sections of the page.
///
/// Stage text is model output shaped by web content, so raw HTML is dropped
/// and links with script-capable schemes are neutralised. The page shows the
/// unrendered markdown separately as plain text.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options).filter_map(|event| match event {
        Event::Html(_) | Event::InlineHtml(_) => None,
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Some(Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        })),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Some(Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        })),
        other => Some(other),
    });

    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let normalized: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    if BLOCKED_SCHEMES
        .iter()
        .any(|scheme| normalized.starts_with(scheme))
    {
        CowStr::Borrowed("#")
    } else {
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_headings_links_and_tables() {
        let html = markdown_to_html(
            "## Use cases\n\n- [Retail sales](https://www.kaggle.com/datasets/retail)\n\n\
             | Case | Benefit |\n|---|---|\n| Forecasting | Less waste |\n",
        );

        assert!(html.contains("<h2>Use cases</h2>"));
        assert!(html.contains(r#"<a href="https://www.kaggle.com/datasets/retail">Retail sales</a>"#));
        assert!(html.contains("<table>"));
    }

    #[test]
    fn strikethrough_is_enabled() {
        assert!(markdown_to_html("~~old~~").contains("<del>old</del>"));
    }

    #[test]
    fn raw_html_from_model_output_is_dropped() {
        let block = markdown_to_html("<img src=x onerror=\"alert(document.cookie)\">");
        assert!(!block.contains("onerror"), "{block}");
        assert!(!block.contains("<img"), "{block}");

        let inline = markdown_to_html("Found <script>alert(1)</script> in a result.");
        assert!(!inline.contains("<script"), "{inline}");
        assert!(inline.contains("Found "));
        assert!(inline.contains(" in a result."));
    }

    #[test]
    fn script_links_are_neutralised() {
        let html = markdown_to_html("[dataset](javascript:alert(1)) and ![x](JavaScript:alert(2))");
        assert!(!html.to_ascii_lowercase().contains("javascript:"), "{html}");
        assert!(html.contains(r##"<a href="#">dataset</a>"##));
    }
}
