use std::fs;
use std::path::Path;

use minijinja::{context, Environment, Value};
use serde::Serialize;

use super::qr::png_data_uri;
use crate::error::{DeckError, DeckResult};

const FRONT: &str = "cards_front.html";
const BACK: &str = "cards_back.html";
/// Relative path the stylesheet uses for the card background.
pub const BACKGROUND_PLACEHOLDER: &str = "../assets/card_bg_04.png";

/// Front and back markup for one print page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub front: String,
    pub back: String,
}

/// Holds both compiled layouts plus the shared `<style>` block.
pub struct PageRenderer {
    env: Environment<'static>,
    css_embedded: String,
}

impl PageRenderer {
    /// Read and compile the templates, inlining the background into the stylesheet.
    pub fn load(front: &Path, back: &Path, stylesheet: &Path, background: &Path) -> DeckResult<Self> {
        let read = |path: &Path| fs::read_to_string(path).map_err(|e| DeckError::io(path, e));
        let png = fs::read(background).map_err(|e| DeckError::io(background, e))?;
        let css = embed_css(&read(stylesheet)?, &png);
        Self::from_sources(read(front)?, read(back)?, css)
    }

    pub fn from_sources(front: String, back: String, css_embedded: String) -> DeckResult<Self> {
        let mut env = Environment::new();
        env.add_template_owned(FRONT, front)?;
        env.add_template_owned(BACK, back)?;
        Ok(Self { env, css_embedded })
    }

    pub fn render<T: Serialize>(
        &self,
        tracks: &[T],
        page_number: usize,
        total_pages: usize,
    ) -> DeckResult<RenderedPage> {
        let ctx = context! {
            tracks,
            css_embedded => Value::from_safe_string(self.css_embedded.clone()),
            page_number,
            total_pages
        };
        Ok(RenderedPage {
            front: self.env.get_template(FRONT)?.render(&ctx)?,
            back: self.env.get_template(BACK)?.render(&ctx)?,
        })
    }
}

/// Inline `background_png` into `css` and wrap it in a `<style>` element.
pub fn embed_css(css: &str, background_png: &[u8]) -> String {
    let css = css.replace(BACKGROUND_PLACEHOLDER, &png_data_uri(background_png));
    format!("<style>\n{css}\n</style>")
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Card {
        serial_number: &'static str,
        artist: &'static str,
    }

    const FRONT_SRC: &str = "{{ css_embedded }}<p>{{ page_number }}/{{ total_pages }}</p>\
        {% for t in tracks %}<div>{{ t.serial_number }}</div>{% endfor %}";
    const BACK_SRC: &str = "{% for t in tracks %}<b>{{ t.artist }}</b>{% endfor %}";

    fn renderer() -> PageRenderer {
        PageRenderer::from_sources(
            FRONT_SRC.into(),
            BACK_SRC.into(),
            "<style>\n.card {}\n</style>".into(),
        )
        .unwrap()
    }

    #[test]
    fn renders_counters_and_only_page_tracks() {
        let cards = [
            Card { serial_number: "SN-013", artist: "Queen" },
            Card { serial_number: "SN-014", artist: "Simon & Garfunkel" },
        ];
        let page = renderer().render(&cards, 2, 2).unwrap();

        assert!(page.front.starts_with("<style>"));
        assert!(page.front.contains("<p>2/2</p>"));
        assert_eq!(page.front.matches("<div>").count(), 2);
        assert!(page.front.contains("SN-014"));
        assert!(page.back.contains("<b>Simon &amp; Garfunkel</b>"));
    }

    #[test]
    fn malformed_template_fails_at_load() {
        let err = PageRenderer::from_sources("{% for %}".into(), BACK_SRC.into(), String::new());
        assert!(matches!(err, Err(DeckError::Template(_))));
    }

    #[test]
    fn missing_template_file_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.html");
        let err = PageRenderer::load(&missing, &missing, &missing, &missing);
        assert!(matches!(err, Err(DeckError::IoFailure { .. })));
    }

    #[test]
    fn background_is_inlined() {
        let css = format!(".card {{ background: url(\"{BACKGROUND_PLACEHOLDER}\"); }}");
        let embedded = embed_css(&css, &[0x89, b'P', b'N', b'G']);
        assert!(embedded.starts_with("<style>\n"));
        assert!(embedded.ends_with("\n</style>"));
        assert!(!embedded.contains(BACKGROUND_PLACEHOLDER));
        assert!(embedded.contains("url(\"data:image/png;base64,iVBORw==\")"));
    }
}
