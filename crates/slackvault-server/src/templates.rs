//! Page templates, embedded at compile time so the binary is self-contained.

use std::sync::LazyLock;

use include_dir::{Dir, include_dir};
use minijinja::{AutoEscape, Environment, Error};

static TEMPLATE_DIR: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/templates");

static ENV: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();

    env.set_auto_escape_callback(|name| {
        let is_html = std::path::Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("html"));
        if is_html {
            AutoEscape::Html
        } else {
            AutoEscape::None
        }
    });

    for file in TEMPLATE_DIR.files() {
        let Some(name) = file.path().to_str() else {
            continue;
        };
        let Some(contents) = file.contents_utf8() else {
            tracing::warn!("Skipping non-UTF-8 template {}", name);
            continue;
        };
        if let Err(e) = env.add_template(name, contents) {
            tracing::error!("Template {} failed to parse: {}", name, e);
        }
    }

    env
});

pub fn render_template<T: serde::Serialize>(name: &str, ctx: T) -> Result<String, Error> {
    let tpl = ENV.get_template(name)?;
    tpl.render(ctx)
}
