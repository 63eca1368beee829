//! Page rendering with minijinja.
//!
//! Every file in the set is rendered as a template. `include`, `extends` and
//! `import` resolve names against the template root through the project
//! filesystem.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use minijinja::{Environment, ErrorKind};

use crate::errors::TransformError;
use crate::fs::FileSystem;
use crate::pipeline::fileset::FileSet;

use super::{SyncTransform, TransformContext};

#[derive(Debug, Clone)]
pub struct RenderTemplate {
    root: PathBuf,
    data: BTreeMap<String, serde_json::Value>,
}

impl RenderTemplate {
    pub fn new(root: PathBuf, data: BTreeMap<String, serde_json::Value>) -> Self {
        Self { root, data }
    }

    fn environment(&self, fs: Arc<dyn FileSystem>) -> Environment<'static> {
        let mut env = Environment::new();
        let root = self.root.clone();
        env.set_loader(move |name| {
            let Some(path) = template_path(&root, name) else {
                return Ok(None);
            };
            if !fs.is_file(&path) {
                return Ok(None);
            }
            fs.read_to_string(&path).map(Some).map_err(|e| {
                minijinja::Error::new(ErrorKind::InvalidOperation, format!("{e:#}"))
            })
        });
        env
    }
}

/// Map a template name to a file below `root`, refusing to leave it.
fn template_path(root: &Path, name: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(path)
}

impl SyncTransform for RenderTemplate {
    fn name(&self) -> &'static str {
        "template"
    }

    fn apply_sync(&self, files: FileSet, ctx: &TransformContext) -> Result<FileSet, TransformError> {
        let env = self.environment(ctx.fs.clone());
        files.try_map(|entry| {
            let name = ctx.display_path(&entry.origin);
            let rendered = env
                .render_named_str(&name, entry.text("template")?, &self.data)
                .map_err(|e| TransformError::new("template", &entry.origin, e))?;
            entry.set_text(rendered);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::pipeline::fileset::FileEntry;
    use crate::pipeline::transform::test_support::{ctx, text};

    fn page(contents: &str) -> FileSet {
        FileSet::from(vec![FileEntry::new("/p/src/templates", "index.jinja", contents)])
    }

    #[test]
    fn renders_includes_and_data() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/templates/partials/nav.jinja", "<nav>{{ title }}</nav>");

        let mut data = BTreeMap::new();
        data.insert("title".to_string(), serde_json::json!("Home"));
        let render = RenderTemplate::new("/p/src/templates".into(), data);

        let out = render
            .apply_sync(page("{% include 'partials/nav.jinja' %}<main></main>"), &ctx(fs))
            .unwrap();
        assert_eq!(text(&out), vec!["<nav>Home</nav><main></main>"]);
    }

    #[test]
    fn extends_layout() {
        let fs = MockFileSystem::new();
        fs.add_file(
            "/p/src/templates/layouts/base.jinja",
            "<body>{% block content %}{% endblock %}</body>",
        );
        let render = RenderTemplate::new("/p/src/templates".into(), BTreeMap::new());

        let out = render
            .apply_sync(
                page("{% extends 'layouts/base.jinja' %}{% block content %}hi{% endblock %}"),
                &ctx(fs),
            )
            .unwrap();
        assert_eq!(text(&out), vec!["<body>hi</body>"]);
    }

    #[test]
    fn missing_include_is_reported_against_the_page() {
        let render = RenderTemplate::new("/p/src/templates".into(), BTreeMap::new());
        let err = render
            .apply_sync(page("{% include 'gone.jinja' %}"), &ctx(MockFileSystem::new()))
            .unwrap_err();
        assert_eq!(err.stage, "template");
        assert!(err.file.ends_with("index.jinja"));
    }

    #[test]
    fn names_cannot_escape_root() {
        assert!(template_path(Path::new("/p/t"), "../secret").is_none());
        assert_eq!(
            template_path(Path::new("/p/t"), "a/b.jinja"),
            Some(PathBuf::from("/p/t/a/b.jinja"))
        );
    }
}
