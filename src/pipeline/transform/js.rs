//! JavaScript stages backed by oxc: syntax lowering and minification.
//!
//! Browser scripts are parsed as classic scripts, so top-level declarations
//! are globals other scripts on the page may use. Neither stage removes them.

use std::path::Path;

use oxc::allocator::Allocator;
use oxc::ast::ast::Program;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::semantic::SemanticBuilder;
use oxc::span::SourceType;
use oxc::transformer::{TransformOptions, Transformer};

use crate::errors::TransformError;
use crate::pipeline::fileset::FileSet;

use super::{SyncTransform, TransformContext};

fn parse_script<'a>(allocator: &'a Allocator, source: &'a str) -> Result<Program<'a>, String> {
    let ret = Parser::new(allocator, source, SourceType::script()).parse();
    match ret.errors.first() {
        Some(err) => Err(err.to_string()),
        None => Ok(ret.program),
    }
}

/// Minify a classic script.
pub fn minify_script(source: &str) -> Result<String, String> {
    let allocator = Allocator::default();
    let mut program = parse_script(&allocator, source)?;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Ok(code)
}

/// Lower syntax newer than the configured targets.
pub struct Transpile {
    targets: String,
    options: TransformOptions,
}

impl std::fmt::Debug for Transpile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transpile").field("targets", &self.targets).finish()
    }
}

impl Transpile {
    /// `targets` is an ES version and/or engine list, e.g. `es2015` or
    /// `chrome58,firefox57,safari11`.
    pub fn new(targets: &str) -> anyhow::Result<Self> {
        let options = TransformOptions::from_target(targets)
            .map_err(|e| anyhow::anyhow!("invalid transpile targets {targets:?}: {e}"))?;
        Ok(Self {
            targets: targets.to_string(),
            options,
        })
    }

    fn transpile(&self, origin: &Path, source: &str) -> Result<String, String> {
        let allocator = Allocator::default();
        let mut program = parse_script(&allocator, source)?;

        let semantic = SemanticBuilder::new().build(&program);
        if let Some(err) = semantic.errors.first() {
            return Err(err.to_string());
        }
        let scoping = semantic.semantic.into_scoping();

        let ret = Transformer::new(&allocator, origin, &self.options)
            .build_with_scoping(scoping, &mut program);
        if let Some(err) = ret.errors.first() {
            return Err(err.to_string());
        }

        Ok(Codegen::new().build(&program).code)
    }
}

impl SyncTransform for Transpile {
    fn name(&self) -> &'static str {
        "transpile"
    }

    fn apply_sync(&self, files: FileSet, _ctx: &TransformContext) -> Result<FileSet, TransformError> {
        files.try_map(|entry| {
            let code = self
                .transpile(&entry.origin, entry.text("transpile")?)
                .map_err(|e| TransformError::new("transpile", &entry.origin, e))?;
            entry.set_text(code);
            Ok(())
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MinifyJs;

impl SyncTransform for MinifyJs {
    fn name(&self) -> &'static str {
        "minify-js"
    }

    fn apply_sync(&self, files: FileSet, _ctx: &TransformContext) -> Result<FileSet, TransformError> {
        files.try_map(|entry| {
            let code = minify_script(entry.text("minify-js")?)
                .map_err(|e| TransformError::new("minify-js", &entry.origin, e))?;
            entry.set_text(code);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::pipeline::transform::test_support::{ctx, single, text};

    fn minify(source: &str) -> String {
        let out = MinifyJs
            .apply_sync(single("lib.js", source), &ctx(MockFileSystem::new()))
            .unwrap();
        text(&out).remove(0)
    }

    #[test]
    fn output_is_shorter_and_drops_comments() {
        let source = "// greeting\nfunction greet(name) {\n  var message = 'hi ' + name;\n  return message;\n}\nwindow.greet = greet;\n";
        let code = minify(source);
        assert!(code.len() < source.len());
        assert!(!code.contains("greeting"));
        assert!(code.contains("window.greet"));
    }

    #[test]
    fn unused_top_level_declarations_survive() {
        let code = minify("function helper(a){ return a * 2; }\nvar LIB_VERSION = '1.0';\n");
        assert!(code.contains("function helper("), "{code}");
        assert!(code.contains("LIB_VERSION"), "{code}");

        let code = minify("var a = 1; let b = 2; const c = 3; class Widget {}");
        assert!(!code.is_empty());
        assert!(code.contains("Widget"), "{code}");
    }

    #[test]
    fn parse_error_reports_file() {
        let err = MinifyJs
            .apply_sync(single("bad.js", "function ( {"), &ctx(MockFileSystem::new()))
            .unwrap_err();
        assert_eq!(err.stage, "minify-js");
        assert!(err.file.ends_with("bad.js"));
    }

    #[test]
    fn transpile_lowers_newer_syntax() {
        let stage = Transpile::new("es2015").unwrap();
        let source = "var area = Math.PI * r ** 2;\nvar name = user.name ?? 'anonymous';\n";
        let out = stage
            .apply_sync(single("a.js", source), &ctx(MockFileSystem::new()))
            .unwrap();
        let code = &text(&out)[0];
        assert!(!code.contains("??"), "{code}");
        assert!(!code.contains("**"), "{code}");
        assert!(code.contains("anonymous"));
    }

    #[test]
    fn transpile_keeps_supported_syntax() {
        let stage = Transpile::new("esnext").unwrap();
        let out = stage
            .apply_sync(single("a.js", "var x = a ?? b;\n"), &ctx(MockFileSystem::new()))
            .unwrap();
        assert!(text(&out)[0].contains("??"));
    }

    #[test]
    fn transpile_rejects_unknown_targets() {
        assert!(Transpile::new("netscape4").is_err());
    }

    #[test]
    fn transpile_syntax_error_names_file() {
        let stage = Transpile::new("es2015").unwrap();
        let err = stage
            .apply_sync(single("broken.js", "let = ;"), &ctx(MockFileSystem::new()))
            .unwrap_err();
        assert_eq!(err.stage, "transpile");
        assert!(err.file.ends_with("broken.js"));
    }
}
