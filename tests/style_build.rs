// tests/style_build.rs

mod common;
use crate::common::{init_tracing, project, read};

use std::error::Error;
use std::path::{Path, PathBuf};

use buildloop::fs::{RealFileSystem, walk_files};
use buildloop::fs::mock::MockFileSystem;
use buildloop::session::SourceFileCache;
use buildloop::style::{SourceMapBuilder, StyleSheetBuilder, discover, encode_vlq};
use buildloop_test_utils::builders::BuildConfigBuilder;

type TestResult = Result<(), Box<dyn Error>>;

fn fallback() -> Vec<String> {
    vec!["src/**/*.scss".to_string()]
}

fn cache_of(paths: &[&str]) -> SourceFileCache {
    let mut cache = SourceFileCache::new();
    for p in paths {
        cache.observe(*p);
    }
    cache
}

fn vlq(value: i64) -> String {
    let mut out = String::new();
    encode_vlq(value, &mut out);
    out
}

#[test]
fn discover_picks_sibling_of_cached_module_only() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("./src/widget.js", "export {}");
    fs.add_file("./src/widget.scss", ".w { color: red; }");
    fs.add_file("./src/other.scss", ".o { color: blue; }");

    let found = discover(&fs, Path::new("."), &cache_of(&["src/widget.js"]), &fallback())?;
    assert_eq!(found, vec![PathBuf::from("src/widget.scss")]);
    Ok(())
}

#[test]
fn discover_keeps_cache_order_without_duplicates() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("./src/b.scss", "");
    fs.add_file("./src/a.scss", "");
    fs.add_file("./src/nested/c.scss", "");

    let cache = cache_of(&[
        "src/b.js",
        "src/missing.js",
        "src/a.js",
        "src/b.ts",
        "src/nested/c.js",
    ]);
    let found = discover(&fs, Path::new("."), &cache, &fallback())?;

    assert_eq!(
        found,
        vec![
            PathBuf::from("src/b.scss"),
            PathBuf::from("src/a.scss"),
            PathBuf::from("src/nested/c.scss"),
        ]
    );
    Ok(())
}

#[test]
fn discover_falls_back_to_globs_for_empty_cache() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("./src/z.scss", "");
    fs.add_file("./src/theme/base.scss", "");
    fs.add_file("./src/app.js", "");
    fs.add_file("./node_modules/lib/lib.scss", "");

    let found = discover(&fs, Path::new("."), &SourceFileCache::new(), &fallback())?;
    assert_eq!(
        found,
        vec![PathBuf::from("src/theme/base.scss"), PathBuf::from("src/z.scss")]
    );
    Ok(())
}

#[test]
fn discover_falls_back_when_no_sibling_exists() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("./src/only.scss", "");

    let found = discover(&fs, Path::new("."), &cache_of(&["src/index.js"]), &fallback())?;
    assert_eq!(found, vec![PathBuf::from("src/only.scss")]);
    Ok(())
}

#[cfg(unix)]
#[test]
fn fallback_walk_does_not_follow_symlinked_directories() -> TestResult {
    let dir = project(&[("src/a.scss", ".a{color:red}\n")]);
    std::os::unix::fs::symlink(dir.path(), dir.path().join("src/loop"))?;

    let found = discover(&RealFileSystem, dir.path(), &SourceFileCache::new(), &fallback())?;
    assert_eq!(found, vec![PathBuf::from("src/a.scss")]);

    let all = walk_files(&RealFileSystem, dir.path(), |_| true)?;
    assert_eq!(all, vec![PathBuf::from("src/a.scss")]);
    Ok(())
}

#[test]
fn compile_skips_broken_files_and_keeps_the_rest() -> TestResult {
    init_tracing();
    let dir = project(&[
        ("src/a.scss", ".a { .inner { margin: 0; } }\n"),
        ("src/broken.scss", ".b { color: $undefined; }\n"),
        ("src/c.scss", ".c { padding: 1px; }\n"),
    ]);
    let cfg = BuildConfigBuilder::new().build();
    let builder = StyleSheetBuilder::new(&cfg, dir.path());

    let paths = vec![
        PathBuf::from("src/a.scss"),
        PathBuf::from("src/broken.scss"),
        PathBuf::from("src/c.scss"),
    ];
    let report = builder.compile(&RealFileSystem, &paths)?;

    assert_eq!(
        report.compiled,
        vec![PathBuf::from("src/a.scss"), PathBuf::from("src/c.scss")]
    );
    assert_eq!(report.failed, vec![PathBuf::from("src/broken.scss")]);
    assert_eq!(report.output, Some(builder.output_path()));

    let css = read(dir.path(), "dist/app.css");
    assert_eq!(
        css,
        ".a .inner{margin:0}\n.c{padding:1px}\n/*# sourceMappingURL=app.css.map */\n"
    );

    let map: serde_json::Value = serde_json::from_str(&read(dir.path(), "dist/app.css.map"))?;
    assert_eq!(map["version"], 3);
    assert_eq!(map["file"], "app.css");
    assert_eq!(
        map["sources"],
        serde_json::json!(["../src/a.scss", "../src/c.scss"])
    );
    assert_eq!(map["mappings"], "AAAA;ACAA");
    Ok(())
}

#[test]
fn compile_leaves_imported_partials_to_their_importer() -> TestResult {
    init_tracing();
    let dir = project(&[
        ("src/_buttons.scss", ".btn{color:red}\n"),
        ("src/main.scss", "@import 'buttons';\nbody{margin:0}\n"),
    ]);
    let cfg = BuildConfigBuilder::new().build();
    let builder = StyleSheetBuilder::new(&cfg, dir.path());

    let found = discover(&RealFileSystem, dir.path(), &SourceFileCache::new(), &fallback())?;
    assert_eq!(
        found,
        vec![PathBuf::from("src/_buttons.scss"), PathBuf::from("src/main.scss")]
    );

    let report = builder.compile(&RealFileSystem, &found)?;
    assert_eq!(report.compiled, vec![PathBuf::from("src/main.scss")]);
    assert!(report.failed.is_empty());

    let css = read(dir.path(), "dist/app.css");
    assert_eq!(css.matches(".btn").count(), 1);
    assert!(css.contains("body{margin:0}"));
    Ok(())
}

#[test]
fn compile_of_partials_alone_writes_nothing() -> TestResult {
    let dir = project(&[("src/_vars.scss", "$c: red;\n.v{color:$c}\n")]);
    let cfg = BuildConfigBuilder::new().build();
    let builder = StyleSheetBuilder::new(&cfg, dir.path());

    let report = builder.compile(&RealFileSystem, &[PathBuf::from("src/_vars.scss")])?;
    assert!(report.compiled.is_empty());
    assert!(report.failed.is_empty());
    assert_eq!(report.output, None);
    assert!(!builder.output_path().exists());
    Ok(())
}

#[test]
fn compile_with_nothing_to_do_writes_nothing() -> TestResult {
    let dir = project(&[("src/broken.scss", "@import 'nope';\n")]);
    let cfg = BuildConfigBuilder::new().build();
    let builder = StyleSheetBuilder::new(&cfg, dir.path());

    let empty = builder.compile(&RealFileSystem, &[])?;
    assert_eq!(empty.output, None);

    let report = builder.compile(&RealFileSystem, &[PathBuf::from("src/broken.scss")])?;
    assert_eq!(report.output, None);
    assert_eq!(report.failed.len(), 1);
    assert!(!builder.output_path().exists());
    Ok(())
}

#[test]
fn vlq_encoding() {
    assert_eq!(vlq(0), "A");
    assert_eq!(vlq(1), "C");
    assert_eq!(vlq(-1), "D");
    assert_eq!(vlq(15), "e");
    assert_eq!(vlq(16), "gB");
    assert_eq!(vlq(-17), "jB");
    assert_eq!(vlq(1000), "w+B");
}

#[test]
fn source_map_maps_each_line_to_its_source() {
    let mut builder = SourceMapBuilder::new();
    builder.add_source("../src/a.scss", 2);
    builder.add_source("../src/b.scss", 1);
    builder.add_source("../src/c.scss", 1);

    let map = builder.build("app.css");
    assert_eq!(map.version, 3);
    assert_eq!(map.sources.len(), 3);
    assert!(map.names.is_empty());
    // Source index deltas: 0, 0, +1, +1.
    assert_eq!(map.mappings, "AAAA;AAAA;ACAA;ACAA");
}
