use std::path::{Path, PathBuf};

use arch_lint::rules::{NoErrorSwallowing, NoSilentResultDrop};
use arch_lint::{Analyzer, Severity};

const CRATES: &[&str] = &[
    "layerpack-core",
    "layerpack-build",
    "layerpack-cloud",
    "layerpack-cli",
];

fn crates_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("crates directory")
        .to_path_buf()
}

/// Errors from the installer, downloads, archive writes and the aws CLI must
/// reach the pipeline boundary. AL003 (no-error-swallowing) and AL013
/// (no-silent-result-drop) run over each crate's `src/`.
#[test]
fn errors_are_never_swallowed() {
    let mut reports = Vec::new();

    for name in CRATES {
        let src = crates_dir().join(name).join("src");
        assert!(src.is_dir(), "missing source tree {}", src.display());

        let analyzer = Analyzer::builder()
            .root(&src)
            .rule(NoErrorSwallowing::new())
            .rule(NoSilentResultDrop::new())
            .build()
            .expect("build analyzer");
        let result = analyzer.analyze().expect("analyze");

        if result.has_violations_at(Severity::Warning) {
            reports.push(format!(
                "{name}:\n{}",
                result.format_test_report(Severity::Warning)
            ));
        }
    }

    assert!(reports.is_empty(), "{}", reports.join("\n"));
}
