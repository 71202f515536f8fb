use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Path for a file written by a test, under a shared `test_output/`
/// directory at the workspace root. The directory is created on first use
/// and kept between runs so generated catalogs can be inspected.
pub fn test_output_path(name: &str) -> PathBuf {
    static DIR: OnceLock<PathBuf> = OnceLock::new();
    let dir = DIR.get_or_init(|| {
        let root = Path::new(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let dir = root.join("test_output");
        std::fs::create_dir_all(&dir).expect("failed to create test_output directory");
        dir
    });
    dir.join(name)
}
