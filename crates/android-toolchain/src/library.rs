//! Library lookup inside the sysroot

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use crate::toolchain::Toolchain;

/// Finds shared libraries in a toolchain sysroot
pub struct LibraryFinder {
    search_dirs: Vec<PathBuf>,
}

impl LibraryFinder {
    /// Search the API specific directory, the triplet directory, then the
    /// whole sysroot
    pub fn new(toolchain: &Toolchain) -> Self {
        let triplet_dir = toolchain.sysroot.join("usr").join("lib").join(toolchain.abi.triplet());
        Self {
            search_dirs: vec![
                triplet_dir.join(toolchain.api.to_string()),
                triplet_dir,
                toolchain.sysroot.clone(),
            ],
        }
    }

    /// `name` is normalized to `lib<name>.so` and then used as a pattern
    /// searched within file names. The first match wins.
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        let name = normalize(name);
        let matcher = Matcher::new(&name);

        self.search_dirs.iter().find_map(|dir| {
            debug!("Searching {:?} for {}", dir, name);
            Self::find_in(dir, &matcher)
        })
    }

    /// Bottom-up walk: files of nested directories are checked before the
    /// files of `dir` itself
    fn find_in(dir: &Path, matcher: &Matcher) -> Option<PathBuf> {
        WalkDir::new(dir)
            .contents_first(true)
            .sort_by(|a, b| {
                let (a_dir, b_dir) = (a.file_type().is_dir(), b.file_type().is_dir());
                b_dir.cmp(&a_dir).then_with(|| a.file_name().cmp(b.file_name()))
            })
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| !entry.path().is_dir())
            .find(|entry| entry.file_name().to_str().map_or(false, |f| matcher.matches(f)))
            .map(|entry| entry.into_path())
    }
}

fn normalize(name: &str) -> String {
    let mut name = name.to_string();
    if !name.starts_with("lib") {
        name.insert_str(0, "lib");
    }
    if !name.ends_with(".so") {
        name.push_str(".so");
    }
    name
}

/// File name matcher; names that are not valid patterns match literally
enum Matcher {
    Pattern(Regex),
    Literal(String),
}

impl Matcher {
    fn new(name: &str) -> Self {
        match Regex::new(name) {
            Ok(re) => Matcher::Pattern(re),
            Err(_) => Matcher::Literal(name.to_string()),
        }
    }

    fn matches(&self, file_name: &str) -> bool {
        match self {
            Matcher::Pattern(re) => re.is_match(file_name),
            Matcher::Literal(name) => name == file_name,
        }
    }
}
