//! Finding `libIndexStore` on the host.

use std::env;
use std::path::{Path, PathBuf};

/// Explicit library location; takes precedence over any search.
pub const LIBRARY_PATH_ENV: &str = "INDEXSTORE_LIBRARY_PATH";

/// Compilers whose toolchains ship the library.
const TOOLS: &[&str] = &["clang", "swiftc"];

pub fn library_file_name() -> &'static str {
    if cfg!(target_os = "macos") {
        "libIndexStore.dylib"
    } else if cfg!(windows) {
        "IndexStore.dll"
    } else {
        "libIndexStore.so"
    }
}

pub fn library_path_from_env() -> Option<PathBuf> {
    env::var_os(LIBRARY_PATH_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Resolve `name` against `PATH` like a shell would.
pub fn find_tool(name: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path).find_map(|dir| {
        let candidate = dir.join(executable_name(name));
        candidate.is_file().then_some(candidate)
    })
}

fn executable_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

/// Every place the library may live, in search order, without duplicates.
/// Tools found through symlinks contribute both the link location and the
/// resolved toolchain.
pub fn candidate_library_paths() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    for tool in TOOLS.iter().filter_map(|name| find_tool(name)) {
        let resolved = std::fs::canonicalize(&tool).ok();
        for binary in std::iter::once(tool).chain(resolved) {
            if let Some(candidate) = library_next_to(&binary) {
                if !candidates.contains(&candidate) {
                    candidates.push(candidate);
                }
            }
        }
    }
    candidates
}

/// `<toolchain>/bin/<tool>` → `<toolchain>/lib/<library>`; on Windows the
/// DLL sits beside the tool.
fn library_next_to(binary: &Path) -> Option<PathBuf> {
    let bin = binary.parent()?;
    if cfg!(windows) {
        return Some(bin.join(library_file_name()));
    }
    Some(bin.parent()?.join("lib").join(library_file_name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_library_is_expected_in_the_sibling_lib_dir() {
        let candidate = library_next_to(Path::new("/opt/llvm/bin/clang")).unwrap();
        assert_eq!(
            candidate,
            Path::new("/opt/llvm/lib").join(library_file_name())
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_bare_tool_names_have_no_library_location() {
        assert!(library_next_to(Path::new("clang")).is_none());
    }
}
