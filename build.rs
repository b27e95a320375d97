//! Build script recording the commit this binary was built from.

use std::env;
use std::path::PathBuf;

#[allow(dead_code)]
#[path = "src/cli/git.rs"]
mod git;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src/cli/git.rs");

    let Some(manifest_dir) = env::var_os("CARGO_MANIFEST_DIR").map(PathBuf::from) else {
        return;
    };

    // Outside a git checkout the hash is simply left unset.
    if let Some(head) = git::head_commit(&manifest_dir) {
        for path in &head.watched {
            println!("cargo:rerun-if-changed={}", path.display());
        }
        println!("cargo:rustc-env=TRL_GIT_COMMIT={}", head.hash);
    }
}
