use std::process::Command;

// runs git from the workspace root, None if git is missing or fails
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git")
        .current_dir("..")
        .args(args)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn main() {
    if let Some(describe) = git(&["describe", "--tags", "--long", "--always", "--dirty"]) {
        println!("cargo:rustc-env=LOGSYNC_GIT_DESCRIBE={describe}");
    }
    if let Some(hash) = git(&["rev-parse", "HEAD"]) {
        println!("cargo:rustc-env=LOGSYNC_GIT_HASH={hash}");
    }
    if std::path::Path::new("..").join(".git").exists() {
        println!("cargo:rerun-if-changed=../.git/HEAD");
        println!("cargo:rerun-if-changed=../.git/refs");
    }
}
