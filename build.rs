fn main() {
    // Reported by GET /health and the startup banner.
    let built = build_time().unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=TOKENGATE_BUILD_TIME={built}");
}

/// UTC build timestamp from `date`; `None` when the tool is unavailable.
fn build_time() -> Option<String> {
    let output = std::process::Command::new("date")
        .args(["-u", "+%Y-%m-%dT%H:%M:%SZ"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let stamp = String::from_utf8(output.stdout).ok()?;
    Some(stamp.trim().to_string())
}
