use anyhow::{Context, Result};

const DOCKERFILE: &str = include_str!("../Dockerfile");
const MANIFEST: &str = include_str!("../Cargo.toml");

fn minor_version(text: &str) -> Option<(u32, u32)> {
    let mut parts = text.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}

fn from_lines() -> Vec<&'static str> {
    DOCKERFILE
        .lines()
        .filter(|line| line.starts_with("FROM "))
        .collect()
}

#[test]
fn test_builder_image_meets_rust_version() -> Result<()> {
    let manifest: toml::Table = toml::from_str(MANIFEST)?;
    let rust_version = manifest["package"]["rust-version"]
        .as_str()
        .context("rust-version missing")?;
    let required = minor_version(rust_version).context("rust-version format")?;

    let builder = from_lines()
        .into_iter()
        .find(|line| line.ends_with("AS builder"))
        .context("builder stage missing")?;
    let tag = builder
        .split_whitespace()
        .nth(1)
        .and_then(|image| image.strip_prefix("rust:"))
        .context("builder is not a rust image")?;
    let image = minor_version(tag.split('-').next().unwrap_or("")).context("pinned rust tag")?;

    assert!(
        image >= required,
        "builder rust:{} is older than rust-version {}",
        tag,
        rust_version
    );
    Ok(())
}

#[test]
fn test_builder_and_runtime_share_debian_release() {
    let stages = from_lines();
    assert_eq!(stages.len(), 2);
    assert!(stages[0].contains("-bookworm"));
    assert!(stages[1].starts_with("FROM debian:bookworm"));
}

#[test]
fn test_runtime_contract() {
    assert!(DOCKERFILE.contains("curl"));
    assert!(DOCKERFILE.contains("\nUSER app\n"));
    assert!(DOCKERFILE.contains(
        "HEALTHCHECK --interval=30s --timeout=10s --start-period=5s --retries=3 \\\n    CMD norm-agent healthcheck || exit 1"
    ));
    assert!(DOCKERFILE.trim_end().ends_with("CMD [\"norm-agent\"]"));
}
