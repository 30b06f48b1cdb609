//! Saving rendered memes to disk.

use std::path::{Path, PathBuf};

/// Resolve where to save `image_url`.
///
/// A directory (existing, or given with a trailing separator) receives the
/// image under its remote file name.
pub fn resolve_destination(target: &Path, image_url: &str) -> PathBuf {
    let looks_like_dir = target.is_dir() || target.as_os_str().to_string_lossy().ends_with('/');
    if !looks_like_dir {
        return target.to_path_buf();
    }
    let file_name = image_url
        .split(['?', '#'])
        .next()
        .and_then(|u| u.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .unwrap_or("meme.jpg");
    target.join(file_name)
}

/// Stream `url` into `dest`, creating parent directories as needed.
pub async fn download_file(client: &reqwest::Client, url: &str, dest: &Path) -> anyhow::Result<()> {
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    let response = client
        .get(url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| anyhow::anyhow!("Download failed: {e}"))?;

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
    }
    file.flush().await?;

    tracing::info!("Saved {:.1} KB to {}", downloaded as f64 / 1024.0, dest.display());
    Ok(())
}
