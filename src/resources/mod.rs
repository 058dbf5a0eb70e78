//! Everything that produces scene resources: the heart mesh, neon text
//! canvases, the sprite texture cache and the asset loader.

use anyhow::Context as _;

pub mod cache;
pub mod heart;
pub mod text;

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().context("no global window")?;
    let origin = window
        .location()
        .origin()
        .map_err(|e| anyhow::anyhow!("failed to read page origin: {e:?}"))?;
    let base = reqwest::Url::parse(&format!("{origin}/assets/"))?;
    Ok(base.join(file_name)?)
}

/// Read an asset: from `./assets` natively, relative to the page origin in the browser.
pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url.clone())
            .await
            .and_then(|response| response.error_for_status())
            .with_context(|| format!("failed to fetch {url}"))?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?
    };

    Ok(data)
}

/// Load and parse the label font.
pub async fn load_font(file_name: &str) -> anyhow::Result<text::NeonFont> {
    let bytes = load_binary(file_name).await?;
    text::NeonFont::from_bytes(&bytes).with_context(|| format!("{file_name} is not a usable font"))
}

/// Load the label font, falling back to the embedded face when it is unavailable.
pub async fn load_font_or_fallback(file_name: &str) -> anyhow::Result<text::NeonFont> {
    match load_font(file_name).await {
        Ok(font) => {
            log::info!("loaded font {file_name}");
            Ok(font)
        }
        Err(e) => {
            log::warn!("{e:#}, using the embedded fallback face");
            text::NeonFont::fallback()
        }
    }
}
