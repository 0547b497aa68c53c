use crate::{data_structures::texture::Texture, error::Result, resources::ResourceTracker};

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> Result<reqwest::Url> {
    use crate::error::ViewerError;

    let window = web_sys::window().ok_or_else(|| ViewerError::Dom("no window".to_string()))?;
    let origin = window
        .location()
        .origin()
        .map_err(|e| ViewerError::Dom(format!("{e:?}")))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))
        .map_err(|e| ViewerError::Dom(e.to_string()))?;
    base.join(file_name)
        .map_err(|e| ViewerError::Dom(e.to_string()))
}

/// Reads an asset: from `./assets` natively, relative to `<origin>/assets/` on the web.
pub async fn load_binary(file_name: &str) -> Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        use crate::error::ViewerError;

        let url = format_url(file_name)?;
        let fetch = |e: reqwest::Error| ViewerError::Io(std::io::Error::other(e.to_string()));
        reqwest::get(url)
            .await
            .map_err(fetch)?
            .bytes()
            .await
            .map_err(fetch)?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        std::fs::read(path)?
    };

    Ok(data)
}

/// Loads and decodes an image asset into a tracked [`Texture`].
pub async fn load_texture(
    file_name: &str,
    is_normal_map: bool,
    tracker: &ResourceTracker,
) -> Result<Texture> {
    let data = load_binary(file_name).await?;
    Texture::from_bytes(tracker, &data, file_name, None, is_normal_map)
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn missing_asset_is_an_io_error() {
        let tracker = ResourceTracker::new();
        let result = futures::executor::block_on(load_texture(
            "definitely/not/here.png",
            false,
            &tracker,
        ));
        assert!(matches!(result, Err(crate::error::ViewerError::Io(_))));
        assert_eq!(tracker.info().textures, 0);
    }
}
