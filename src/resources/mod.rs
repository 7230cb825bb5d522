//! Loading of external files.
//!
//! Textures are fetched in the background so the frame loop never waits on
//! I/O: native builds read `./assets/` on the tokio runtime, the web build
//! fetches `<origin>/assets/` with reqwest. Results come back through an
//! unbounded channel that the frame loop drains once per tick.

use futures::{
    FutureExt, StreamExt,
    channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded},
};
use image::DynamicImage;

use crate::{
    data_structures::{material::MapKind, scene_graph::MaterialId},
    error::CorridorError,
};

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> Result<reqwest::Url, CorridorError> {
    let window =
        web_sys::window().ok_or_else(|| CorridorError::asset(file_name, "no browser window"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| CorridorError::asset(file_name, "page origin unavailable"))?;
    let base = reqwest::Url::parse(&format!("{origin}/assets/"))
        .map_err(|e| CorridorError::asset(file_name, e))?;
    base.join(file_name)
        .map_err(|e| CorridorError::asset(file_name, e))
}

/// Read an asset relative to the asset root.
pub async fn load_binary(file_name: &str) -> Result<Vec<u8>, CorridorError> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        let response = reqwest::get(url)
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| CorridorError::asset(file_name, e))?;
        response
            .bytes()
            .await
            .map_err(|e| CorridorError::asset(file_name, e))?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        tokio::fs::read(&path)
            .await
            .map_err(|e| CorridorError::asset(file_name, e))?
    };

    Ok(data)
}

pub fn decode_image(file_name: &str, bytes: &[u8]) -> Result<DynamicImage, CorridorError> {
    image::load_from_memory(bytes).map_err(|e| CorridorError::asset(file_name, e))
}

pub async fn load_image(file_name: &str) -> Result<DynamicImage, CorridorError> {
    let bytes = load_binary(file_name).await?;
    decode_image(file_name, &bytes)
}

/// Where a loaded texture goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetSlot {
    pub material: MaterialId,
    pub kind: MapKind,
}

#[derive(Debug)]
pub struct AssetEvent {
    pub slot: AssetSlot,
    pub path: String,
    pub result: Result<DynamicImage, CorridorError>,
}

/// Fire-and-forget texture loading.
#[derive(Debug)]
pub struct AssetLoader {
    sender: UnboundedSender<AssetEvent>,
    receiver: UnboundedReceiver<AssetEvent>,
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetLoader {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
        }
    }

    /// A sender for injecting results produced elsewhere (tests, embedders).
    pub fn sender(&self) -> UnboundedSender<AssetEvent> {
        self.sender.clone()
    }

    /// Start loading `path` into `slot` in the background.
    pub fn request(
        &self,
        #[cfg(not(target_arch = "wasm32"))] runtime: &tokio::runtime::Handle,
        slot: AssetSlot,
        path: String,
    ) {
        log::info!("Loading {path}");
        let sender = self.sender.clone();
        let task = async move {
            let result = load_image(&path).await;
            // The receiver only goes away with the loader itself.
            let _ = sender.unbounded_send(AssetEvent { slot, path, result });
        };
        #[cfg(not(target_arch = "wasm32"))]
        runtime.spawn(task);
        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(task);
    }

    /// Take one finished load without waiting.
    pub fn poll(&mut self) -> Option<AssetEvent> {
        self.receiver.next().now_or_never().flatten()
    }
}
