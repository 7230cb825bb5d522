#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    use corridor_ngin::{CorridorConfig, flow};

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "corridor.toml".to_string());
    let config = CorridorConfig::load_or_default(path)?;
    flow::run(config)
}

// The web build starts from `run_web` in the library.
#[cfg(target_arch = "wasm32")]
fn main() {}
