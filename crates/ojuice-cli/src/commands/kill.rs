//! Kill command: attach and request OS termination of the game process.

use anyhow::Result;

use ojuice_core::{AppConfig, NativeProvider, SyncEngine};

pub fn run(config: AppConfig) -> Result<()> {
    let mut engine = SyncEngine::new(NativeProvider, &config);

    engine.attach()?;
    engine.terminate()?;
    println!("Terminated {}", config.process_name);
    Ok(())
}
