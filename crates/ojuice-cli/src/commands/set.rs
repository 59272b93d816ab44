//! Set command: attach once, write a value through the mirror-aware path.

use anyhow::Result;

use ojuice_core::{AppConfig, FieldKey, NativeProvider, SyncEngine};

pub fn run(config: AppConfig, key: &str, value: i32) -> Result<()> {
    let key: FieldKey = key.parse()?;
    let mut engine = SyncEngine::new(NativeProvider, &config);

    engine.attach()?;
    engine.write_field(&key, value)?;
    println!("Wrote {} to {}", value, key);
    Ok(())
}
