//! Adapter selection shared by scanning, advertising and readiness checks
//!
//! `adapter_index` counts adapters ordered by their system name (`hci0`,
//! `hci1`, ...). btleplug and BlueZ enumerate adapters in their own order, so
//! every part of the driver resolves the index through here.

use crate::error::BleRadioError;

/// Pick the `index`-th adapter after ordering `adapters` by name
pub(crate) fn select_adapter<T>(
    mut adapters: Vec<(String, T)>,
    index: usize,
) -> Result<(String, T), BleRadioError> {
    adapters.sort_by(|a, b| a.0.cmp(&b.0));
    adapters
        .into_iter()
        .nth(index)
        .ok_or(BleRadioError::AdapterNotAvailable)
}

/// Open the BlueZ adapter at `index`
#[cfg(target_os = "linux")]
pub(crate) async fn open_bluez_adapter(
    session: &bluer::Session,
    index: usize,
) -> Result<bluer::Adapter, BleRadioError> {
    let names = session
        .adapter_names()
        .await
        .map_err(|e| BleRadioError::BlueZ(e.to_string()))?;
    let (name, ()) = select_adapter(names.into_iter().map(|n| (n, ())).collect(), index)?;

    session
        .adapter(&name)
        .map_err(|e| BleRadioError::BlueZ(format!("BLE adapter {}: {}", name, e)))
}
