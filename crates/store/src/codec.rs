use platano_core::RegistrySnapshot;

use crate::StoreError;

/// Two-space indented JSON without a trailing newline, so ASCII documents
/// written by earlier versions of the bot round-trip byte for byte.
pub fn encode(snapshot: &RegistrySnapshot) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec_pretty(snapshot).map_err(|error| StoreError::Serialize(error.to_string()))
}

pub fn decode(bytes: &[u8]) -> Result<RegistrySnapshot, StoreError> {
    let snapshot: RegistrySnapshot =
        serde_json::from_slice(bytes).map_err(|error| StoreError::Corrupt(error.to_string()))?;
    snapshot.check_invariants().map_err(|error| StoreError::Corrupt(error.to_string()))?;
    Ok(snapshot)
}
