pub mod diff;
pub mod export;
pub mod pull;

use anyhow::{bail, Result};

use crate::client::{ClientRegistry, ClientSpec};

/// Resolve a `--client` flag (`None`/`"all"` means every registered
/// client) into the list of clients a command should act on.
pub(crate) fn export_clients<'a>(
    registry: &'a ClientRegistry,
    requested: Option<&str>,
) -> Result<Vec<&'a ClientSpec>> {
    match requested {
        None | Some("all") => Ok(registry.all()),
        Some(id) => match registry.get(id) {
            Some(client) => Ok(vec![client]),
            None => bail!("unknown client {id:?}; known clients: {:?}", registry.ids()),
        },
    }
}
