use super::paths::{Browser, Scope};
use std::{io, path::Path};
use winreg::{
    enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE},
    RegKey,
};

fn root(scope: Scope) -> RegKey {
    match scope {
        Scope::User => RegKey::predef(HKEY_CURRENT_USER),
        Scope::System => RegKey::predef(HKEY_LOCAL_MACHINE),
    }
}

/// Point the browser's `NativeMessagingHosts\<name>` key at the manifest file.
pub fn write_manifest_key(
    browser: Browser,
    scope: Scope,
    name: &str,
    manifest: &Path,
) -> io::Result<()> {
    let (key, _) = root(scope).create_subkey(browser.registry_key(name))?;
    key.set_value("", &manifest.to_string_lossy().as_ref())?;
    Ok(())
}

/// Delete the key written by [`write_manifest_key`]. Missing keys are fine.
pub fn remove_manifest_key(browser: Browser, scope: Scope, name: &str) -> io::Result<()> {
    match root(scope).delete_subkey(browser.registry_key(name)) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
