//! Transport configuration and credential callbacks.

use std::path::PathBuf;

use git2::{Cred, RemoteCallbacks};

/// Transport/credentials used for every networked operation.
#[derive(Debug, Clone, Default)]
pub struct TransportConfig {
    /// SSH private key for outbound transport. When unset, the ssh-agent is
    /// tried instead.
    pub ssh_key: Option<PathBuf>,
}

/// Caller-supplied sink for clone progress. Push-based, not a cancellation
/// channel.
pub trait ProgressSink {
    fn transfer(&mut self, received_objects: usize, total_objects: usize, received_bytes: usize);
}

/// Build remote callbacks with the standard credential chain:
/// configured key file, then ssh-agent, then git credential helper, then
/// default.
pub(crate) fn remote_callbacks<'cb>(
    config: Option<git2::Config>,
    transport: &TransportConfig,
    mut progress: Option<&'cb mut dyn ProgressSink>,
) -> RemoteCallbacks<'cb> {
    let ssh_key = transport.ssh_key.clone();
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |url, username_from_url, allowed| {
        if allowed.is_ssh_key() {
            let user = username_from_url.unwrap_or("git");
            if let Some(ref key) = ssh_key {
                return Cred::ssh_key(user, None, key, None);
            }
            return Cred::ssh_key_from_agent(user);
        }
        if allowed.is_user_pass_plaintext()
            && let Some(ref config) = config
            && let Ok(cred) = Cred::credential_helper(config, url, username_from_url)
        {
            return Ok(cred);
        }
        Cred::default()
    });
    if progress.is_some() {
        callbacks.transfer_progress(move |stats| {
            if let Some(sink) = progress.as_deref_mut() {
                sink.transfer(
                    stats.received_objects(),
                    stats.total_objects(),
                    stats.received_bytes(),
                );
            }
            true
        });
    }
    callbacks
}
