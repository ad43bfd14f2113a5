//! The reserved output channel the handshake is written to.

use std::io::Write;

use pw_protocol::HandshakeLine;

use crate::types::PluginError;

/// Owns the handshake channel until the handshake is emitted.
///
/// Constructed once by the process entry and handed to
/// [`Plugin::run`](crate::Plugin::run).  [`emit`](Self::emit) consumes the
/// context, so a second handshake cannot be written.
pub struct StartupContext {
    writer: Box<dyn Write + Send>,
}

impl StartupContext {
    /// Open the descriptor the host reserved for the handshake (fd 3).
    ///
    /// Fails if the descriptor is not open, which means the process was not
    /// launched by a host.
    #[cfg(unix)]
    pub fn from_reserved_fd() -> Result<Self, PluginError> {
        use std::os::fd::FromRawFd;

        use pw_protocol::HANDSHAKE_FD;

        let probe = format!("/dev/fd/{HANDSHAKE_FD}");
        std::fs::metadata(&probe).map_err(|e| {
            PluginError::config(format!(
                "must run as a managed plugin: handshake descriptor {HANDSHAKE_FD} is not open ({e})"
            ))
        })?;

        // SAFETY: the descriptor was checked to be open above and nothing
        // else in this process takes ownership of it.
        let file = unsafe { std::fs::File::from_raw_fd(HANDSHAKE_FD) };
        Ok(Self::with_writer(file))
    }

    /// Hosts without descriptor inheritance read the handshake on stdout.
    #[cfg(not(unix))]
    pub fn from_reserved_fd() -> Result<Self, PluginError> {
        Ok(Self::with_writer(std::io::stdout()))
    }

    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Box::new(writer),
        }
    }

    /// Write all five lines in one call and flush before returning.
    pub fn emit(mut self, line: &HandshakeLine) -> Result<(), PluginError> {
        let text = line.render();
        self.writer
            .write_all(text.as_bytes())
            .and_then(|()| self.writer.flush())
            .map_err(PluginError::Handshake)?;
        tracing::info!(
            address = %line.address.uri(),
            protocol = %line.protocol,
            version = %line.version,
            "handshake emitted"
        );
        Ok(())
    }
}

impl std::fmt::Debug for StartupContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartupContext").finish_non_exhaustive()
    }
}
