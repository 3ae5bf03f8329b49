use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::net::UnixListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{HostError, Result};
use crate::host::ChannelHost;

/// Accepts Unix socket connections and serves each with a [`ChannelHost`].
///
/// The socket file is removed on drop if it is still the one this listener
/// created.
pub struct HostListener {
    listener: UnixListener,
    path: PathBuf,
    created_inode: (u64, u64),
    host: Arc<ChannelHost>,
}

impl HostListener {
    /// Default permission mode for created socket paths.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;
    /// `sockaddr_un.sun_path` capacity, including the trailing NUL.
    #[cfg(target_os = "linux")]
    pub const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    pub const MAX_PATH_LEN: usize = 104;

    /// Bind a filesystem-path Unix socket.
    ///
    /// A stale socket at `path` is removed first; any other existing file is
    /// left alone and reported as a bind error. Paths of
    /// [`MAX_PATH_LEN`](Self::MAX_PATH_LEN) bytes or more are refused before
    /// touching the filesystem. Must be called from within a tokio runtime.
    pub fn bind(path: impl AsRef<Path>, host: ChannelHost) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let len = path.as_os_str().len();
        if len >= Self::MAX_PATH_LEN {
            return Err(HostError::PathTooLong {
                path,
                len,
                max: Self::MAX_PATH_LEN,
            });
        }

        let bind_err = |source: std::io::Error| HostError::Bind {
            path: path.clone(),
            source,
        };

        if let Ok(metadata) = std::fs::symlink_metadata(&path) {
            if !metadata.file_type().is_socket() {
                return Err(bind_err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "existing path is not a unix socket",
                )));
            }
            debug!(?path, "removing stale socket");
            std::fs::remove_file(&path).map_err(bind_err)?;
        }

        let listener = UnixListener::bind(&path).map_err(bind_err)?;
        std::fs::set_permissions(
            &path,
            std::fs::Permissions::from_mode(Self::DEFAULT_SOCKET_MODE),
        )
        .map_err(bind_err)?;
        let created = std::fs::symlink_metadata(&path).map_err(bind_err)?;

        info!(?path, payloads = ?host.registry().payloads(), "listening on unix domain socket");

        Ok(Self {
            listener,
            created_inode: (created.dev(), created.ino()),
            path,
            host: Arc::new(host),
        })
    }

    /// Bound socket path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accept and serve connections until `shutdown` fires.
    ///
    /// Each connection runs on its own task with a child token, so shutdown
    /// reaches every session. Returns once all sessions have stopped.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let mut sessions = JoinSet::new();
        let mut next_session: u64 = 1;

        let result = loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break Ok(()),
                Some(joined) = sessions.join_next() => {
                    if let Err(err) = joined {
                        warn!(error = %err, "session task aborted");
                    }
                }
                accepted = self.listener.accept() => {
                    let (stream, _addr) = match accepted {
                        Ok(accepted) => accepted,
                        Err(err) => break Err(HostError::Accept(err)),
                    };
                    let id = next_session;
                    next_session += 1;
                    debug!(session = id, "accepted connection");

                    let host = Arc::clone(&self.host);
                    let token = shutdown.child_token();
                    sessions.spawn(async move {
                        match host.serve(stream, token).await {
                            Ok(()) => debug!(session = id, "session ended"),
                            Err(err) => warn!(session = id, error = %err, "session failed"),
                        }
                    });
                }
            }
        };

        shutdown.cancel();
        while sessions.join_next().await.is_some() {}
        result
    }
}

impl Drop for HostListener {
    fn drop(&mut self) {
        let still_ours = std::fs::symlink_metadata(&self.path)
            .map(|meta| (meta.dev(), meta.ino()) == self.created_inode)
            .unwrap_or(false);
        if still_ours {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
