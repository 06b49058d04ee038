use smb_core::SMBResult;

/// Authentication collaborator. The engine moves opaque tokens between
/// the server and this trait; token contents (SPNEGO, NTLM, Kerberos)
/// never concern the protocol layer.
pub trait AuthProvider: Send + Sync {
    /// Produce the next token for a session-setup leg. `server_token` is
    /// `None` on the first leg, afterwards the blob from the previous
    /// reply.
    fn next_token(&self, server_token: Option<&[u8]>) -> SMBResult<Vec<u8>>;
}

/// Anonymous/guest authentication: empty tokens on every leg.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnonymousAuth;

impl AuthProvider for AnonymousAuth {
    fn next_token(&self, _server_token: Option<&[u8]>) -> SMBResult<Vec<u8>> {
        Ok(Vec::new())
    }
}
