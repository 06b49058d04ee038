use std::time::Duration;

use derive_builder::Builder;
use uuid::Uuid;

use crate::protocol::body::dialect::SMBDialect;

/// Client policy knobs. Everything the negotiation and pipelining layers
/// take as input that is not dictated by the server.
#[derive(Debug, Clone, Builder)]
#[builder(pattern = "owned")]
pub struct SMBClientConfig {
    /// Dialects offered in negotiate, best last. The server must pick
    /// from this set.
    #[builder(default = "vec![SMBDialect::V2_0_2, SMBDialect::V2_1_0]")]
    pub dialects: Vec<SMBDialect>,
    /// Refuse servers that cannot sign when set.
    #[builder(default = "false")]
    pub require_signing: bool,
    /// Start with the SMB1 probe and switch up once the server answers
    /// with the 2.?? wildcard. Needed against legacy-first deployments.
    #[builder(default = "true")]
    pub legacy_negotiate_probe: bool,
    /// Policy ceiling clamping server-offered read/write sizes.
    #[builder(default = "0x0080_0000")]
    pub size_ceiling: u32,
    /// Send-buffer bound clamping the transact size.
    #[builder(default = "0x0010_0000")]
    pub transport_send_buffer: u32,
    /// In-flight slots for pipelined reads.
    #[builder(default = "4")]
    pub read_window: usize,
    /// In-flight slots for pipelined writes.
    #[builder(default = "2")]
    pub write_window: usize,
    /// Credits asked for on every request, keeping the window fed.
    #[builder(default = "16")]
    pub desired_credits: u16,
    /// Per-operation timeout; a lapse cancels the request.
    #[builder(default = "None")]
    pub request_timeout: Option<Duration>,
    #[builder(default = "Uuid::new_v4()")]
    pub client_guid: Uuid,
}

impl Default for SMBClientConfig {
    fn default() -> Self {
        Self {
            dialects: vec![SMBDialect::V2_0_2, SMBDialect::V2_1_0],
            require_signing: false,
            legacy_negotiate_probe: true,
            size_ceiling: 0x0080_0000,
            transport_send_buffer: 0x0010_0000,
            read_window: 4,
            write_window: 2,
            desired_credits: 16,
            request_timeout: None,
            client_guid: Uuid::new_v4(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_default() {
        let built = SMBClientConfigBuilder::default().build().unwrap();
        assert_eq!(built.dialects, SMBClientConfig::default().dialects);
        assert_eq!(built.read_window, 4);
        assert_eq!(built.write_window, 2);
        assert!(built.legacy_negotiate_probe);
    }

    #[test]
    fn builder_overrides() {
        let built = SMBClientConfigBuilder::default()
            .dialects(vec![SMBDialect::V2_1_0])
            .require_signing(true)
            .read_window(8)
            .build()
            .unwrap();
        assert!(built.require_signing);
        assert_eq!(built.read_window, 8);
    }
}
