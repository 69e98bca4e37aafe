use rspstub_packet::PacketConfig;

use crate::features::{Feature, FEATURE_TABLE};

/// Configuration for one debugger session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Framing limits and stream timeouts.
    pub packet: PacketConfig,
    /// Feature table consulted for `qSupported`.
    pub features: Vec<Feature>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            packet: PacketConfig::default(),
            features: FEATURE_TABLE.to_vec(),
        }
    }
}

impl SessionConfig {
    /// Override the maximum packet body length.
    pub fn with_max_body_len(mut self, max_body_len: usize) -> Self {
        self.packet.max_body_len = max_body_len;
        self
    }

    /// Override the feature table.
    pub fn with_features(mut self, features: &[Feature]) -> Self {
        self.features = features.to_vec();
        self
    }
}
