//! Protocol extensions advertised in the `qSupported` reply.

use serde::Serialize;

/// One protocol extension and whether this stub implements it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Feature {
    pub name: &'static str,
    pub enabled: bool,
}

impl Feature {
    pub const fn new(name: &'static str, enabled: bool) -> Self {
        Self { name, enabled }
    }
}

/// Extensions the stub knows about, in advertisement order.
///
/// All are disabled: there is no breakpoint handling, no multiprocess
/// support and no in-place instruction relocation.
pub const FEATURE_TABLE: &[Feature] = &[
    Feature::new("multiprocess", false),
    Feature::new("swbreak", false),
    Feature::new("hwbreak", false),
    Feature::new("qRelocInsn", false),
];

/// Build the `qSupported` reply body.
///
/// `PacketSize` is the body limit in hex, as the protocol expects. Enabled
/// features follow as `;name+`; disabled ones are left out, which the
/// debugger reads as unsupported.
pub fn supported_reply(max_body_len: usize, features: &[Feature]) -> String {
    let mut reply = format!("PacketSize={max_body_len:x}");
    for feature in features.iter().filter(|f| f.enabled) {
        reply.push(';');
        reply.push_str(feature.name);
        reply.push('+');
    }
    reply
}
