use rspstub_session::{supported_reply, SessionConfig};

use crate::cmd::FeaturesArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_features, FeaturesOutput, OutputFormat};

pub fn run(args: FeaturesArgs, format: OutputFormat) -> CliResult<i32> {
    let config = SessionConfig::default().with_max_body_len(args.max_packet);
    let out = FeaturesOutput {
        packet_size: config.packet.max_body_len,
        supported_reply: supported_reply(config.packet.max_body_len, &config.features),
        features: config.features,
    };

    print_features(&out, format);
    Ok(SUCCESS)
}
