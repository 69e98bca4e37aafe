use rspstub_packet::{checksum, render};

use crate::cmd::ChecksumArgs;
use crate::exit::{CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_checksum, ChecksumOutput, OutputFormat};

pub fn run(args: ChecksumArgs, format: OutputFormat) -> CliResult<i32> {
    let out = frame(&args.body)?;
    print_checksum(&out, format);
    Ok(SUCCESS)
}

fn frame(body: &str) -> CliResult<ChecksumOutput> {
    if let Some(bad) = body.chars().find(|c| matches!(c, '$' | '#')) {
        return Err(CliError::new(
            USAGE,
            format!("packet body may not contain '{bad}'"),
        ));
    }

    let digits = render(checksum(body.as_bytes()));
    let checksum = String::from_utf8_lossy(&digits).into_owned();
    Ok(ChecksumOutput {
        body: body.to_string(),
        packet: format!("${body}#{checksum}"),
        checksum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_body() {
        let out = frame("qSupported").unwrap();
        assert_eq!(out.checksum, "37");
        assert_eq!(out.packet, "$qSupported#37");
    }

    #[test]
    fn empty_body() {
        assert_eq!(frame("").unwrap().packet, "$#00");
    }

    #[test]
    fn rejects_framing_characters() {
        let err = frame("a#b").unwrap_err();
        assert_eq!(err.code, USAGE);
        assert!(frame("$x").is_err());
    }
}
