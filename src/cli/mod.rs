//! CLI flags for ragchew using clap.

use clap::Parser;

/// ragchew - keyboard-to-keyboard group chat over a radio link.
#[derive(Parser, Debug, Clone)]
#[command(name = "ragchew")]
#[command(version)]
#[command(about = "Group chat for point-to-point digital radio links", long_about = None)]
pub struct Args {
    /// Serial device the modem is attached to
    #[arg(long, env = "RAGCHEW_DEVICE", default_value = "/dev/ttyUSB0")]
    pub device: String,

    /// Serial baud rate
    #[arg(long, default_value_t = 9600)]
    pub baud: u32,

    /// Station callsign
    #[arg(long, env = "RAGCHEW_CALLSIGN", default_value = "N0CALL")]
    pub callsign: String,

    /// Group to join at startup
    #[arg(long, default_value = "@CQ")]
    pub group: String,

    /// Use a simulated modem instead of serial hardware
    #[arg(long)]
    pub fake: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["ragchew"]);

        assert_eq!(args.device, "/dev/ttyUSB0");
        assert_eq!(args.baud, 9600);
        assert_eq!(args.callsign, "N0CALL");
        assert_eq!(args.group, "@CQ");
        assert!(!args.fake);
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from([
            "ragchew",
            "--callsign",
            "KD7ABC",
            "--group",
            "Radio",
            "--fake",
        ]);

        assert_eq!(args.callsign, "KD7ABC");
        assert_eq!(args.group, "Radio");
        assert!(args.fake);
    }
}
