//! Device models and the read-only commands issued to them.
//!
//! The 1408A and 2406 share the `show remote ont …` command family; the
//! MSC1240XA nests everything under `show interface …` and addresses ONTs by
//! a bare AID (`1-1-10`, no `ont-` prefix).

use crate::codec::StreamCodec;
use crate::config::ConfigProfile;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported OLT models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceModel {
    /// OLT1408A (line feed terminated input, no resync).
    #[serde(rename = "1408A", alias = "olt1408a")]
    Olt1408A,
    /// OLT2406.
    #[serde(rename = "2406", alias = "olt2406")]
    Olt2406,
    /// MSC1240XA chassis.
    #[serde(rename = "1240XA", alias = "msc1240xa")]
    Msc1240XA,
}

impl DeviceModel {
    pub const ALL: [DeviceModel; 3] = [
        DeviceModel::Olt1408A,
        DeviceModel::Olt2406,
        DeviceModel::Msc1240XA,
    ];

    /// Short model name, as used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceModel::Olt1408A => "1408A",
            DeviceModel::Olt2406 => "2406",
            DeviceModel::Msc1240XA => "1240XA",
        }
    }

    /// Factory prompt of the privileged console.
    pub fn default_prompt(&self) -> &'static str {
        match self {
            DeviceModel::Olt1408A => "OLT1408A#",
            DeviceModel::Olt2406 => "OLT2406#",
            DeviceModel::Msc1240XA => "MSC1240XA#",
        }
    }

    /// Marker printed before the username is expected.
    pub fn username_prompt(&self) -> &'static str {
        match self {
            DeviceModel::Msc1240XA => "login:",
            DeviceModel::Olt1408A | DeviceModel::Olt2406 => "User name:",
        }
    }

    /// Marker printed before the password is expected.
    pub fn password_prompt(&self) -> &'static str {
        "Password:"
    }

    /// Line terminator the console expects.
    pub fn eol(&self) -> &'static str {
        match self {
            DeviceModel::Olt1408A => "\n",
            DeviceModel::Olt2406 | DeviceModel::Msc1240XA => "\r\n",
        }
    }

    /// Whether to realign on the prompt before every command.
    pub fn resync_before_command(&self) -> bool {
        !matches!(self, DeviceModel::Olt1408A)
    }

    /// Whether the ONT listing carries DDMI receive power.
    pub fn supports_ddmi(&self) -> bool {
        matches!(self, DeviceModel::Msc1240XA)
    }

    /// Config block dialect of this model.
    pub fn config_profile(&self) -> ConfigProfile {
        match self {
            DeviceModel::Olt1408A => ConfigProfile::REMAINDER,
            DeviceModel::Olt2406 => ConfigProfile::PREFIXED,
            DeviceModel::Msc1240XA => ConfigProfile::AID_RELATIVE,
        }
    }

    /// Bring a caller supplied AID into the form the console accepts.
    pub fn normalize_aid(&self, aid: &str) -> String {
        let aid = aid.trim();
        match self {
            DeviceModel::Msc1240XA => aid.strip_prefix("ont-").unwrap_or(aid).to_string(),
            DeviceModel::Olt1408A | DeviceModel::Olt2406 => aid.to_string(),
        }
    }
}

impl fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let key = upper
            .strip_prefix("OLT")
            .or_else(|| upper.strip_prefix("MSC"))
            .unwrap_or(upper.as_str());
        match key {
            "1408A" => Ok(DeviceModel::Olt1408A),
            "2406" => Ok(DeviceModel::Olt2406),
            "1240XA" => Ok(DeviceModel::Msc1240XA),
            _ => Err(format!("unknown OLT model: {s}")),
        }
    }
}

/// Read-only commands understood by the OLT consoles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List every registered ONT.
    ListOnts,
    /// List ONTs seen on a PON but not provisioned.
    ListUnregistered,
    /// Operational details of one ONT.
    OntStatus { aid: String },
    /// Running configuration of one ONT.
    OntConfig { aid: String },
    /// Link state transitions of one ONT.
    OntStatusHistory { aid: String },
    /// DDMI readings for a GPON port range (1240XA only).
    DdmiStatus { range: String },
    /// Leave the console.
    Exit,
}

impl Command {
    /// DDMI query over every GPON port.
    pub fn ddmi_all() -> Command {
        Command::DdmiStatus {
            range: "1-*".to_string(),
        }
    }

    /// Get the command string for the given model.
    pub fn to_command_string(&self, model: DeviceModel) -> String {
        let interface = matches!(model, DeviceModel::Msc1240XA);
        match self {
            Command::ListOnts if interface => "show interface remote ont filter 1".to_string(),
            Command::ListOnts => "show remote ont".to_string(),
            Command::ListUnregistered if interface => "show interface remote ont unreg".to_string(),
            Command::ListUnregistered => "show remote ont unreg".to_string(),
            Command::OntStatus { aid } if interface => {
                format!("show interface remote ont {} status", model.normalize_aid(aid))
            }
            Command::OntStatus { aid } => format!("show remote ont {}", model.normalize_aid(aid)),
            Command::OntConfig { aid } if interface => {
                format!("show interface remote ont {} config", model.normalize_aid(aid))
            }
            Command::OntConfig { aid } => {
                format!("show remote ont {} config", model.normalize_aid(aid))
            }
            Command::OntStatusHistory { aid } if interface => format!(
                "show interface remote ont {} status-history",
                model.normalize_aid(aid)
            ),
            Command::OntStatusHistory { aid } => {
                format!("show remote ont {} status-history", model.normalize_aid(aid))
            }
            Command::DdmiStatus { range } => format!("show interface gpon {} ddmi status", range),
            Command::Exit => "exit".to_string(),
        }
    }

    /// Encode the command for transmission, terminated with the model's EOL.
    pub fn encode(&self, model: DeviceModel) -> Vec<u8> {
        StreamCodec::encode_line(&self.to_command_string(model), model.eol().as_bytes())
    }

    /// Whether the command can take minutes to answer.
    pub fn is_long_running(&self) -> bool {
        matches!(self, Command::DdmiStatus { .. })
    }
}
