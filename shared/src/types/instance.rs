//! "GPU Engine" counter instance names
//!
//! PDH exposes one instance per device, engine and slot, for example
//! `pid_1234_luid_0x00000000_0x0000D1A5_phys_0_eng_0_engtype_3D`. Only two
//! fragments of the name carry meaning here: the second LUID token, which keys
//! the physical device, and the engine type following `engtype_`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Capture group 1 is the device token, `0x` included
const LUID_PATTERN: &str = r"luid_0x[0-9A-Fa-f]+_(0x[0-9A-Fa-f]+)";
const ENGINE_TYPE_MARKER: &str = "engtype_";

static LUID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(LUID_PATTERN).expect("valid regex"));

/// Device identifier taken from an instance name
///
/// Holds the second `0x`-prefixed LUID token exactly as it appears in the
/// name. It is only unique within the current boot session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex digits without the `0x` prefix
    pub fn hex_digits(&self) -> &str {
        self.0.strip_prefix("0x").unwrap_or(&self.0)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors parsing a user-supplied device identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceIdError {
    #[error("device id is empty")]
    Empty,

    #[error("device id {0:?} is not a hexadecimal token")]
    NotHex(String),
}

impl FromStr for DeviceId {
    type Err = DeviceIdError;

    /// Accepts `0x0000D1A5` as well as the bare `0000D1A5`; digit case is kept.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DeviceIdError::Empty);
        }

        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(DeviceIdError::NotHex(s.to_string()));
        }

        Ok(DeviceId(format!("0x{}", digits)))
    }
}

/// Outcome of decoding one instance name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedInstance {
    /// The name carries a device LUID
    Matched {
        device_id: DeviceId,
        /// Text after `engtype_`, when present
        engine_type: Option<String>,
    },

    /// Not a per-engine GPU instance; callers skip it
    Unrecognized,
}

impl DecodedInstance {
    pub fn device_id(&self) -> Option<&DeviceId> {
        match self {
            DecodedInstance::Matched { device_id, .. } => Some(device_id),
            DecodedInstance::Unrecognized => None,
        }
    }
}

/// Decode an instance name into its device identifier and engine type
///
/// The name is searched for the first `luid_0x<hex>_0x<hex>` run; the second
/// token becomes the device identifier. The first token is shared by every
/// device of a session and is not used as a key.
pub fn decode_instance(name: &str) -> DecodedInstance {
    let Some(device_id) = find_device_id(name) else {
        return DecodedInstance::Unrecognized;
    };

    let engine_type = name
        .find(ENGINE_TYPE_MARKER)
        .map(|idx| &name[idx + ENGINE_TYPE_MARKER.len()..])
        .filter(|ty| !ty.is_empty())
        .map(str::to_string);

    DecodedInstance::Matched {
        device_id,
        engine_type,
    }
}

fn find_device_id(name: &str) -> Option<DeviceId> {
    let caps = LUID_RE.captures(name)?;
    caps.get(1).map(|m| DeviceId(m.as_str().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(name: &str) -> (String, Option<String>) {
        match decode_instance(name) {
            DecodedInstance::Matched {
                device_id,
                engine_type,
            } => (device_id.to_string(), engine_type),
            DecodedInstance::Unrecognized => panic!("{} should decode", name),
        }
    }

    #[test]
    fn test_decode_typical_instance() {
        let (device, engine) =
            matched("pid_4242_luid_0x00000000_0x0000D1A5_phys_0_eng_0_engtype_3D");
        assert_eq!(device, "0x0000D1A5");
        assert_eq!(engine.as_deref(), Some("3D"));
    }

    #[test]
    fn test_device_id_preserves_case() {
        let (upper, _) = matched("luid_0x00000000_0x0000ABCD_phys_0_eng_1_engtype_Copy");
        let (lower, _) = matched("luid_0x00000000_0x0000abcd_phys_0_eng_1_engtype_Copy");
        assert_eq!(upper, "0x0000ABCD");
        assert_eq!(lower, "0x0000abcd");
        assert_ne!(upper, lower);
    }

    #[test]
    fn test_second_token_is_the_key() {
        let a = decode_instance("luid_0x00000001_0x0000BEEF_phys_0_eng_0_engtype_3D");
        let b = decode_instance("luid_0x00000002_0x0000BEEF_phys_0_eng_3_engtype_VideoDecode");
        assert_eq!(a.device_id(), b.device_id());
    }

    #[test]
    fn test_engine_type_with_spaces_and_missing() {
        let (_, engine) =
            matched("luid_0x00000000_0x00010A2B_phys_0_eng_5_engtype_Video Encode");
        assert_eq!(engine.as_deref(), Some("Video Encode"));

        let (_, engine) = matched("luid_0x00000000_0x00010A2B_phys_0");
        assert_eq!(engine, None);

        let (_, engine) = matched("luid_0x00000000_0x00010A2B_phys_0_engtype_");
        assert_eq!(engine, None);
    }

    #[test]
    fn test_unrecognized_shapes() {
        for name in [
            "",
            "_Total",
            "engtype_3D",
            "luid_0x_0x0000D1A5_engtype_3D",
            "luid_0x00000000_0x_engtype_3D",
            "luid_0x00000000_0000D1A5_engtype_3D",
            "luid_0xZZZZ_0x0000D1A5_engtype_3D",
            "LUID_0x00000000_0x0000D1A5_engtype_3D",
        ] {
            assert_eq!(decode_instance(name), DecodedInstance::Unrecognized, "{name:?}");
        }
    }

    #[test]
    fn test_later_luid_run_is_found() {
        let (device, _) = matched("luid_0xZZ_luid_0x00000000_0x00002222_phys_0_engtype_3D");
        assert_eq!(device, "0x00002222");
    }

    #[test]
    fn test_device_token_ends_at_first_non_hex() {
        let (device, engine) = matched("xluid_0x0_0x00AbZ9_engtype_Copy");
        assert_eq!(device, "0x00Ab");
        assert_eq!(engine.as_deref(), Some("Copy"));
    }

    #[test]
    fn test_parse_device_id() {
        let with_prefix: DeviceId = "0x0000D1A5".parse().unwrap();
        let bare: DeviceId = "0000D1A5".parse().unwrap();
        assert_eq!(with_prefix, bare);
        assert_eq!(bare.as_str(), "0x0000D1A5");
        assert_eq!(bare.hex_digits(), "0000D1A5");

        assert_eq!("".parse::<DeviceId>(), Err(DeviceIdError::Empty));
        assert!(matches!("0x".parse::<DeviceId>(), Err(DeviceIdError::NotHex(_))));
        assert!(matches!("gpu0".parse::<DeviceId>(), Err(DeviceIdError::NotHex(_))));
    }

    #[test]
    fn test_parsed_id_matches_decoded_id() {
        let decoded = decode_instance("luid_0x00000000_0x0000d1a5_phys_0_engtype_3D");
        let parsed: DeviceId = "d1a5".parse().unwrap();
        assert_ne!(decoded.device_id(), Some(&parsed));

        let parsed: DeviceId = "0000d1a5".parse().unwrap();
        assert_eq!(decoded.device_id(), Some(&parsed));
    }
}
