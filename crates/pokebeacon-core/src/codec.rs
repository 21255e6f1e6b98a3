//! Payload codec for advertisement frames
//!
//! A payload is a short application string (a creature name). It travels in two
//! redundant channels:
//!
//! - the advertisement local name, as `<prefix><payload>` (e.g. `Pokemon:Eevee`)
//! - optionally, manufacturer data: a 2-byte company id followed by the raw
//!   payload bytes
//!
//! Each character is mapped to a single byte by truncating its code point, so
//! characters above U+00FF do not survive the trip. That loss is part of the
//! wire format and is not corrected here.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::DecodeError;
use crate::radio::RawAdvertisement;

// ----------------------------------------------------------------------------
// Protocol Constants
// ----------------------------------------------------------------------------

/// Tag every protocol advertisement's local name starts with
pub const PROTOCOL_PREFIX: &str = "Pokemon:";

/// Company identifier reserved by the Bluetooth SIG for testing
pub const TEST_COMPANY_ID: u16 = 0xFFFF;

/// Practical local-name budget once advertisement framing is accounted for
pub const MAX_LOCAL_NAME_LEN: usize = 26;

// ----------------------------------------------------------------------------
// Encoded Advertisement
// ----------------------------------------------------------------------------

/// Manufacturer-specific data entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManufacturerData {
    pub company_id: u16,
    pub data: Vec<u8>,
}

/// Everything needed to broadcast one payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    /// Payload as an observer will decode it (after the one-byte mapping)
    pub payload: String,
    /// `<prefix><payload>`
    pub local_name: String,
    /// Alternate channel, present when a company id is configured
    pub manufacturer_data: Option<ManufacturerData>,
}

// ----------------------------------------------------------------------------
// Codec
// ----------------------------------------------------------------------------

/// Encodes payload names into advertisement fields and back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadCodec {
    prefix: String,
    company_id: Option<u16>,
    max_local_name_len: usize,
}

impl Default for PayloadCodec {
    fn default() -> Self {
        Self::new(PROTOCOL_PREFIX)
    }
}

impl PayloadCodec {
    /// Create a codec for the given prefix with no manufacturer channel
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            company_id: None,
            max_local_name_len: MAX_LOCAL_NAME_LEN,
        }
    }

    /// Also emit and check the manufacturer-data channel under `company_id`
    pub fn with_company_id(mut self, company_id: Option<u16>) -> Self {
        self.company_id = company_id;
        self
    }

    /// Local-name length above which a truncation warning is logged
    pub fn with_max_local_name_len(mut self, len: usize) -> Self {
        self.max_local_name_len = len;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn company_id(&self) -> Option<u16> {
        self.company_id
    }

    /// Encode a name into prefixed wire bytes
    ///
    /// Fails with [`DecodeError::EmptyPayload`] when the name is empty or only
    /// whitespace. The name itself is not trimmed.
    pub fn encode(&self, name: &str) -> Result<Vec<u8>, DecodeError> {
        let payload = checked_payload(name)?;
        let mut bytes = Vec::with_capacity(self.prefix.len() + payload.len());
        bytes.extend(to_byte_chars(&self.prefix));
        bytes.extend(payload);
        Ok(bytes)
    }

    /// Decode prefixed wire bytes back into the payload name
    pub fn decode(&self, bytes: &[u8]) -> Result<String, DecodeError> {
        let prefix: Vec<u8> = to_byte_chars(&self.prefix).collect();
        let rest = bytes
            .strip_prefix(prefix.as_slice())
            .ok_or_else(|| DecodeError::malformed("protocol prefix missing"))?;
        if rest.is_empty() {
            return Err(DecodeError::malformed("payload missing after prefix"));
        }
        Ok(from_byte_chars(rest))
    }

    /// Check whether an advertised local name belongs to this protocol
    pub fn matches(&self, local_name: &str) -> bool {
        local_name.starts_with(&self.prefix)
    }

    /// Decode the payload carried by an advertised local name
    pub fn decode_local_name(&self, local_name: &str) -> Result<String, DecodeError> {
        let bytes: Vec<u8> = to_byte_chars(local_name).collect();
        self.decode(&bytes)
    }

    /// Decode the payload carried in manufacturer data (company id stripped)
    pub fn decode_manufacturer_data(&self, data: &[u8]) -> Result<String, DecodeError> {
        if data.is_empty() {
            return Err(DecodeError::malformed("empty manufacturer data"));
        }
        Ok(from_byte_chars(data))
    }

    /// Build the local name and manufacturer data for a payload name
    pub fn encode_advertisement(&self, name: &str) -> Result<EncodedPayload, DecodeError> {
        let bytes = self.encode(name)?;
        let payload_bytes = &bytes[self.prefix.chars().count()..];
        let local_name = from_byte_chars(&bytes);
        let payload = from_byte_chars(payload_bytes);

        if local_name.len() > self.max_local_name_len {
            warn!(
                "Local name '{}' is {} bytes; drivers may truncate it beyond {}",
                local_name,
                local_name.len(),
                self.max_local_name_len
            );
        }

        let manufacturer_data = self.company_id.map(|company_id| ManufacturerData {
            company_id,
            data: payload_bytes.to_vec(),
        });

        Ok(EncodedPayload {
            payload,
            local_name,
            manufacturer_data,
        })
    }

    /// Decode the payload of a raw advertisement seen by the scanner
    ///
    /// The local name is required and must carry the prefix. When the
    /// manufacturer channel is configured and present it must agree with the
    /// name; a name that is a truncated form of the manufacturer payload is
    /// accepted and the longer manufacturer payload wins.
    pub fn decode_advertisement(&self, raw: &RawAdvertisement) -> Result<String, DecodeError> {
        let local_name = raw
            .local_name
            .as_deref()
            .ok_or_else(|| DecodeError::malformed("advertisement has no local name"))?;
        let from_name = self.decode_local_name(local_name)?;

        let Some(data) = self
            .company_id
            .and_then(|company_id| raw.manufacturer_data.get(&company_id))
        else {
            return Ok(from_name);
        };

        let from_data = self.decode_manufacturer_data(data)?;
        if from_data == from_name {
            Ok(from_name)
        } else if from_data.starts_with(&from_name) {
            Ok(from_data)
        } else {
            Err(DecodeError::malformed(format!(
                "local name payload '{}' disagrees with manufacturer payload '{}'",
                from_name, from_data
            )))
        }
    }
}

// ----------------------------------------------------------------------------
// Byte Mapping
// ----------------------------------------------------------------------------

fn checked_payload(name: &str) -> Result<Vec<u8>, DecodeError> {
    if name.trim().is_empty() {
        return Err(DecodeError::EmptyPayload);
    }
    Ok(to_byte_chars(name).collect())
}

/// One byte per character, code point truncated to 8 bits
fn to_byte_chars(s: &str) -> impl Iterator<Item = u8> + '_ {
    s.chars().map(|c| c as u32 as u8)
}

fn from_byte_chars(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::DeviceId;

    fn raw(name: Option<&str>, manufacturer: Option<(u16, &[u8])>) -> RawAdvertisement {
        let mut adv = RawAdvertisement::new(DeviceId::new("AA:BB:CC:DD:EE:01"));
        adv.local_name = name.map(str::to_string);
        if let Some((company_id, data)) = manufacturer {
            adv.manufacturer_data.insert(company_id, data.to_vec());
        }
        adv
    }

    #[test]
    fn test_encode_prefixes_name() {
        let codec = PayloadCodec::default();
        assert_eq!(codec.encode("Pikachu").unwrap(), b"Pokemon:Pikachu".to_vec());
    }

    #[test]
    fn test_empty_and_whitespace_names_rejected() {
        let codec = PayloadCodec::default();
        assert_eq!(codec.encode(""), Err(DecodeError::EmptyPayload));
        assert_eq!(codec.encode("  \t "), Err(DecodeError::EmptyPayload));
    }

    #[test]
    fn test_surrounding_whitespace_is_kept() {
        let codec = PayloadCodec::default();
        let bytes = codec.encode(" Mew ").unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), " Mew ");
    }

    #[test]
    fn test_decode_requires_prefix_and_payload() {
        let codec = PayloadCodec::default();
        assert!(matches!(
            codec.decode(b"Digimon:Agumon"),
            Err(DecodeError::MalformedPayload { .. })
        ));
        assert!(matches!(
            codec.decode(b"Pokemon:"),
            Err(DecodeError::MalformedPayload { .. })
        ));
        assert!(matches!(
            codec.decode(b""),
            Err(DecodeError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_wide_code_points_are_truncated() {
        let codec = PayloadCodec::default();
        // U+0141 (Ł) truncates to 0x41 ('A')
        let bytes = codec.encode("\u{141}bra").unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), "Abra");

        // Latin-1 survives
        let bytes = codec.encode("Flabébé").unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), "Flabébé");
    }

    #[test]
    fn test_encode_advertisement_channels() {
        let codec = PayloadCodec::default().with_company_id(Some(TEST_COMPANY_ID));
        let encoded = codec.encode_advertisement("Eevee").unwrap();
        assert_eq!(encoded.local_name, "Pokemon:Eevee");
        assert_eq!(encoded.payload, "Eevee");
        assert_eq!(
            encoded.manufacturer_data,
            Some(ManufacturerData {
                company_id: TEST_COMPANY_ID,
                data: b"Eevee".to_vec(),
            })
        );

        let name_only = PayloadCodec::default().encode_advertisement("Eevee").unwrap();
        assert!(name_only.manufacturer_data.is_none());
    }

    #[test]
    fn test_decode_advertisement_name_only() {
        let codec = PayloadCodec::default().with_company_id(Some(TEST_COMPANY_ID));
        let adv = raw(Some("Pokemon:Bulbasaur"), None);
        assert_eq!(codec.decode_advertisement(&adv).unwrap(), "Bulbasaur");
    }

    #[test]
    fn test_decode_advertisement_requires_name() {
        let codec = PayloadCodec::default().with_company_id(Some(TEST_COMPANY_ID));
        let adv = raw(None, Some((TEST_COMPANY_ID, b"Bulbasaur")));
        assert!(codec.decode_advertisement(&adv).is_err());
    }

    #[test]
    fn test_decode_advertisement_channels_must_agree() {
        let codec = PayloadCodec::default().with_company_id(Some(TEST_COMPANY_ID));

        let agree = raw(Some("Pokemon:Onix"), Some((TEST_COMPANY_ID, b"Onix")));
        assert_eq!(codec.decode_advertisement(&agree).unwrap(), "Onix");

        let disagree = raw(Some("Pokemon:Onix"), Some((TEST_COMPANY_ID, b"Steelix")));
        assert!(matches!(
            codec.decode_advertisement(&disagree),
            Err(DecodeError::MalformedPayload { .. })
        ));

        // Other company ids are not ours to interpret
        let foreign = raw(Some("Pokemon:Onix"), Some((0x004C, b"\x02\x15")));
        assert_eq!(codec.decode_advertisement(&foreign).unwrap(), "Onix");
    }

    #[test]
    fn test_truncated_name_defers_to_manufacturer_payload() {
        let codec = PayloadCodec::default().with_company_id(Some(TEST_COMPANY_ID));
        let adv = raw(
            Some("Pokemon:Crabomina"),
            Some((TEST_COMPANY_ID, b"Crabominable")),
        );
        assert_eq!(codec.decode_advertisement(&adv).unwrap(), "Crabominable");
    }

    #[test]
    fn test_custom_prefix() {
        let codec = PayloadCodec::new("Mon:");
        assert!(codec.matches("Mon:Zubat"));
        assert!(!codec.matches("Pokemon:Zubat"));
        assert_eq!(codec.decode_local_name("Mon:Zubat").unwrap(), "Zubat");
    }
}
