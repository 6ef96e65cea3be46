//! Concrete TLV realization of the Interest/Data/SignedInfo/ForwardingEntry
//! wire contract (§6, §3.2-3.9). Grounded on the teacher's `src/packet.rs`
//! field layout and `tlv.rs`'s decode-loop shape, but carries the
//! historical-source selector set (`min_suffix_components`, `exclude`,
//! `child_selector`, `answer_origin_kind`, `scope`) instead of NDN-TLV-2022
//! fields, since that is what the specification's Interest/ForwardingEntry
//! model describes.
//!
//! Everything above this module talks only to `Interest`/`Data`/
//! `ForwardingEntry` and `encode_*`/`decode_*`; a forwarder speaking a
//! different byte layout can be supported by replacing this module alone.

use crate::name::Name;
use crate::tlv::{write_tlv, DecodingError, Encode, TLV};

// Top-level element types.
const T_INTEREST: u32 = 1;
const T_DATA: u32 = 2;

// Name.
const T_NAME: u32 = 3;
const T_NAME_COMPONENT: u32 = 4;

// Interest fields.
const T_SELECTORS: u32 = 5;
const T_MIN_SUFFIX_COMPONENTS: u32 = 6;
const T_MAX_SUFFIX_COMPONENTS: u32 = 7;
const T_PUBLISHER_PUBLIC_KEY_DIGEST: u32 = 8;
const T_EXCLUDE: u32 = 9;
const T_CHILD_SELECTOR: u32 = 10;
const T_ANSWER_ORIGIN_KIND: u32 = 11;
const T_SCOPE: u32 = 12;
const T_INTEREST_LIFETIME: u32 = 13;
const T_NONCE: u32 = 14;

// Data fields.
const T_CONTENT: u32 = 15;
const T_SIGNED_INFO: u32 = 16;
const T_SIGNATURE_VALUE: u32 = 17;
const T_KEY_LOCATOR: u32 = 18;
const T_KEY_NAME: u32 = 19;
const T_KEY: u32 = 20;
const T_CERTIFICATE: u32 = 21;
const T_TIMESTAMP: u32 = 22;
const T_CONTENT_TYPE: u32 = 23;
const T_FRESHNESS_SECONDS: u32 = 24;
const T_SIGNATURE_TYPE: u32 = 25;
const T_WITNESS: u32 = 30;

// ForwardingEntry fields.
const T_FORWARDING_ENTRY: u32 = 26;
const T_ACTION: u32 = 27;
const T_FLAGS: u32 = 28;
const T_FE_LIFETIME: u32 = 29;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    Tlv(DecodingError),
    UnexpectedType { expected: u32, found: u32 },
    MissingField(&'static str),
    InvalidValue(&'static str),
}

impl From<DecodingError> for CodecError {
    fn from(err: DecodingError) -> Self {
        CodecError::Tlv(err)
    }
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::Tlv(e) => write!(f, "malformed TLV: {:?}", e),
            CodecError::UnexpectedType { expected, found } => {
                write!(f, "expected TLV type {expected}, found {found}")
            }
            CodecError::MissingField(name) => write!(f, "missing field: {name}"),
            CodecError::InvalidValue(name) => write!(f, "invalid value for field: {name}"),
        }
    }
}

impl std::error::Error for CodecError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureType {
    DigestSha256,
    SignatureSha256WithRsa,
    SignatureSha256WithEcdsa,
    SignatureHmacWithSha256,
    SignatureEd25519,
    Other(u64),
}

impl From<u64> for SignatureType {
    fn from(v: u64) -> Self {
        match v {
            0 => SignatureType::DigestSha256,
            1 => SignatureType::SignatureSha256WithRsa,
            3 => SignatureType::SignatureSha256WithEcdsa,
            4 => SignatureType::SignatureHmacWithSha256,
            5 => SignatureType::SignatureEd25519,
            other => SignatureType::Other(other),
        }
    }
}

impl From<SignatureType> for u64 {
    fn from(t: SignatureType) -> u64 {
        match t {
            SignatureType::DigestSha256 => 0,
            SignatureType::SignatureSha256WithRsa => 1,
            SignatureType::SignatureSha256WithEcdsa => 3,
            SignatureType::SignatureHmacWithSha256 => 4,
            SignatureType::SignatureEd25519 => 5,
            SignatureType::Other(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyLocator {
    KeyName(Name),
    Key(Vec<u8>),
    Cert(Vec<u8>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedInfo {
    pub key_locator: Option<KeyLocator>,
    pub publisher_public_key_digest: Option<Vec<u8>>,
    pub timestamp_ms: Option<u64>,
    pub content_type: u32,
    pub freshness_seconds: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interest {
    pub name: Name,
    pub min_suffix_components: Option<u32>,
    pub max_suffix_components: Option<u32>,
    pub publisher_public_key_digest: Option<Vec<u8>>,
    pub exclude: Option<Vec<u8>>,
    pub child_selector: Option<u8>,
    pub answer_origin_kind: Option<u8>,
    pub scope: Option<u8>,
    pub nonce: Option<[u8; 4]>,
    pub interest_lifetime_ms: u32,
}

impl Interest {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            min_suffix_components: None,
            max_suffix_components: None,
            publisher_public_key_digest: None,
            exclude: None,
            child_selector: None,
            answer_origin_kind: None,
            scope: None,
            nonce: None,
            interest_lifetime_ms: 4000,
        }
    }

    /// True iff the Interest's name is a prefix of `n`. Selector semantics
    /// beyond the name prefix (exclude, child selector, ...) are this
    /// codec's contract to preserve on the wire, not the matcher's concern
    /// (§3.2): a CST/PIT that wants selector-aware matching composes this
    /// with its own selector checks.
    pub fn matches_name(&self, n: &Name) -> bool {
        self.name.is_prefix_of(n)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    pub name: Name,
    pub content: Vec<u8>,
    pub signed_info: SignedInfo,
    pub signature_type: SignatureType,
    pub signature: Vec<u8>,
    /// Historical-source witness (e.g. a Merkle hash tree witness for a
    /// batch-signed block). This implementation never produces one and
    /// cannot verify one, so its mere presence on an inbound Data is
    /// treated as unsupported (§4.4/§9): `verify_flow::decide` rejects it
    /// as `ContentBad` before it ever reaches the key-locator dispatch.
    pub witness: Option<Vec<u8>>,
}

impl Data {
    /// The bytes the signature is computed over: the Name, SignedInfo and
    /// Content TLVs, in wire order, excluding the signature fields
    /// themselves. Used identically when signing (before the signature is
    /// known) and when verifying (reconstructed from a decoded `Data`).
    pub fn signed_portion(&self) -> Vec<u8> {
        encode_signed_part(&self.name, &self.signed_info, &self.content)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardingEntry {
    pub action: &'static str,
    pub name: Name,
    pub flags: u32,
    pub lifetime_ms: i64,
}

impl ForwardingEntry {
    pub fn selfreg(name: Name, flags: u32) -> Self {
        Self { action: "selfreg", name, flags: flags | 3, lifetime_ms: 2147483647 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Interest(Interest),
    Data(Data),
    Unknown(u32),
}

fn encode_name_into(name: &Name, out: &mut Vec<u8>) {
    let mut inner = Vec::new();
    for component in name.components() {
        write_tlv(T_NAME_COMPONENT, component, &mut inner);
    }
    write_tlv(T_NAME, &inner, out);
}

fn decode_name(val: &[u8]) -> Result<Name, CodecError> {
    let mut components = Vec::new();
    let mut cursor = 0;
    while cursor < val.len() {
        let (tlv, consumed) = TLV::try_decode(&val[cursor..])?;
        if tlv.typ.get() != T_NAME_COMPONENT {
            return Err(CodecError::UnexpectedType { expected: T_NAME_COMPONENT, found: tlv.typ.get() });
        }
        components.push(tlv.val.to_vec());
        cursor += consumed;
    }
    Ok(Name::from_components(components))
}

fn take_name_tlv(bytes: &[u8]) -> Result<(Name, usize), CodecError> {
    let (tlv, consumed) = TLV::try_decode(bytes)?;
    if tlv.typ.get() != T_NAME {
        return Err(CodecError::UnexpectedType { expected: T_NAME, found: tlv.typ.get() });
    }
    Ok((decode_name(tlv.val)?, consumed))
}

fn encode_key_locator_into(locator: &KeyLocator, out: &mut Vec<u8>) {
    let mut inner = Vec::new();
    match locator {
        KeyLocator::KeyName(name) => encode_name_into(name, &mut inner),
        KeyLocator::Key(bytes) => write_tlv(T_KEY, bytes, &mut inner),
        KeyLocator::Cert(bytes) => write_tlv(T_CERTIFICATE, bytes, &mut inner),
    }
    write_tlv(T_KEY_LOCATOR, &inner, out);
}

fn decode_key_locator(val: &[u8]) -> Result<KeyLocator, CodecError> {
    let (tlv, _) = TLV::try_decode(val)?;
    match tlv.typ.get() {
        T_NAME => Ok(KeyLocator::KeyName(decode_name(tlv.val)?)),
        T_KEY => Ok(KeyLocator::Key(tlv.val.to_vec())),
        T_CERTIFICATE => Ok(KeyLocator::Cert(tlv.val.to_vec())),
        other => Err(CodecError::UnexpectedType { expected: T_KEY_LOCATOR, found: other }),
    }
}

fn encode_signed_info_into(info: &SignedInfo, out: &mut Vec<u8>) {
    let mut inner = Vec::new();
    if let Some(digest) = &info.publisher_public_key_digest {
        write_tlv(T_PUBLISHER_PUBLIC_KEY_DIGEST, digest, &mut inner);
    }
    if let Some(ts) = info.timestamp_ms {
        let mut buf = Vec::new();
        ts.encode(&mut buf);
        write_tlv(T_TIMESTAMP, &buf, &mut inner);
    }
    let mut ct_buf = Vec::new();
    (info.content_type as u64).encode(&mut ct_buf);
    write_tlv(T_CONTENT_TYPE, &ct_buf, &mut inner);
    if let Some(freshness) = info.freshness_seconds {
        let mut buf = Vec::new();
        (freshness as u64).encode(&mut buf);
        write_tlv(T_FRESHNESS_SECONDS, &buf, &mut inner);
    }
    if let Some(locator) = &info.key_locator {
        encode_key_locator_into(locator, &mut inner);
    }
    write_tlv(T_SIGNED_INFO, &inner, out);
}

fn decode_signed_info(val: &[u8]) -> Result<SignedInfo, CodecError> {
    let mut info = SignedInfo::default();
    let mut cursor = 0;
    while cursor < val.len() {
        let (tlv, consumed) = TLV::try_decode(&val[cursor..])?;
        match tlv.typ.get() {
            T_PUBLISHER_PUBLIC_KEY_DIGEST => info.publisher_public_key_digest = Some(tlv.val.to_vec()),
            T_TIMESTAMP => {
                info.timestamp_ms = Some(
                    tlv.val_as_u64().ok_or(CodecError::InvalidValue("timestamp_ms"))?,
                )
            }
            T_CONTENT_TYPE => {
                info.content_type = tlv
                    .val_as_u64()
                    .ok_or(CodecError::InvalidValue("content_type"))?
                    .try_into()
                    .map_err(|_| CodecError::InvalidValue("content_type"))?
            }
            T_FRESHNESS_SECONDS => {
                info.freshness_seconds = Some(
                    tlv.val_as_u64()
                        .ok_or(CodecError::InvalidValue("freshness_seconds"))?
                        .try_into()
                        .map_err(|_| CodecError::InvalidValue("freshness_seconds"))?,
                )
            }
            T_KEY_LOCATOR => info.key_locator = Some(decode_key_locator(tlv.val)?),
            _ => {}
        }
        cursor += consumed;
    }
    Ok(info)
}

/// Encodes the Name + SignedInfo + Content TLVs in wire order. This is both
/// the signed portion of a Data packet and (with `signature_type`/
/// `signature` appended) the full Data body.
fn encode_signed_part(name: &Name, signed_info: &SignedInfo, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    encode_name_into(name, &mut out);
    encode_signed_info_into(signed_info, &mut out);
    write_tlv(T_CONTENT, content, &mut out);
    out
}

pub fn encode_interest(interest: &Interest) -> Vec<u8> {
    let mut body = Vec::new();
    encode_name_into(&interest.name, &mut body);

    let mut selectors = Vec::new();
    if let Some(v) = interest.min_suffix_components {
        let mut buf = Vec::new();
        (v as u64).encode(&mut buf);
        write_tlv(T_MIN_SUFFIX_COMPONENTS, &buf, &mut selectors);
    }
    if let Some(v) = interest.max_suffix_components {
        let mut buf = Vec::new();
        (v as u64).encode(&mut buf);
        write_tlv(T_MAX_SUFFIX_COMPONENTS, &buf, &mut selectors);
    }
    if let Some(digest) = &interest.publisher_public_key_digest {
        write_tlv(T_PUBLISHER_PUBLIC_KEY_DIGEST, digest, &mut selectors);
    }
    if let Some(exclude) = &interest.exclude {
        write_tlv(T_EXCLUDE, exclude, &mut selectors);
    }
    if let Some(v) = interest.child_selector {
        write_tlv(T_CHILD_SELECTOR, &[v], &mut selectors);
    }
    if let Some(v) = interest.answer_origin_kind {
        write_tlv(T_ANSWER_ORIGIN_KIND, &[v], &mut selectors);
    }
    if let Some(v) = interest.scope {
        write_tlv(T_SCOPE, &[v], &mut selectors);
    }
    if !selectors.is_empty() {
        write_tlv(T_SELECTORS, &selectors, &mut body);
    }

    if let Some(nonce) = interest.nonce {
        write_tlv(T_NONCE, &nonce, &mut body);
    }

    let mut lifetime_buf = Vec::new();
    (interest.interest_lifetime_ms as u64).encode(&mut lifetime_buf);
    write_tlv(T_INTEREST_LIFETIME, &lifetime_buf, &mut body);

    let mut out = Vec::new();
    write_tlv(T_INTEREST, &body, &mut out);
    out
}

fn decode_interest_body(val: &[u8]) -> Result<Interest, CodecError> {
    let (name, name_len) = take_name_tlv(val)?;
    let mut interest = Interest::new(name);
    let mut cursor = name_len;
    while cursor < val.len() {
        let (tlv, consumed) = TLV::try_decode(&val[cursor..])?;
        match tlv.typ.get() {
            T_SELECTORS => decode_selectors_into(tlv.val, &mut interest)?,
            T_NONCE => {
                interest.nonce =
                    Some(tlv.val.try_into().map_err(|_| CodecError::InvalidValue("nonce"))?)
            }
            T_INTEREST_LIFETIME => {
                interest.interest_lifetime_ms = tlv
                    .val_as_u64()
                    .ok_or(CodecError::InvalidValue("interest_lifetime_ms"))?
                    .try_into()
                    .map_err(|_| CodecError::InvalidValue("interest_lifetime_ms"))?
            }
            _ => {}
        }
        cursor += consumed;
    }
    Ok(interest)
}

fn decode_selectors_into(val: &[u8], interest: &mut Interest) -> Result<(), CodecError> {
    let mut cursor = 0;
    while cursor < val.len() {
        let (tlv, consumed) = TLV::try_decode(&val[cursor..])?;
        match tlv.typ.get() {
            T_MIN_SUFFIX_COMPONENTS => {
                interest.min_suffix_components = Some(
                    tlv.val_as_u64()
                        .ok_or(CodecError::InvalidValue("min_suffix_components"))?
                        .try_into()
                        .map_err(|_| CodecError::InvalidValue("min_suffix_components"))?,
                )
            }
            T_MAX_SUFFIX_COMPONENTS => {
                interest.max_suffix_components = Some(
                    tlv.val_as_u64()
                        .ok_or(CodecError::InvalidValue("max_suffix_components"))?
                        .try_into()
                        .map_err(|_| CodecError::InvalidValue("max_suffix_components"))?,
                )
            }
            T_PUBLISHER_PUBLIC_KEY_DIGEST => {
                interest.publisher_public_key_digest = Some(tlv.val.to_vec())
            }
            T_EXCLUDE => interest.exclude = Some(tlv.val.to_vec()),
            T_CHILD_SELECTOR => {
                interest.child_selector = Some(*tlv.val.first().ok_or(CodecError::InvalidValue("child_selector"))?)
            }
            T_ANSWER_ORIGIN_KIND => {
                interest.answer_origin_kind =
                    Some(*tlv.val.first().ok_or(CodecError::InvalidValue("answer_origin_kind"))?)
            }
            T_SCOPE => {
                interest.scope = Some(*tlv.val.first().ok_or(CodecError::InvalidValue("scope"))?)
            }
            _ => {}
        }
        cursor += consumed;
    }
    Ok(())
}

pub fn encode_data(data: &Data) -> Vec<u8> {
    let mut body = encode_signed_part(&data.name, &data.signed_info, &data.content);

    let mut st_buf = Vec::new();
    (u64::from(data.signature_type)).encode(&mut st_buf);
    write_tlv(T_SIGNATURE_TYPE, &st_buf, &mut body);
    if let Some(witness) = &data.witness {
        write_tlv(T_WITNESS, witness, &mut body);
    }
    write_tlv(T_SIGNATURE_VALUE, &data.signature, &mut body);

    let mut out = Vec::new();
    write_tlv(T_DATA, &body, &mut out);
    out
}

fn decode_data_body(val: &[u8]) -> Result<Data, CodecError> {
    let (name, name_len) = take_name_tlv(val)?;
    let mut cursor = name_len;

    let mut signed_info = None;
    let mut content = None;
    let mut signature_type = SignatureType::DigestSha256;
    let mut signature = None;
    let mut witness = None;

    while cursor < val.len() {
        let (tlv, consumed) = TLV::try_decode(&val[cursor..])?;
        match tlv.typ.get() {
            T_SIGNED_INFO => signed_info = Some(decode_signed_info(tlv.val)?),
            T_CONTENT => content = Some(tlv.val.to_vec()),
            T_SIGNATURE_TYPE => {
                signature_type = tlv
                    .val_as_u64()
                    .ok_or(CodecError::InvalidValue("signature_type"))?
                    .into()
            }
            T_SIGNATURE_VALUE => signature = Some(tlv.val.to_vec()),
            T_WITNESS => witness = Some(tlv.val.to_vec()),
            _ => {}
        }
        cursor += consumed;
    }

    Ok(Data {
        name,
        content: content.ok_or(CodecError::MissingField("content"))?,
        signed_info: signed_info.ok_or(CodecError::MissingField("signed_info"))?,
        signature_type,
        signature: signature.ok_or(CodecError::MissingField("signature"))?,
        witness,
    })
}

pub fn encode_forwarding_entry(entry: &ForwardingEntry) -> Vec<u8> {
    let mut body = Vec::new();
    write_tlv(T_ACTION, entry.action.as_bytes(), &mut body);
    encode_name_into(&entry.name, &mut body);
    let mut flags_buf = Vec::new();
    (entry.flags as u64).encode(&mut flags_buf);
    write_tlv(T_FLAGS, &flags_buf, &mut body);
    let mut lifetime_buf = Vec::new();
    (entry.lifetime_ms as u64).encode(&mut lifetime_buf);
    write_tlv(T_FE_LIFETIME, &lifetime_buf, &mut body);

    let mut out = Vec::new();
    write_tlv(T_FORWARDING_ENTRY, &body, &mut out);
    out
}

/// Decodes exactly one top-level element (Interest or Data). `bytes` MUST
/// contain exactly one fully-framed element, as delivered by a
/// [`crate::transport::Transport`]'s `on_element` upcall.
pub fn decode_element(bytes: &[u8]) -> Result<Element, CodecError> {
    let (tlv, _) = TLV::try_decode(bytes)?;
    match tlv.typ.get() {
        T_INTEREST => Ok(Element::Interest(decode_interest_body(tlv.val)?)),
        T_DATA => Ok(Element::Data(decode_data_body(tlv.val)?)),
        other => Ok(Element::Unknown(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interest_round_trip() {
        let mut interest = Interest::new(Name::from_uri("/testecho/hello"));
        interest.nonce = Some([1, 2, 3, 4]);
        interest.interest_lifetime_ms = 1234;
        interest.scope = Some(1);

        let bytes = encode_interest(&interest);
        match decode_element(&bytes).unwrap() {
            Element::Interest(decoded) => {
                assert_eq!(decoded.name, interest.name);
                assert_eq!(decoded.nonce, interest.nonce);
                assert_eq!(decoded.interest_lifetime_ms, interest.interest_lifetime_ms);
                assert_eq!(decoded.scope, interest.scope);
            }
            other => panic!("expected Interest, got {other:?}"),
        }
    }

    #[test]
    fn test_data_round_trip_with_key_name_locator() {
        let data = Data {
            name: Name::from_uri("/testecho/hello"),
            content: b"ok".to_vec(),
            signed_info: SignedInfo {
                key_locator: Some(KeyLocator::KeyName(Name::from_uri("/keys/signer"))),
                publisher_public_key_digest: Some(vec![9; 32]),
                timestamp_ms: Some(1_700_000_000_000),
                content_type: 0,
                freshness_seconds: Some(10),
            },
            signature_type: SignatureType::DigestSha256,
            signature: vec![0xAB; 32],
            witness: None,
        };

        let bytes = encode_data(&data);
        match decode_element(&bytes).unwrap() {
            Element::Data(decoded) => assert_eq!(decoded, data),
            other => panic!("expected Data, got {other:?}"),
        }
    }

    #[test]
    fn test_witness_round_trips() {
        let data = Data {
            name: Name::from_uri("/testecho/hello"),
            content: b"ok".to_vec(),
            signed_info: SignedInfo::default(),
            signature_type: SignatureType::DigestSha256,
            signature: vec![0xAB; 32],
            witness: Some(vec![1, 2, 3, 4]),
        };

        let bytes = encode_data(&data);
        match decode_element(&bytes).unwrap() {
            Element::Data(decoded) => assert_eq!(decoded.witness, Some(vec![1, 2, 3, 4])),
            other => panic!("expected Data, got {other:?}"),
        }
    }

    #[test]
    fn test_signed_portion_excludes_signature() {
        let mut data = Data {
            name: Name::from_uri("/a"),
            content: b"x".to_vec(),
            signed_info: SignedInfo::default(),
            signature_type: SignatureType::DigestSha256,
            signature: vec![1, 2, 3],
            witness: None,
        };
        let portion_a = data.signed_portion();
        data.signature = vec![9, 9, 9, 9];
        let portion_b = data.signed_portion();
        assert_eq!(portion_a, portion_b);
    }

    #[test]
    fn test_forwarding_entry_encodes_selfreg_sentinel_lifetime() {
        let entry = ForwardingEntry::selfreg(Name::from_uri("/app/foo"), 0);
        assert_eq!(entry.lifetime_ms, 2147483647);
        assert_eq!(entry.flags, 3);
        let bytes = encode_forwarding_entry(&entry);
        assert!(!bytes.is_empty());
    }

    #[test]
    fn test_unknown_element_type_reported() {
        let mut out = Vec::new();
        write_tlv(99, b"???", &mut out);
        match decode_element(&out).unwrap() {
            Element::Unknown(99) => {}
            other => panic!("expected Unknown(99), got {other:?}"),
        }
    }
}
