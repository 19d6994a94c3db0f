use std::collections::BTreeMap;

use twl_crypto::ContentHasher;
use twl_types::Hash;

use crate::codec::{decode_varint, encode_varint};
use crate::error::{StoreError, StoreResult};

/// Largest payload a single packet may declare.
pub const MAX_PACKET_LEN: u64 = 16 * 1024 * 1024;

const BODY_LEN: usize = 6 * Hash::LEN;
const TWIST_LEN: usize = 2 * Hash::LEN;

/// The kind of a packet, stored as its leading type byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, std::hash::Hash)]
pub enum PacketKind {
    /// Opaque bytes.
    Blob,
    /// Ordered list of hashes.
    List,
    /// Sorted key → hash map.
    Trie,
    /// Twist body record.
    Body,
    /// Twist record.
    Twist,
}

impl PacketKind {
    /// The wire type byte.
    pub fn type_byte(&self) -> u8 {
        match self {
            Self::Blob => 1,
            Self::List => 2,
            Self::Trie => 3,
            Self::Body => 4,
            Self::Twist => 5,
        }
    }

    /// Parse a wire type byte.
    pub fn from_type_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Blob),
            2 => Some(Self::List),
            3 => Some(Self::Trie),
            4 => Some(Self::Body),
            5 => Some(Self::Twist),
            _ => None,
        }
    }
}

impl std::fmt::Display for PacketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blob => write!(f, "blob"),
            Self::List => write!(f, "list"),
            Self::Trie => write!(f, "trie"),
            Self::Body => write!(f, "body"),
            Self::Twist => write!(f, "twist"),
        }
    }
}

/// The body of a twist: every cross-cutting reference of one chain node.
///
/// Absent references are `None` here and the null hash on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BodyPacket {
    /// The twist this one continues.
    pub prev: Option<Hash>,
    /// A twist (usually on another line) that arbitrates successors.
    pub tether: Option<Hash>,
    /// Requirements trie.
    pub requirements: Option<Hash>,
    /// Focus of the attached cargo atoms.
    pub cargo: Option<Hash>,
    /// Rigging trie of hoist attestations.
    pub rigging: Option<Hash>,
    /// Blob holding the shield secret.
    pub shield: Option<Hash>,
}

impl BodyPacket {
    fn fields(&self) -> [Option<Hash>; 6] {
        [
            self.prev,
            self.tether,
            self.requirements,
            self.cargo,
            self.rigging,
            self.shield,
        ]
    }

    /// All non-null references held by this body, in wire order.
    pub fn references(&self) -> Vec<Hash> {
        self.fields().into_iter().flatten().collect()
    }
}

/// The addressable node: a body plus the satisfactions made over it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TwistPacket {
    /// Hash of the [`BodyPacket`]. Never null.
    pub body: Hash,
    /// Satisfactions trie, if any requirement was satisfied.
    pub satisfactions: Option<Hash>,
}

/// An immutable, typed, content-addressed unit of data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Packet {
    Blob(Vec<u8>),
    List(Vec<Hash>),
    Trie(BTreeMap<Hash, Hash>),
    Body(BodyPacket),
    Twist(TwistPacket),
}

impl Packet {
    /// Build a trie packet from key/value pairs.
    pub fn trie(entries: impl IntoIterator<Item = (Hash, Hash)>) -> Self {
        Self::Trie(entries.into_iter().collect())
    }

    /// The kind of this packet.
    pub fn kind(&self) -> PacketKind {
        match self {
            Self::Blob(_) => PacketKind::Blob,
            Self::List(_) => PacketKind::List,
            Self::Trie(_) => PacketKind::Trie,
            Self::Body(_) => PacketKind::Body,
            Self::Twist(_) => PacketKind::Twist,
        }
    }

    /// Content address of this packet.
    pub fn hash(&self) -> Hash {
        ContentHasher::PACKET.hash(&self.to_bytes())
    }

    /// Returns `true` if `hash` is the content address of this packet.
    pub fn verifies(&self, hash: &Hash) -> bool {
        ContentHasher::PACKET.verify(&self.to_bytes(), hash)
    }

    /// Canonical encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf
    }

    /// Append the canonical encoding to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        let payload = self.payload();
        buf.push(self.kind().type_byte());
        encode_varint(buf, payload.len() as u64);
        buf.extend_from_slice(&payload);
    }

    fn payload(&self) -> Vec<u8> {
        match self {
            Self::Blob(data) => data.clone(),
            Self::List(items) => items.iter().flat_map(|h| *h.as_bytes()).collect(),
            Self::Trie(entries) => {
                let mut out = Vec::with_capacity(entries.len() * 2 * Hash::LEN);
                for (key, value) in entries {
                    out.extend_from_slice(key.as_bytes());
                    out.extend_from_slice(value.as_bytes());
                }
                out
            }
            Self::Body(body) => body
                .fields()
                .into_iter()
                .flat_map(|f| *Hash::from_option(f).as_bytes())
                .collect(),
            Self::Twist(twist) => {
                let mut out = Vec::with_capacity(TWIST_LEN);
                out.extend_from_slice(twist.body.as_bytes());
                out.extend_from_slice(Hash::from_option(twist.satisfactions).as_bytes());
                out
            }
        }
    }

    /// Decode exactly one packet occupying all of `data`.
    pub fn from_bytes(data: &[u8]) -> StoreResult<Self> {
        match Self::decode(data)? {
            Some((packet, used)) if used == data.len() => Ok(packet),
            Some((_, used)) => Err(StoreError::Malformed {
                offset: used as u64,
                reason: format!("{} trailing bytes", data.len() - used),
            }),
            None => Err(StoreError::Truncated {
                offset: data.len() as u64,
            }),
        }
    }

    /// Decode one packet from the front of `data`.
    ///
    /// Returns `Ok(None)` when `data` holds only a prefix of a packet, so a
    /// caller can wait for more bytes. On success returns the packet and the
    /// number of bytes consumed.
    pub fn decode(data: &[u8]) -> StoreResult<Option<(Self, usize)>> {
        decode_at(data, 0)
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Self::Blob(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Hash]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_trie(&self) -> Option<&BTreeMap<Hash, Hash>> {
        match self {
            Self::Trie(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_body(&self) -> Option<&BodyPacket> {
        match self {
            Self::Body(body) => Some(body),
            _ => None,
        }
    }

    pub fn as_twist(&self) -> Option<&TwistPacket> {
        match self {
            Self::Twist(twist) => Some(twist),
            _ => None,
        }
    }
}

/// Decode one packet from the front of `data`, reporting errors at
/// `base + position`.
pub(crate) fn decode_at(data: &[u8], base: u64) -> StoreResult<Option<(Packet, usize)>> {
    let Some(&type_byte) = data.first() else {
        return Ok(None);
    };
    let kind = PacketKind::from_type_byte(type_byte).ok_or(StoreError::UnknownKind {
        offset: base,
        byte: type_byte,
    })?;

    let Some((len, consumed)) = decode_varint(&data[1..]).map_err(|reason| {
        StoreError::Malformed {
            offset: base + 1,
            reason: reason.into(),
        }
    })?
    else {
        return Ok(None);
    };
    if len > MAX_PACKET_LEN {
        return Err(StoreError::Malformed {
            offset: base + 1,
            reason: format!("declared length {len} exceeds {MAX_PACKET_LEN}"),
        });
    }

    let start = 1 + consumed;
    let end = start + len as usize;
    if data.len() < end {
        return Ok(None);
    }
    let payload = &data[start..end];
    let malformed = |reason: String| StoreError::Malformed {
        offset: base + start as u64,
        reason,
    };

    let packet = match kind {
        PacketKind::Blob => Packet::Blob(payload.to_vec()),
        PacketKind::List => {
            if payload.len() % Hash::LEN != 0 {
                return Err(malformed(format!(
                    "list payload of {} bytes is not a multiple of {}",
                    payload.len(),
                    Hash::LEN
                )));
            }
            Packet::List(payload.chunks_exact(Hash::LEN).map(read_hash).collect())
        }
        PacketKind::Trie => {
            if payload.len() % (2 * Hash::LEN) != 0 {
                return Err(malformed(format!(
                    "trie payload of {} bytes is not a multiple of {}",
                    payload.len(),
                    2 * Hash::LEN
                )));
            }
            let mut entries = BTreeMap::new();
            let mut last: Option<Hash> = None;
            for pair in payload.chunks_exact(2 * Hash::LEN) {
                let key = read_hash(&pair[..Hash::LEN]);
                if last.is_some_and(|prev| prev >= key) {
                    return Err(malformed("trie keys are not strictly increasing".into()));
                }
                last = Some(key);
                entries.insert(key, read_hash(&pair[Hash::LEN..]));
            }
            Packet::Trie(entries)
        }
        PacketKind::Body => {
            if payload.len() != BODY_LEN {
                return Err(malformed(format!(
                    "body payload must be {BODY_LEN} bytes, got {}",
                    payload.len()
                )));
            }
            let f: Vec<Option<Hash>> = payload
                .chunks_exact(Hash::LEN)
                .map(|c| read_hash(c).into_option())
                .collect();
            Packet::Body(BodyPacket {
                prev: f[0],
                tether: f[1],
                requirements: f[2],
                cargo: f[3],
                rigging: f[4],
                shield: f[5],
            })
        }
        PacketKind::Twist => {
            if payload.len() != TWIST_LEN {
                return Err(malformed(format!(
                    "twist payload must be {TWIST_LEN} bytes, got {}",
                    payload.len()
                )));
            }
            let body = read_hash(&payload[..Hash::LEN]);
            if body.is_null() {
                return Err(malformed("twist has a null body".into()));
            }
            Packet::Twist(TwistPacket {
                body,
                satisfactions: read_hash(&payload[Hash::LEN..]).into_option(),
            })
        }
    };

    Ok(Some((packet, end)))
}

/// Read a hash from a chunk that is known to be exactly 32 bytes.
pub(crate) fn read_hash(chunk: &[u8]) -> Hash {
    let mut arr = [0u8; 32];
    arr.copy_from_slice(chunk);
    Hash::from_hash(arr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn h(seed: u8) -> Hash {
        Hash::digest(&[seed])
    }

    fn sample_packets() -> Vec<Packet> {
        vec![
            Packet::Blob(b"cargo".to_vec()),
            Packet::Blob(Vec::new()),
            Packet::List(vec![h(1), h(2), h(1)]),
            Packet::trie([(h(3), h(4)), (h(1), h(2))]),
            Packet::Body(BodyPacket {
                prev: Some(h(1)),
                cargo: Some(h(2)),
                ..Default::default()
            }),
            Packet::Twist(TwistPacket {
                body: h(9),
                satisfactions: None,
            }),
        ]
    }

    #[test]
    fn every_kind_decodes_to_itself() {
        for packet in sample_packets() {
            let bytes = packet.to_bytes();
            assert_eq!(Packet::from_bytes(&bytes).unwrap(), packet);
        }
    }

    #[test]
    fn hash_is_deterministic_and_kind_sensitive() {
        let blob = Packet::Blob(vec![0u8; 64]);
        let trie_bytes = Packet::Trie(BTreeMap::from([(Hash::NULL, Hash::NULL)]));
        assert_eq!(blob.hash(), blob.clone().hash());
        assert_ne!(blob.hash(), trie_bytes.hash());
        assert!(blob.verifies(&blob.hash()));
        assert!(!blob.verifies(&trie_bytes.hash()));
    }

    #[test]
    fn absent_body_fields_encode_as_null() {
        let bytes = Packet::Body(BodyPacket::default()).to_bytes();
        // kind + two-byte varint(192) + 192 zero bytes
        assert_eq!(bytes.len(), 3 + BODY_LEN);
        assert_eq!(&bytes[1..3], &[0xC0, 0x01]);
        assert!(bytes[3..].iter().all(|b| *b == 0));
    }

    #[test]
    fn body_references_skip_absent_fields() {
        let body = BodyPacket {
            prev: Some(h(1)),
            shield: Some(h(2)),
            ..Default::default()
        };
        assert_eq!(body.references(), vec![h(1), h(2)]);
    }

    #[test]
    fn prefix_decodes_as_incomplete() {
        let bytes = Packet::List(vec![h(1), h(2)]).to_bytes();
        for cut in 0..bytes.len() {
            assert_eq!(Packet::decode(&bytes[..cut]).unwrap(), None, "cut at {cut}");
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = Packet::decode(&[42, 0]).unwrap_err();
        assert_eq!(err, StoreError::UnknownKind { offset: 0, byte: 42 });
    }

    #[test]
    fn unsorted_trie_is_malformed() {
        let (lo, hi) = if h(1) < h(2) { (h(1), h(2)) } else { (h(2), h(1)) };
        let mut bytes = vec![PacketKind::Trie.type_byte()];
        encode_varint(&mut bytes, 128);
        for key in [hi, lo] {
            bytes.extend_from_slice(key.as_bytes());
            bytes.extend_from_slice(h(7).as_bytes());
        }
        assert!(matches!(
            Packet::from_bytes(&bytes),
            Err(StoreError::Malformed { .. })
        ));
    }

    #[test]
    fn wrong_body_length_is_malformed() {
        let mut bytes = vec![PacketKind::Body.type_byte()];
        encode_varint(&mut bytes, 32);
        bytes.extend_from_slice(&[0u8; 32]);
        assert!(matches!(
            Packet::from_bytes(&bytes),
            Err(StoreError::Malformed { .. })
        ));
    }

    #[test]
    fn twist_with_null_body_is_malformed() {
        let mut bytes = vec![PacketKind::Twist.type_byte()];
        encode_varint(&mut bytes, 64);
        bytes.extend_from_slice(&[0u8; 64]);
        assert!(matches!(
            Packet::from_bytes(&bytes),
            Err(StoreError::Malformed { .. })
        ));
    }

    #[test]
    fn oversized_length_is_malformed() {
        let mut bytes = vec![PacketKind::Blob.type_byte()];
        encode_varint(&mut bytes, MAX_PACKET_LEN + 1);
        assert!(matches!(
            Packet::decode(&bytes),
            Err(StoreError::Malformed { .. })
        ));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = Packet::Blob(b"x".to_vec()).to_bytes();
        bytes.push(0);
        assert!(matches!(
            Packet::from_bytes(&bytes),
            Err(StoreError::Malformed { .. })
        ));
    }

    #[test]
    fn accessors_match_kind() {
        let blob = Packet::Blob(b"b".to_vec());
        assert_eq!(blob.as_blob(), Some(&b"b"[..]));
        assert!(blob.as_trie().is_none());
        assert_eq!(blob.kind(), PacketKind::Blob);
        assert_eq!(PacketKind::Body.to_string(), "body");
        for kind in [
            PacketKind::Blob,
            PacketKind::List,
            PacketKind::Trie,
            PacketKind::Body,
            PacketKind::Twist,
        ] {
            assert_eq!(PacketKind::from_type_byte(kind.type_byte()), Some(kind));
        }
    }

    proptest! {
        #[test]
        fn arbitrary_bytes_never_panic(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = Packet::decode(&data);
        }

        #[test]
        fn arbitrary_tries_decode(keys in proptest::collection::btree_map(any::<[u8; 32]>(), any::<[u8; 32]>(), 0..8)) {
            let packet = Packet::trie(keys.into_iter().map(|(k, v)| (Hash::from_hash(k), Hash::from_hash(v))));
            prop_assert_eq!(Packet::from_bytes(&packet.to_bytes()).unwrap(), packet);
        }
    }
}
