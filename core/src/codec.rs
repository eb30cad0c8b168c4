//! Versioned, tagged payload codec.
//!
//! LAYOUT (all integers little-endian):
//!   magic          4 bytes  "SOTP"
//!   schema version u16
//!   presence mask  u32      bit i set iff the section tagged i is present
//!   section count  u16
//!   per section:   tag u16 | body length u32 | body (JSON of the slice)
//!
//! RULES:
//!   - Sections are written in strictly ascending tag order, which is the
//!     canonical slice order.
//!   - Readers skip unknown trailing tags (payload from a newer build).
//!   - Readers default slices appended after the payload's version
//!     (payload from an older build).
//!   - Anything else that does not line up is a corrupt payload. Decoding
//!     is all-or-nothing: no partially decoded snapshot escapes.

use crate::{
    snapshot::SnapshotAggregate,
    slices::{ProfileMetadata, ProfileSlice},
    types::{ProfileId, SchemaVersion, SliceKind, CURRENT_SCHEMA_VERSION},
};
use thiserror::Error;

pub const MAGIC: [u8; 4] = *b"SOTP";

/// magic + version + mask + count
pub const HEADER_LEN: usize = 4 + 2 + 4 + 2;
const SECTION_HEADER_LEN: usize = 2 + 4;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("bad magic bytes")]
    BadMagic,

    #[error("truncated {what}: need {needed} bytes at offset {offset}, have {available}")]
    Truncated { what: &'static str, offset: usize, needed: usize, available: usize },

    #[error("unsupported schema version {0}")]
    UnsupportedVersion(SchemaVersion),

    #[error("section tag {tag} out of order after tag {previous}")]
    OutOfOrder { tag: u16, previous: u16 },

    #[error("presence mask {mask:#010x} does not match encoded sections {found:#010x}")]
    MaskMismatch { mask: u32, found: u32 },

    #[error("slice '{0}' missing from payload")]
    MissingSlice(SliceKind),

    #[error("expected first section to be meta, found tag {0}")]
    MetaNotFirst(u16),

    #[error("{0} trailing bytes after last section")]
    TrailingBytes(usize),

    #[error("slice '{slice}' cannot be encoded: {reason}")]
    Unencodable { slice: SliceKind, reason: String },

    #[error("slice '{slice}' body does not parse: {source}")]
    Body {
        slice: SliceKind,
        #[source]
        source: serde_json::Error,
    },
}

pub type CodecResult<T> = Result<T, CodecError>;

/// One entry of a payload's section table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionInfo {
    pub tag:    u16,
    /// `None` for tags this build does not know.
    pub kind:   Option<SliceKind>,
    pub offset: usize,
    pub len:    usize,
}

/// Header and section table, bodies left undecoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadLayout {
    pub version:  SchemaVersion,
    pub mask:     u32,
    pub sections: Vec<SectionInfo>,
}

impl PayloadLayout {
    pub fn tags(&self) -> Vec<u16> {
        self.sections.iter().map(|s| s.tag).collect()
    }
}

// ── Encoding ───────────────────────────────────────────────────

/// Encode at the current schema version.
pub fn encode(snapshot: &SnapshotAggregate) -> CodecResult<Vec<u8>> {
    encode_at_version(snapshot, CURRENT_SCHEMA_VERSION)
}

/// Encode only the slices known at `version`, so an older build can read
/// the result.
pub fn encode_at_version(
    snapshot: &SnapshotAggregate,
    version: SchemaVersion,
) -> CodecResult<Vec<u8>> {
    if version == 0 || version > CURRENT_SCHEMA_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }

    let mut sections = Vec::new();
    for kind in SliceKind::known_at(version) {
        sections.push((kind.tag(), encode_slice(snapshot, kind)?));
    }
    Ok(encode_sections(version, &sections))
}

fn encode_slice(snapshot: &SnapshotAggregate, kind: SliceKind) -> CodecResult<Vec<u8>> {
    match kind {
        SliceKind::Meta => slice_body(&snapshot.meta),
        SliceKind::PlayerCharacter => slice_body(&snapshot.player_character),
        SliceKind::Gsm => slice_body(&snapshot.gsm),
        SliceKind::Ability => slice_body(&snapshot.ability),
        SliceKind::SkillTree => slice_body(&snapshot.skill_tree),
        SliceKind::Inventory => slice_body(&snapshot.inventory),
        SliceKind::Missions => slice_body(&snapshot.missions),
        SliceKind::Music => slice_body(&snapshot.music),
        SliceKind::Fx => slice_body(&snapshot.fx),
    }
}

/// JSON body of one slice, only if it reads back equal to `value`.
/// JSON has no NaN or infinity: serde_json writes them as `null`, which
/// the reader then refuses, so such a slice is rejected here instead.
fn slice_body<S: ProfileSlice>(value: &S) -> CodecResult<Vec<u8>> {
    let body = serde_json::to_vec(value)
        .map_err(|source| CodecError::Body { slice: S::KIND, source })?;
    match serde_json::from_slice::<S>(&body) {
        Ok(read_back) if read_back == *value => Ok(body),
        Ok(_) => Err(CodecError::Unencodable {
            slice:  S::KIND,
            reason: "value does not read back as written (NaN float?)".into(),
        }),
        Err(e) => Err(CodecError::Unencodable {
            slice:  S::KIND,
            reason: format!("value does not read back ({e}); non-finite floats cannot be saved"),
        }),
    }
}

/// Lay out raw sections. Callers are responsible for tag order; the
/// reader enforces it.
pub fn encode_sections(version: SchemaVersion, sections: &[(u16, Vec<u8>)]) -> Vec<u8> {
    let body_len: usize = sections
        .iter()
        .map(|(_, body)| SECTION_HEADER_LEN + body.len())
        .sum();
    let mask = sections
        .iter()
        .filter(|(tag, _)| *tag < 32)
        .fold(0u32, |mask, (tag, _)| mask | (1 << tag));

    let mut out = Vec::with_capacity(HEADER_LEN + body_len);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&version.to_le_bytes());
    out.extend_from_slice(&mask.to_le_bytes());
    out.extend_from_slice(&(sections.len() as u16).to_le_bytes());
    for (tag, body) in sections {
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(body);
    }
    out
}

// ── Decoding ───────────────────────────────────────────────────

struct Cursor<'a> {
    bytes:  &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, what: &'static str, n: usize) -> CodecResult<&'a [u8]> {
        let available = self.bytes.len() - self.offset;
        if available < n {
            return Err(CodecError::Truncated { what, offset: self.offset, needed: n, available });
        }
        let out = &self.bytes[self.offset..self.offset + n];
        self.offset += n;
        Ok(out)
    }

    fn u16(&mut self, what: &'static str) -> CodecResult<u16> {
        let b = self.take(what, 2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self, what: &'static str) -> CodecResult<u32> {
        let b = self.take(what, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }
}

struct Header {
    version: SchemaVersion,
    mask:    u32,
    count:   u16,
}

fn read_header(cursor: &mut Cursor<'_>) -> CodecResult<Header> {
    if cursor.take("magic", MAGIC.len())? != MAGIC {
        return Err(CodecError::BadMagic);
    }
    let version = cursor.u16("schema version")?;
    if version == 0 {
        return Err(CodecError::UnsupportedVersion(version));
    }
    let mask = cursor.u32("presence mask")?;
    let count = cursor.u16("section count")?;
    Ok(Header { version, mask, count })
}

fn read_section<'a>(cursor: &mut Cursor<'a>) -> CodecResult<(SectionInfo, &'a [u8])> {
    let tag = cursor.u16("section tag")?;
    let len = cursor.u32("section length")? as usize;
    let offset = cursor.offset;
    let body = cursor.take("section body", len)?;
    let info = SectionInfo { tag, kind: SliceKind::from_tag(tag), offset, len };
    Ok((info, body))
}

/// Walk the header and section table, validating structure only.
pub fn inspect(bytes: &[u8]) -> CodecResult<PayloadLayout> {
    walk(bytes).map(|(layout, _)| layout)
}

fn walk(bytes: &[u8]) -> CodecResult<(PayloadLayout, Vec<&[u8]>)> {
    let mut cursor = Cursor::new(bytes);
    let header = read_header(&mut cursor)?;

    let mut sections = Vec::with_capacity(header.count as usize);
    let mut bodies = Vec::with_capacity(header.count as usize);
    let mut found = 0u32;
    let mut previous: Option<u16> = None;

    for _ in 0..header.count {
        let (info, body) = read_section(&mut cursor)?;
        if let Some(prev) = previous {
            if info.tag <= prev {
                return Err(CodecError::OutOfOrder { tag: info.tag, previous: prev });
            }
        }
        previous = Some(info.tag);
        if info.tag < 32 {
            found |= 1 << info.tag;
        }
        sections.push(info);
        bodies.push(body);
    }

    if cursor.remaining() > 0 {
        return Err(CodecError::TrailingBytes(cursor.remaining()));
    }
    if found != header.mask {
        return Err(CodecError::MaskMismatch { mask: header.mask, found });
    }

    let layout = PayloadLayout { version: header.version, mask: header.mask, sections };
    Ok((layout, bodies))
}

/// Decode a full snapshot. `profile_id` is not part of the payload; the
/// store supplies the slot it read from.
pub fn decode(bytes: &[u8], profile_id: ProfileId) -> CodecResult<SnapshotAggregate> {
    let (layout, bodies) = walk(bytes)?;

    for kind in SliceKind::known_at(layout.version) {
        if !layout.sections.iter().any(|s| s.tag == kind.tag()) {
            return Err(CodecError::MissingSlice(kind));
        }
    }

    let mut snapshot = SnapshotAggregate::empty(profile_id);
    for (info, body) in layout.sections.iter().zip(bodies) {
        match info.kind {
            Some(kind) => snapshot
                .set_slice_json(kind, body)
                .map_err(|source| CodecError::Body { slice: kind, source })?,
            None => log::debug!("skipping unknown section tag {} ({} bytes)", info.tag, info.len),
        }
    }

    for kind in SliceKind::ALL {
        if kind.introduced_in() > layout.version {
            log::debug!(
                "slice '{kind}' absent from v{} payload, using default",
                layout.version
            );
        }
    }
    Ok(snapshot)
}

/// Decode the header and the Meta section only. Later sections are not
/// walked, so a damaged tail does not hide the slot from listings.
pub fn decode_meta(bytes: &[u8]) -> CodecResult<(SchemaVersion, ProfileMetadata)> {
    let mut cursor = Cursor::new(bytes);
    let header = read_header(&mut cursor)?;
    if header.count == 0 {
        return Err(CodecError::MissingSlice(SliceKind::Meta));
    }
    let (info, body) = read_section(&mut cursor)?;
    if info.kind != Some(SliceKind::Meta) {
        return Err(CodecError::MetaNotFirst(info.tag));
    }
    let meta = serde_json::from_slice(body)
        .map_err(|source| CodecError::Body { slice: SliceKind::Meta, source })?;
    Ok((header.version, meta))
}
