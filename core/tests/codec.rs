//! Payload layout: canonical order, version tolerance, corruption.

mod common;

use common::sample_snapshot;
use profile_core::{
    codec::{self, CodecError, HEADER_LEN},
    slices::{FxProfileData, MusicProfileData},
    snapshot::SnapshotAggregate,
    types::{ProfileId, SliceKind, CURRENT_SCHEMA_VERSION},
};

fn id() -> ProfileId {
    ProfileId::new("Run1", 0)
}

fn canonical_tags() -> Vec<u16> {
    SliceKind::ALL.iter().map(|k| k.tag()).collect()
}

/// Raw (tag, body) pairs, for re-laying into hand-built payloads.
fn sections_of(bytes: &[u8]) -> Vec<(u16, Vec<u8>)> {
    codec::inspect(bytes)
        .unwrap()
        .sections
        .iter()
        .map(|s| (s.tag, bytes[s.offset..s.offset + s.len].to_vec()))
        .collect()
}

/// Sections appear Meta, PlayerCharacter, GSM, Ability, SkillTree,
/// Inventory, Missions, Music, FX — populated or not.
#[test]
fn sections_follow_canonical_order() {
    let populated = codec::encode(&sample_snapshot(id())).unwrap();
    let empty = codec::encode(&SnapshotAggregate::empty(id())).unwrap();

    for bytes in [&populated, &empty] {
        let layout = codec::inspect(bytes).unwrap();
        assert_eq!(layout.version, CURRENT_SCHEMA_VERSION);
        assert_eq!(layout.tags(), canonical_tags());
        assert_eq!(layout.mask, (1u32 << SliceKind::ALL.len()) - 1);
        let offsets: Vec<usize> = layout.sections.iter().map(|s| s.offset).collect();
        assert!(offsets.windows(2).all(|w| w[0] < w[1]), "offsets not ascending: {offsets:?}");
    }
}

#[test]
fn canonical_order_is_pinned() {
    let names: Vec<&str> = SliceKind::ALL.iter().map(|k| k.name()).collect();
    assert_eq!(
        names,
        ["meta", "player_character", "gsm", "ability", "skill_tree", "inventory", "missions", "music", "fx"]
    );
}

/// Encoding is deterministic.
#[test]
fn encoding_is_stable() {
    let snapshot = sample_snapshot(id());
    assert_eq!(codec::encode(&snapshot).unwrap(), codec::encode(&snapshot).unwrap());
}

/// A v1 payload (no Music/FX) loads with those slices defaulted.
#[test]
fn older_payload_defaults_appended_slices() {
    let snapshot = sample_snapshot(id());
    let v1 = codec::encode_at_version(&snapshot, 1).unwrap();

    let layout = codec::inspect(&v1).unwrap();
    assert_eq!(layout.version, 1);
    assert_eq!(layout.tags(), vec![0, 1, 2, 3, 4, 5, 6]);

    let decoded = codec::decode(&v1, id()).unwrap();
    assert_eq!(decoded.music, MusicProfileData::default());
    assert_eq!(decoded.fx, FxProfileData::default());
    assert_eq!(decoded.meta, snapshot.meta);
    assert_eq!(decoded.inventory, snapshot.inventory);
    assert_eq!(decoded.missions, snapshot.missions);
}

/// A payload from a newer build with an extra trailing slice still loads.
#[test]
fn newer_payload_unknown_trailing_section_is_skipped() {
    let snapshot = sample_snapshot(id());
    let mut sections = sections_of(&codec::encode(&snapshot).unwrap());
    sections.push((SliceKind::ALL.len() as u16, br#"{"future":true}"#.to_vec()));
    let bytes = codec::encode_sections(CURRENT_SCHEMA_VERSION + 1, &sections);

    let layout = codec::inspect(&bytes).unwrap();
    assert_eq!(layout.sections.last().unwrap().kind, None);

    assert_eq!(codec::decode(&bytes, id()).unwrap(), snapshot);
}

/// Unknown fields inside a known slice are ignored.
#[test]
fn unknown_fields_inside_slice_are_ignored() {
    let mut sections = sections_of(&codec::encode(&SnapshotAggregate::empty(id())).unwrap());
    let fx = sections.iter_mut().find(|(tag, _)| *tag == SliceKind::Fx.tag()).unwrap();
    fx.1 = br#"{"intensity":0.5,"added_later":[1,2,3]}"#.to_vec();
    let bytes = codec::encode_sections(CURRENT_SCHEMA_VERSION, &sections);

    let decoded = codec::decode(&bytes, id()).unwrap();
    assert_eq!(decoded.fx.intensity, 0.5);
}

#[test]
fn truncated_payload_is_rejected() {
    let bytes = codec::encode(&sample_snapshot(id())).unwrap();
    for cut in [2, HEADER_LEN - 1, HEADER_LEN + 3, bytes.len() - 1] {
        let err = codec::decode(&bytes[..cut], id()).unwrap_err();
        assert!(matches!(err, CodecError::Truncated { .. }), "cut {cut}: {err}");
    }
}

#[test]
fn bad_magic_is_rejected() {
    let mut bytes = codec::encode(&sample_snapshot(id())).unwrap();
    bytes[0] = b'X';
    assert!(matches!(codec::decode(&bytes, id()), Err(CodecError::BadMagic)));
}

#[test]
fn out_of_order_sections_are_rejected() {
    let mut sections = sections_of(&codec::encode(&sample_snapshot(id())).unwrap());
    sections.swap(2, 3);
    let bytes = codec::encode_sections(CURRENT_SCHEMA_VERSION, &sections);

    let err = codec::decode(&bytes, id()).unwrap_err();
    assert!(matches!(err, CodecError::OutOfOrder { tag: 2, previous: 3 }), "{err}");
}

/// A slice the payload's own version should contain is missing.
#[test]
fn missing_known_slice_is_rejected() {
    let mut sections = sections_of(&codec::encode(&sample_snapshot(id())).unwrap());
    sections.retain(|(tag, _)| *tag != SliceKind::Ability.tag());
    let bytes = codec::encode_sections(CURRENT_SCHEMA_VERSION, &sections);

    let err = codec::decode(&bytes, id()).unwrap_err();
    assert!(matches!(err, CodecError::MissingSlice(SliceKind::Ability)), "{err}");
}

#[test]
fn presence_mask_must_match_sections() {
    let mut bytes = codec::encode(&sample_snapshot(id())).unwrap();
    // mask lives right after magic + version
    bytes[6] ^= 0b0000_0100;

    let err = codec::decode(&bytes, id()).unwrap_err();
    assert!(matches!(err, CodecError::MaskMismatch { .. }), "{err}");
}

#[test]
fn trailing_garbage_is_rejected() {
    let mut bytes = codec::encode(&sample_snapshot(id())).unwrap();
    bytes.extend_from_slice(b"junk");

    let err = codec::decode(&bytes, id()).unwrap_err();
    assert!(matches!(err, CodecError::TrailingBytes(4)), "{err}");
}

/// Meta decodes on its own even when a later section is garbage.
#[test]
fn meta_only_decode_ignores_damaged_tail() {
    let snapshot = sample_snapshot(id());
    let mut sections = sections_of(&codec::encode(&snapshot).unwrap());
    let inv = sections.iter_mut().find(|(tag, _)| *tag == SliceKind::Inventory.tag()).unwrap();
    inv.1 = b"{not json".to_vec();
    let bytes = codec::encode_sections(CURRENT_SCHEMA_VERSION, &sections);

    let (version, meta) = codec::decode_meta(&bytes).unwrap();
    assert_eq!(version, CURRENT_SCHEMA_VERSION);
    assert_eq!(meta, snapshot.meta);

    let err = codec::decode(&bytes, id()).unwrap_err();
    assert!(matches!(err, CodecError::Body { slice: SliceKind::Inventory, .. }), "{err}");
}

#[test]
fn unsupported_write_versions_are_refused() {
    let snapshot = sample_snapshot(id());
    assert!(codec::encode_at_version(&snapshot, 0).is_err());
    assert!(codec::encode_at_version(&snapshot, CURRENT_SCHEMA_VERSION + 1).is_err());
}

/// JSON has no infinity: encoding refuses the slice instead of writing
/// a `null` the reader would reject.
#[test]
fn infinite_float_is_unencodable() {
    let mut snapshot = sample_snapshot(id());
    snapshot.music.volume = f32::INFINITY;

    let err = codec::encode(&snapshot).unwrap_err();

    assert!(matches!(err, CodecError::Unencodable { slice: SliceKind::Music, .. }), "{err}");
    // Music is not part of v1, so a v1 payload is still writable.
    assert!(codec::encode_at_version(&snapshot, 1).is_ok());
}
