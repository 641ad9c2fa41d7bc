//! End-to-end build/read tests over both format versions

#![allow(clippy::expect_used, clippy::unwrap_used)]

use mdst_format::{
    FormatVersion, Line, MdstBuilder, MdstError, MdstReader, Name, Operator, Position, Station,
    StationDb, TransportMode,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::io::Cursor;

fn sample_db() -> StationDb {
    let mut operators = BTreeMap::new();
    operators.insert(
        7,
        Operator {
            name: Name::english("Metro Co"),
            default_mode: TransportMode::Metro,
        },
    );
    let mut lines = BTreeMap::new();
    lines.insert(
        12,
        Line {
            name: Name {
                english: Some("Red Line".into()),
                english_short: Some("Red".into()),
                local: Some("赤線".into()),
                ..Name::default()
            },
            mode: TransportMode::Metro,
        },
    );
    let mut languages = BTreeMap::new();
    languages.insert("fr".to_string(), 1);

    StationDb {
        content_version: 20_260_828,
        tts_hint_language: Some("ja-JP".into()),
        local_languages: vec!["ja".into()],
        languages,
        operators,
        lines,
        license_notice: Some("Data provided under ODbL. Attribution required.".into()),
    }
}

fn sample_stations() -> Vec<Station> {
    let mut other = BTreeMap::new();
    other.insert(1, "Centrale".to_string());
    vec![
        Station {
            id: 100,
            name: Name {
                english: Some("Central".into()),
                english_short: Some("Ctl".into()),
                local: Some("中央".into()),
                other,
                ..Name::default()
            },
            position: Some(Position {
                latitude: 35.681,
                longitude: 139.767,
            }),
            operator_id: Some(7),
            line_ids: vec![12],
        },
        Station {
            id: 0,
            name: Name::english("North"),
            position: None,
            operator_id: None,
            line_ids: Vec::new(),
        },
        Station {
            id: u32::MAX,
            name: Name::english("Terminus"),
            position: Some(Position {
                latitude: -33.868,
                longitude: 151.207,
            }),
            operator_id: Some(7),
            line_ids: vec![12],
        },
    ]
}

fn build(version: FormatVersion, db: &StationDb, stations: &[Station]) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    let mut builder = MdstBuilder::new(&mut buf, version, db).expect("preamble");
    for station in stations {
        builder.push_station(station).expect("push");
    }
    builder.finalize().expect("finalize");
    buf.into_inner()
}

#[test]
fn test_full_round_trip_both_versions() {
    let db = sample_db();
    let stations = sample_stations();

    for version in [FormatVersion::V1, FormatVersion::V2] {
        let data = build(version, &db, &stations);
        let mut reader = MdstReader::open(Cursor::new(data)).expect("open");

        assert_eq!(reader.version(), version);
        assert_eq!(reader.content_version(), 20_260_828);
        assert_eq!(reader.tts_hint_language(), Some("ja-JP"));
        assert_eq!(reader.local_languages(), ["ja".to_string()]);
        assert_eq!(
            reader.license_notice(),
            Some("Data provided under ODbL. Attribution required.")
        );
        assert_eq!(reader.station_count().expect("count"), 3);

        for expected in &stations {
            let found = reader
                .get(expected.id)
                .expect("lookup")
                .expect("station present");
            assert_eq!(&found, expected);
        }

        let central = reader.get(100).expect("lookup").expect("present");
        let operator = reader
            .resolve_operator(central.operator_id.expect("operator"))
            .expect("resolve");
        assert_eq!(operator.name.preferred(false, true), Some("Metro Co"));
        assert_eq!(operator.default_mode, TransportMode::Metro);
        let line = reader.resolve_line(central.line_ids[0]).expect("resolve");
        assert_eq!(line.name.preferred(true, true), Some("Red"));
        assert_eq!(line.name.preferred(false, false), Some("赤線"));
    }
}

#[test]
fn test_iteration_yields_insertion_order() {
    let stations = sample_stations();
    for version in [FormatVersion::V1, FormatVersion::V2] {
        let data = build(version, &sample_db(), &stations);
        let mut reader = MdstReader::open(Cursor::new(data)).expect("open");
        let seen: Vec<Station> = reader
            .stations()
            .expect("iter")
            .collect::<Result<_, _>>()
            .expect("decode");
        assert_eq!(seen, stations);
    }
}

#[test]
fn test_index_order_is_independent_of_insertion_order() {
    let mut forward = sample_stations();
    let mut reversed = forward.clone();
    reversed.reverse();
    forward.sort_by_key(|s| s.id);
    let expected: Vec<u32> = forward.iter().map(|s| s.id).collect();

    for version in [FormatVersion::V1, FormatVersion::V2] {
        let data = build(version, &sample_db(), &reversed);
        let mut reader = MdstReader::open(Cursor::new(data)).expect("open");
        assert_eq!(reader.station_ids().expect("index"), expected);
    }
}

#[test]
fn test_identical_input_builds_identical_bytes() {
    let db = sample_db();
    let stations = sample_stations();
    for version in [FormatVersion::V1, FormatVersion::V2] {
        let first = build(version, &db, &stations);
        let second = build(version, &db, &stations);
        assert_eq!(first, second);
    }
}

#[test]
fn test_duplicate_id_last_write_wins() {
    let first = Station {
        id: 5,
        name: Name::english("Old Town"),
        ..Station::default()
    };
    let second = Station {
        id: 5,
        name: Name::english("New Town"),
        ..Station::default()
    };

    for version in [FormatVersion::V1, FormatVersion::V2] {
        let mut buf = Cursor::new(Vec::new());
        let mut builder =
            MdstBuilder::new(&mut buf, version, &StationDb::default()).expect("preamble");
        builder.push_station(&first).expect("push");
        builder.push_station(&second).expect("push");
        let stats = builder.finalize().expect("finalize");
        assert_eq!(stats.station_count, 1);
        assert_eq!(stats.duplicate_count, 1);

        let mut reader = MdstReader::open(Cursor::new(buf.into_inner())).expect("open");
        assert_eq!(reader.station_count().expect("count"), 1);
        let found = reader.get(5).expect("lookup").expect("present");
        assert_eq!(found.name.preferred(false, true), Some("New Town"));
        // Both payloads remain in the section; iteration still sees both.
        assert_eq!(reader.stations().expect("iter").count(), 2);
    }
}

#[test]
fn test_empty_database() {
    for version in [FormatVersion::V1, FormatVersion::V2] {
        let data = build(version, &StationDb::default(), &[]);
        let mut reader = MdstReader::open(Cursor::new(data)).expect("open");
        assert_eq!(reader.station_count().expect("count"), 0);
        assert_eq!(reader.get(0).expect("lookup"), None);
        assert_eq!(reader.stations().expect("iter").count(), 0);
    }
}

#[test]
fn test_v1_preamble_layout() {
    let data = build(FormatVersion::V1, &sample_db(), &sample_stations());
    assert_eq!(&data[0..4], b"MdST");
    assert_eq!(u32::from_be_bytes([data[4], data[5], data[6], data[7]]), 1);

    let mut reader = MdstReader::open(Cursor::new(data.clone())).expect("open");
    reader.load_index().expect("index");
    let sizes = reader.section_sizes();
    let stations_len = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);
    assert_eq!(sizes.stations, Some(u64::from(stations_len)));
    // preamble + header + stations + index account for the whole file
    assert_eq!(
        12 + sizes.header + sizes.stations.unwrap() + sizes.index.unwrap(),
        data.len() as u64
    );
}

#[test]
fn test_v2_sections_account_for_whole_file() {
    let data = build(FormatVersion::V2, &sample_db(), &sample_stations());
    assert_eq!(u32::from_be_bytes([data[4], data[5], data[6], data[7]]), 2);

    let mut reader = MdstReader::open(Cursor::new(data.clone())).expect("open");
    reader.load_index().expect("index");
    let sizes = reader.section_sizes();
    assert_eq!(
        8 + sizes.header + sizes.stations.unwrap() + sizes.index.unwrap(),
        data.len() as u64
    );
}

#[test]
fn test_v2_is_smaller_on_repetitive_data() {
    let stations: Vec<Station> = (0..500)
        .map(|id| Station {
            id,
            name: Name::english(format!("Station {id}")),
            ..Station::default()
        })
        .collect();
    let v1 = build(FormatVersion::V1, &sample_db(), &stations);
    let v2 = build(FormatVersion::V2, &sample_db(), &stations);
    assert!(v2.len() < v1.len(), "{} !< {}", v2.len(), v1.len());
}

#[test]
fn test_rebuild_across_versions_preserves_content() {
    let db = sample_db();
    let stations = sample_stations();
    let v1 = build(FormatVersion::V1, &db, &stations);

    let mut source = MdstReader::open(Cursor::new(v1)).expect("open");
    let carried: Vec<Station> = source
        .stations()
        .expect("iter")
        .collect::<Result<_, _>>()
        .expect("decode");
    let v2 = build(FormatVersion::V2, source.station_db(), &carried);

    let mut reader = MdstReader::open(Cursor::new(v2)).expect("open");
    assert_eq!(reader.content_version(), db.content_version);
    for expected in &stations {
        assert_eq!(
            reader.get(expected.id).expect("lookup").as_ref(),
            Some(expected)
        );
    }
}

#[test]
fn test_open_path_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("stations.mdst");
    std::fs::write(&path, build(FormatVersion::V2, &sample_db(), &sample_stations()))
        .expect("write");

    let mut reader = MdstReader::open_path(&path).expect("open");
    assert!(reader.get(100).expect("lookup").is_some());
}

proptest! {
    #![proptest_config(ProptestConfig {
        max_global_rejects: 65536,
        ..ProptestConfig::default()
    })]

    /// Cutting a finished file anywhere must surface an error at open or
    /// index load, never a silently shorter database.
    #[test]
    fn test_truncation_never_passes_silently(cut in 0usize..1500, v2 in proptest::bool::ANY) {
        let version = if v2 { FormatVersion::V2 } else { FormatVersion::V1 };
        let data = build(version, &sample_db(), &sample_stations());
        prop_assume!(cut < data.len());

        let result = MdstReader::open(Cursor::new(data[..cut].to_vec()))
            .and_then(|mut reader| reader.load_index());
        prop_assert!(result.is_err());
    }
}

#[test]
fn test_error_messages_name_the_problem() {
    let err = MdstError::UnsupportedVersion(3);
    assert!(err.to_string().contains('3'));
    let err = MdstError::DanglingReference {
        table: "line",
        id: 42,
    };
    let text = err.to_string();
    assert!(text.contains("line") && text.contains("42"));
}
