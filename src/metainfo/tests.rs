use std::fs;
use std::io::Write;

use md5::Md5;
use sha1::{Digest, Sha1};
use tempfile::TempDir;

use super::info_hash::hex_encode;
use super::*;

const HELLO_MD5: &str = "5d41402abc4b2a76b9719d911017c592";

fn single_file_info() -> Info {
    Info {
        name: "a.txt".into(),
        length: 5,
        pieces: vec![0u8; 20].into(),
        piece_length: 4,
        ..Info::default()
    }
}

#[test]
fn test_info_hash_from_hex() {
    let hex = "0123456789abcdef0123456789abcdef01234567";
    let hash = InfoHash::from_hex(hex).unwrap();
    assert_eq!(hash.to_hex(), hex);
    assert_eq!(hash.to_string(), hex);
    assert_eq!(hash.as_bytes()[0], 0x01);
}

#[test]
fn test_info_hash_invalid() {
    assert!(matches!(
        InfoHash::from_hex("0123"),
        Err(MetainfoError::InvalidInfoHashLength)
    ));
    assert!(matches!(
        InfoHash::from_hex("zz23456789abcdef0123456789abcdef01234567"),
        Err(MetainfoError::InvalidInfoHashLength)
    ));
    assert!(InfoHash::from_bytes(&[0u8; 19]).is_err());
}

#[test]
fn test_metainfo_encode_layout() {
    let meta = Metainfo {
        info: single_file_info(),
        announce: "url".into(),
        ..Metainfo::default()
    };

    let mut expected = b"d8:announce3:url13:creation datei0e4:infod6:lengthi5e4:name5:a.txt\
12:piece lengthi4e6:pieces20:"
        .to_vec();
    expected.extend_from_slice(&[0u8; 20]);
    expected.extend_from_slice(b"7:privatei0eee");

    assert_eq!(meta.to_bytes().unwrap(), expected);
}

#[test]
fn test_metainfo_optional_strings() {
    let meta = Metainfo {
        info: single_file_info(),
        announce: "url".into(),
        comment: "hi".into(),
        created_by: "me".into(),
        creation_date: 7,
        ..Metainfo::default()
    };

    let bytes = meta.to_bytes().unwrap();
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.starts_with("d8:announce3:url7:comment2:hi10:created by2:me13:creation datei7e4:infod"));
    assert!(!text.contains("encoding"));
    assert!(!text.contains("md5sum"));
    assert!(!text.contains("5:files"));
}

#[test]
fn test_metainfo_roundtrip() {
    let meta = Metainfo {
        info: Info {
            name: "bundle".into(),
            files: vec![
                FileInfo {
                    path: vec!["docs".into(), "a.txt".into()],
                    length: 3,
                    md5sum: String::new(),
                },
                FileInfo {
                    path: vec!["b.txt".into()],
                    length: 9,
                    md5sum: HELLO_MD5.into(),
                },
            ],
            pieces: vec![1u8; 40].into(),
            piece_length: 8,
            private: true,
            ..Info::default()
        },
        announce: "http://tracker.example.com/announce".into(),
        comment: "test".into(),
        ..Metainfo::default()
    };

    let bytes = meta.to_bytes().unwrap();
    let decoded = Metainfo::from_bytes(&bytes).unwrap();
    assert_eq!(decoded, meta);
    assert_eq!(decoded.info.total_length(), 12);
    assert_eq!(decoded.info.piece_count(), 2);
    assert!(!decoded.info.is_single_file());
    assert_eq!(raw_info_hash(&bytes).unwrap(), meta.info_hash().unwrap());
}

#[test]
fn test_metainfo_decode_ignores_unknown_keys() {
    let data = b"d8:announce3:url13:announce-listll3:urlee4:infod6:lengthi5e4:name5:a.txt\
12:piece lengthi4e6:pieces0:6:sourcei1ee3:zzzi1ee";

    let meta = Metainfo::from_bytes(data).unwrap();
    assert_eq!(meta.announce, "url");
    assert_eq!(meta.info.name, "a.txt");
    assert_eq!(meta.info.length, 5);
    assert_eq!(meta.info.piece_length, 4);
    assert!(meta.info.pieces.is_empty());
    assert!(!meta.info.private);
}

#[test]
fn test_raw_info_hash_keeps_unknown_keys() {
    let info = b"d6:lengthi5e4:name5:a.txt12:piece lengthi4e6:pieces0:6:sourcei1ee";
    let mut data = b"d8:announce3:url4:info".to_vec();
    data.extend_from_slice(info);
    data.push(b'e');

    let raw = raw_info_hash(&data).unwrap();
    assert_eq!(raw, InfoHash::of_encoded(info));

    let meta = Metainfo::from_bytes(&data).unwrap();
    assert_ne!(raw, meta.info_hash().unwrap());
}

#[test]
fn test_raw_info_hash_missing_info() {
    assert!(matches!(
        raw_info_hash(b"d8:announce3:urle"),
        Err(MetainfoError::InvalidField("info"))
    ));
    assert!(matches!(
        raw_info_hash(b"d8:announce3:url"),
        Err(MetainfoError::Bencode(_))
    ));
}

#[test]
fn test_info_validate() {
    assert!(single_file_info().validate().is_ok());

    assert!(matches!(
        Info::default().validate(),
        Err(MetainfoError::InvalidPieceLength(0))
    ));

    let mut info = single_file_info();
    info.pieces = vec![0u8; 19].into();
    assert!(matches!(info.validate(), Err(MetainfoError::InvalidField("pieces"))));

    let mut info = single_file_info();
    info.name.clear();
    assert!(matches!(info.validate(), Err(MetainfoError::InvalidField("name"))));
}

#[test]
fn test_piece_hash_lookup() {
    let mut pieces = vec![0u8; 20];
    pieces.extend_from_slice(&[7u8; 20]);
    let info = Info {
        pieces: pieces.into(),
        ..Info::default()
    };

    assert_eq!(info.piece_hash(1), Some([7u8; 20]));
    assert_eq!(info.piece_hash(2), None);
    assert_eq!(info.piece_hash(usize::MAX), None);
}

#[test]
fn test_piece_hasher_boundaries() {
    let mut hasher = PieceHasher::new(4).unwrap();
    hasher.update(b"abcdefgh");
    hasher.finish();
    assert_eq!(hasher.pieces().len(), 2 * PIECE_HASH_LEN);
    assert_eq!(hasher.total(), 8);
    assert_eq!(&hasher.pieces()[..20], Sha1::digest(b"abcd").as_slice());
    assert_eq!(&hasher.pieces()[20..], Sha1::digest(b"efgh").as_slice());
}

#[test]
fn test_piece_hasher_chunking_is_irrelevant() {
    let data: Vec<u8> = (0..100u8).collect();

    let mut whole = PieceHasher::new(7).unwrap();
    whole.update(&data);
    whole.finish();

    let mut pieces = PieceHasher::new(7).unwrap();
    for chunk in data.chunks(3) {
        pieces.update(chunk);
    }
    pieces.finish();

    assert_eq!(whole.pieces(), pieces.pieces());
    assert_eq!(whole.pieces().len(), 15 * PIECE_HASH_LEN);
    assert_eq!(&whole.pieces()[14 * 20..], Sha1::digest(&data[98..]).as_slice());
}

#[test]
fn test_piece_hasher_empty() {
    let mut hasher = PieceHasher::new(4).unwrap();
    hasher.finish();
    assert!(hasher.pieces().is_empty());
    assert!(matches!(
        PieceHasher::new(0),
        Err(MetainfoError::InvalidPieceLength(0))
    ));
}

#[test]
fn test_writer_multi_file() {
    let mut writer = Writer::new(4).unwrap();
    writer.open(["docs", "a.txt"]).unwrap();
    writer.write_all(b"hello").unwrap();
    writer.open(["b.txt"]).unwrap();
    writer.write_all(b"world").unwrap();

    let meta = writer.metainfo("bundle", "url").unwrap();
    assert_eq!(meta.announce, "url");
    assert_eq!(meta.info.name, "bundle");
    assert_eq!(meta.info.piece_length, 4);
    assert_eq!(meta.info.length, 0);

    let files = &meta.info.files;
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].path, vec!["docs".to_string(), "a.txt".to_string()]);
    assert_eq!(files[0].length, 5);
    assert_eq!(files[0].md5sum, HELLO_MD5);
    assert_eq!(files[1].path, vec!["b.txt".to_string()]);
    assert_eq!(files[1].md5sum, hex_encode(&Md5::digest(b"world")));

    // Pieces run across the file boundary.
    assert_eq!(meta.info.piece_count(), 3);
    assert_eq!(&meta.info.piece_hash(0).unwrap()[..], Sha1::digest(b"hell").as_slice());
    assert_eq!(&meta.info.piece_hash(1).unwrap()[..], Sha1::digest(b"owor").as_slice());
    assert_eq!(&meta.info.piece_hash(2).unwrap()[..], Sha1::digest(b"ld").as_slice());

    let bytes = meta.to_bytes().unwrap();
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("6:lengthi0e"));
    assert!(text.contains("7:privatei0e"));
}

#[test]
fn test_writer_empty_file_entry() {
    let writer = Writer::new(4).unwrap();
    writer.open(["empty"]).unwrap();
    writer.open(["x"]).unwrap();
    writer.write_bytes(b"x").unwrap();

    let meta = writer.metainfo("dir", "url").unwrap();
    assert_eq!(meta.info.files.len(), 2);
    assert_eq!(meta.info.files[0].length, 0);
    assert_eq!(meta.info.files[0].md5sum, "d41d8cd98f00b204e9800998ecf8427e");
    assert_eq!(meta.info.piece_count(), 1);
}

#[test]
fn test_writer_single_file() {
    let mut writer = Writer::new_single(4, "a.txt").unwrap();
    writer.write_all(b"hello").unwrap();

    assert!(matches!(writer.open(["b.txt"]), Err(MetainfoError::SingleFileMode)));

    let meta = writer.metainfo("ignored", "url").unwrap();
    assert!(meta.info.is_single_file());
    assert_eq!(meta.info.name, "a.txt");
    assert_eq!(meta.info.length, 5);
    assert_eq!(meta.info.md5sum, HELLO_MD5);
    assert_eq!(meta.info.piece_count(), 2);
    assert!(meta.info.validate().is_ok());
}

#[test]
fn test_writer_errors() {
    assert!(matches!(Writer::new(0), Err(MetainfoError::InvalidPieceLength(0))));
    assert!(matches!(Writer::new(-5), Err(MetainfoError::InvalidPieceLength(-5))));

    let writer = Writer::new(4).unwrap();
    assert!(matches!(writer.write_bytes(b"x"), Err(MetainfoError::NoOpenFile)));
    assert!(matches!(writer.metainfo("dir", "url"), Err(MetainfoError::NoFiles)));

    let writer = Writer::new(4).unwrap();
    writer.open(["a"]).unwrap();
    writer.close().unwrap();
    assert!(matches!(writer.write_bytes(b"x"), Err(MetainfoError::Closed)));
    assert!(matches!(writer.open(["b"]), Err(MetainfoError::Closed)));
    assert!(matches!(writer.close(), Err(MetainfoError::Closed)));

    // Building after an explicit close still works.
    let meta = writer.metainfo("dir", "url").unwrap();
    assert_eq!(meta.info.files.len(), 1);
    assert!(meta.info.pieces.is_empty());
}

#[test]
fn test_writer_io_error_surfaces() {
    let mut writer = Writer::new(4).unwrap();
    let err = writer.write_all(b"x").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::Other);
}

#[test]
fn test_writer_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Writer>();
}

#[test]
fn test_collect_files() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("b.txt"), b"bb").unwrap();
    fs::write(dir.path().join("a.txt"), b"a").unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub").join("c.txt"), b"ccc").unwrap();

    let files = collect_files(dir.path(), true).unwrap();
    let names: Vec<Vec<String>> = files.iter().map(|f| f.components.clone()).collect();
    assert_eq!(
        names,
        vec![
            vec!["a.txt".to_string()],
            vec!["b.txt".to_string()],
            vec!["sub".to_string(), "c.txt".to_string()],
        ]
    );

    assert!(matches!(
        collect_files(dir.path(), false),
        Err(MetainfoError::IsDirectory(_))
    ));

    let single = collect_files(&dir.path().join("a.txt"), false).unwrap();
    assert_eq!(single.len(), 1);
    assert_eq!(single[0].components, vec!["a.txt".to_string()]);

    assert!(matches!(
        collect_files(&dir.path().join("missing"), false),
        Err(MetainfoError::Io(_))
    ));
}

#[test]
fn test_build_single_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hello.txt");
    fs::write(&path, b"hello").unwrap();

    let meta = build_from_paths(&[path], false, 4, "url").unwrap();
    assert!(meta.info.is_single_file());
    assert_eq!(meta.info.name, "hello.txt");
    assert_eq!(meta.info.length, 5);
    assert_eq!(meta.info.md5sum, HELLO_MD5);
    assert_eq!(meta.info.piece_count(), 2);
    assert_eq!(meta.announce, "url");
}

#[test]
fn test_build_directory() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("bundle");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("a.txt"), b"hello").unwrap();
    fs::write(root.join("b.txt"), b"world").unwrap();

    let meta = build_from_paths(&[root.clone()], true, 4, "url").unwrap();
    assert_eq!(meta.info.name, "bundle");
    assert_eq!(meta.info.files.len(), 2);
    assert_eq!(meta.info.total_length(), 10);
    assert_eq!(meta.info.piece_count(), 3);
    assert_eq!(&meta.info.piece_hash(1).unwrap()[..], Sha1::digest(b"owor").as_slice());

    assert!(matches!(
        build_from_paths(&[root], false, 4, "url"),
        Err(MetainfoError::IsDirectory(_))
    ));
    assert!(matches!(
        build_from_paths(&[], true, 4, "url"),
        Err(MetainfoError::NoFiles)
    ));
}

#[test]
fn test_build_several_files() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    fs::write(&a, b"hello").unwrap();
    fs::write(&b, b"world").unwrap();

    let meta = build_from_paths(&[a, b], false, 16, "url").unwrap();
    assert!(!meta.info.is_single_file());
    assert_eq!(meta.info.name, "a.txt");
    assert_eq!(meta.info.files.len(), 2);
    assert_eq!(meta.info.files[1].path, vec!["b.txt".to_string()]);
    assert_eq!(meta.info.piece_count(), 1);
}
