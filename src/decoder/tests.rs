use super::*;
use crate::error::DecodeError;
use crate::kernels::zstd::{encode, encode_frames};

/// Test helper: decodes every chunk of an in-memory archive.
fn collect_chunks(archive: &[u8], block_size: usize) -> Result<Vec<DecodedChunk>, IngestError> {
    let config = IngestConfig::default().with_read_block_size(block_size);
    FrameChunks::new(archive, &config)?.collect()
}

fn joined(chunks: &[DecodedChunk]) -> String {
    chunks.iter().map(|c| c.text.as_str()).collect()
}

#[test]
fn test_chunks_reconstruct_the_stream() {
    let text = "line one\nline two\nline three\n".repeat(50);
    let archive = encode(text.as_bytes(), 3).unwrap();

    let chunks = collect_chunks(&archive, 64).unwrap();
    assert!(chunks.len() > 1);
    assert_eq!(joined(&chunks), text);
}

#[test]
fn test_chunk_offsets_are_contiguous() {
    let text = "abcdefghij".repeat(30);
    let archive = encode(text.as_bytes(), 3).unwrap();

    let chunks = collect_chunks(&archive, 7).unwrap();
    let mut expected_offset = 0u64;
    for chunk in &chunks {
        assert_eq!(chunk.decompressed_offset, expected_offset);
        expected_offset += chunk.text.len() as u64;
    }
    assert_eq!(expected_offset, text.len() as u64);
    // Once the stream is exhausted the whole archive has been consumed.
    assert_eq!(chunks.last().unwrap().compressed_offset, archive.len() as u64);
}

#[test]
fn test_iterator_reports_running_offsets() {
    let text = "0123456789".repeat(20);
    let archive = encode(text.as_bytes(), 3).unwrap();
    let config = IngestConfig::default().with_read_block_size(50);
    let mut chunks = FrameChunks::new(archive.as_slice(), &config).unwrap();

    let first = chunks.next().unwrap().unwrap();
    assert_eq!(chunks.decompressed_offset(), 50);
    assert_eq!(chunks.compressed_offset(), first.compressed_offset);
    assert!(chunks.compressed_offset() <= archive.len() as u64);

    for chunk in chunks.by_ref() {
        chunk.unwrap();
    }
    assert_eq!(chunks.decompressed_offset(), text.len() as u64);
    assert_eq!(chunks.compressed_offset(), archive.len() as u64);
}

#[test]
fn test_multibyte_character_split_across_blocks() {
    // "日" is three bytes; a block size of 2 splits every other character.
    let text = "日本語のテキスト\n";
    let archive = encode(text.as_bytes(), 3).unwrap();

    let chunks = collect_chunks(&archive, 2).unwrap();
    assert_eq!(joined(&chunks), text);
    assert!(chunks.iter().any(|c| !c.retries.is_empty()));
    for chunk in &chunks {
        assert!(!chunk.text.is_empty());
    }
}

#[test]
fn test_block_size_does_not_change_the_text() {
    let text = "emoji 😀 and accents é ü, over and over\n".repeat(40);
    let archive = encode(text.as_bytes(), 3).unwrap();

    for block_size in [1, 2, 3, 5, 13, 64, 4096, 1 << 20] {
        let chunks = collect_chunks(&archive, block_size).unwrap();
        assert_eq!(joined(&chunks), text, "block size {}", block_size);
    }
}

#[test]
fn test_concatenated_frames_are_one_stream() {
    let archive = encode_frames(&[b"{\"a\":1}\n", b"{\"a\":2}\n"], 3).unwrap();
    let chunks = collect_chunks(&archive, 1024).unwrap();
    assert_eq!(joined(&chunks), "{\"a\":1}\n{\"a\":2}\n");
}

#[test]
fn test_empty_archive_yields_nothing() {
    let archive = encode(b"", 3).unwrap();
    let chunks = collect_chunks(&archive, 1024).unwrap();
    assert!(chunks.is_empty());
}

#[test]
fn test_truncated_archive_is_an_error_not_an_empty_result() {
    let text = "some reasonably long line of text\n".repeat(100);
    let mut archive = encode(text.as_bytes(), 3).unwrap();
    archive.truncate(archive.len() - 4);

    let result = collect_chunks(&archive, 1 << 20);
    assert!(matches!(result, Err(IngestError::Io(_))), "{:?}", result);
}

#[test]
fn test_garbage_archive_is_an_error() {
    let result = collect_chunks(b"this is not zstd at all", 1024);
    assert!(matches!(result, Err(IngestError::Io(_))));
}

#[test]
fn test_invalid_utf8_is_a_decode_error() {
    let mut raw = b"ok line\n".to_vec();
    raw.extend_from_slice(&[0xC0, 0x80]);
    raw.extend_from_slice(b" more\n");
    let archive = encode(&raw, 3).unwrap();

    let result = collect_chunks(&archive, 1024);
    assert!(matches!(
        result,
        Err(IngestError::Decode(DecodeError::InvalidUtf8 { offset: 8 }))
    ));
}

#[test]
fn test_stream_ending_mid_character_is_a_decode_error() {
    let raw = "end 😀".as_bytes();
    let archive = encode(&raw[..raw.len() - 1], 3).unwrap();

    let result = collect_chunks(&archive, 1024);
    assert!(matches!(
        result,
        Err(IngestError::Decode(DecodeError::TruncatedCharacter { pending: 3 }))
    ));
}

#[test]
fn test_retry_ceiling_stops_accumulation() {
    let archive = encode("😀".as_bytes(), 3).unwrap();
    let config = IngestConfig::default()
        .with_read_block_size(1)
        .with_decode_retry_ceiling(2);

    let result: Result<Vec<_>, _> = FrameChunks::new(archive.as_slice(), &config)
        .unwrap()
        .collect();
    assert!(matches!(
        result,
        Err(IngestError::Decode(DecodeError::RetryCeilingExceeded {
            bytes_read: 3,
            ceiling: 2
        }))
    ));
}

#[test]
fn test_iterator_is_fused_after_an_error() {
    let config = IngestConfig::default().with_read_block_size(16);
    let mut chunks = FrameChunks::new(&b"not a zstd stream"[..], &config).unwrap();

    assert!(matches!(chunks.next(), Some(Err(_))));
    assert!(chunks.next().is_none());
    assert!(chunks.next().is_none());
}

#[test]
fn test_missing_file_is_an_archive_io_error() {
    let path = std::env::temp_dir().join("reddit_ingest_definitely_missing.zst");
    let result = produce_chunks(&path, &IngestConfig::default());
    match result {
        Err(IngestError::Archive { path: p, source }) => {
            assert_eq!(p, path);
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("expected an error"),
    }
}
