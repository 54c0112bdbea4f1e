//! Criterion benchmarks for the Ogg/Opus demuxer.
//!
//! Run: cargo bench -p playback --bench demux
//!
//!   demux_packets/*: packets per second for typical and large packet sizes
//!   demux_chunked/*: same stream read through small storage reads
//!   verify_headers: header pages including a multi-page comment packet

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation,
    missing_docs,
)]

use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use platform::Storage;
use platform::mocks::{MemoryFile, MemoryStorage};
use playback::{ContinuationPolicy, DemuxState, verify_headers};
use tokio::runtime::Builder;

// ---------------------------------------------------------------------------
// Stream synthesis
// ---------------------------------------------------------------------------

fn page(flags: u8, seq: u32, lacing: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut out = b"OggS\0".to_vec();
    out.push(flags);
    out.extend_from_slice(&u64::from(seq).saturating_mul(960).to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&seq.to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.push(lacing.len() as u8);
    out.extend_from_slice(lacing);
    out.extend_from_slice(payload);
    out
}

fn lacing(len: usize) -> Vec<u8> {
    let mut v = vec![255u8; len / 255];
    v.push((len % 255) as u8);
    v
}

/// `packets` audio packets of `size` bytes, `per_page` to a page.
fn audio_stream(packets: usize, size: usize, per_page: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let pages = packets.div_ceil(per_page);
    for p in 0..pages {
        let count = per_page.min(packets - p * per_page);
        let mut lace = Vec::new();
        for _ in 0..count {
            lace.extend(lacing(size));
        }
        let flags = if p + 1 == pages { 0x04 } else { 0 };
        out.extend(page(flags, p as u32, &lace, &vec![0x5A; size * count]));
    }
    out
}

fn header_stream() -> Vec<u8> {
    let mut head = b"OpusHead".to_vec();
    head.extend_from_slice(&[1, 2, 0x38, 0x01, 0x80, 0xBB, 0, 0, 0, 0, 0]);
    let mut tags = b"OpusTags".to_vec();
    tags.extend_from_slice(&4u32.to_le_bytes());
    tags.extend_from_slice(b"best");
    tags.extend_from_slice(&1u32.to_le_bytes());
    let art = vec![b'A'; 8 * 1024];
    tags.extend_from_slice(&(art.len() as u32).to_le_bytes());
    tags.extend_from_slice(&art);

    let mut out = page(0x02, 0, &lacing(head.len()), &head);
    // Comment packet spread over pages of 16 full segments each.
    let chunk = 255 * 16;
    let mut seq = 1;
    let mut offset = 0;
    while tags.len() - offset > chunk {
        let flags = if offset == 0 { 0 } else { 0x01 };
        out.extend(page(flags, seq, &[255; 16], &tags[offset..offset + chunk]));
        offset += chunk;
        seq += 1;
    }
    out.extend(page(0x01, seq, &lacing(tags.len() - offset), &tags[offset..]));
    out
}

async fn drain(file: &mut MemoryFile) -> usize {
    let mut demux = DemuxState::new(ContinuationPolicy::Lenient);
    let mut buf = [0u8; 4096];
    loop {
        let outcome = demux.next_packet(file, &mut buf).await.unwrap();
        if outcome.is_last() {
            return demux.packets_read() as usize;
        }
    }
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_demux(c: &mut Criterion) {
    let rt = Builder::new_current_thread().enable_all().build().unwrap();
    let mut group = c.benchmark_group("demux_packets");
    group.measurement_time(Duration::from_secs(5));

    // 160 B ≈ 64 kb/s at 20 ms; 1200 B ≈ 96 kb/s at 100 ms, spans segments.
    for size in [160usize, 1200] {
        let stream = audio_stream(1_000, size, 10);
        group.throughput(Throughput::Elements(1_000));
        group.bench_with_input(BenchmarkId::new("bytes", size), &stream, |b, stream| {
            b.to_async(&rt).iter(|| {
                let mut file = MemoryFile::new(stream.clone());
                async move { assert_eq!(drain(&mut file).await, 1_000) }
            });
        });
    }
    group.finish();
}

fn bench_chunked(c: &mut Criterion) {
    let rt = Builder::new_current_thread().enable_all().build().unwrap();
    let mut group = c.benchmark_group("demux_chunked");
    let stream = audio_stream(500, 160, 10);

    for chunk in [64usize, 512] {
        group.bench_with_input(BenchmarkId::new("chunk", chunk), &chunk, |b, &chunk| {
            b.to_async(&rt).iter(|| {
                let mut storage = MemoryStorage::new().with_file("b.opus", stream.clone()).with_chunk(chunk);
                async move {
                    let mut file = storage.open_file("b.opus").await.unwrap();
                    assert_eq!(drain(&mut file).await, 500);
                }
            });
        });
    }
    group.finish();
}

fn bench_headers(c: &mut Criterion) {
    let rt = Builder::new_current_thread().enable_all().build().unwrap();
    let stream = header_stream();

    c.bench_function("verify_headers", |b| {
        b.to_async(&rt).iter(|| {
            let mut file = MemoryFile::new(stream.clone());
            async move {
                let info = verify_headers(&mut file).await.unwrap();
                assert_eq!(info.pre_skip, 312);
            }
        });
    });
}

criterion_group!(benches, bench_demux, bench_chunked, bench_headers);
criterion_main!(benches);
