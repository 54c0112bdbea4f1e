//! Packet assembly from Ogg pages: lacing, page boundaries, end of stream.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

mod common;

use common::{ogg, Page};
use platform::mocks::{MemoryFile, MemoryStorage};
use platform::Storage;
use playback::{ContinuationPolicy, DemuxState, FormatError, PacketOutcome};
use proptest::prelude::*;

fn bytes(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add(i as u8)).collect()
}

/// Drain every packet; stops at the first error or the last packet.
async fn collect(file: &mut MemoryFile, policy: ContinuationPolicy) -> Result<Vec<Vec<u8>>, FormatError> {
    let mut demux = DemuxState::new(policy);
    let mut buf = vec![0u8; 65_535];
    let mut packets = Vec::new();
    loop {
        let outcome = demux.next_packet(file, &mut buf).await?;
        if let Some(len) = outcome.len() {
            packets.push(buf[..len].to_vec());
        }
        if outcome.is_last() {
            return Ok(packets);
        }
    }
}

#[tokio::test]
async fn lacing_values_sum_to_packet_lengths() {
    let sizes = [1usize, 100, 254, 255, 256, 510, 1000];
    let mut page = Page::new();
    for (i, &n) in sizes.iter().enumerate() {
        page = page.packet(&bytes(n, i as u8));
    }
    let mut file = MemoryFile::new(ogg(&[page.eos()]));

    let packets = collect(&mut file, ContinuationPolicy::Lenient).await.unwrap();
    let lens: Vec<usize> = packets.iter().map(Vec::len).collect();
    assert_eq!(lens, sizes);
    for (i, p) in packets.iter().enumerate() {
        assert_eq!(p, &bytes(sizes[i], i as u8));
    }
}

#[tokio::test]
async fn packet_spanning_pages_is_contiguous() {
    let whole = bytes(255 * 2 + 40, 7);
    let pages = [
        Page::new().packet(b"head").fragment(&whole[..510]),
        Page::new().continued().packet(&whole[510..]).eos(),
    ];
    let mut file = MemoryFile::new(ogg(&pages));

    let packets = collect(&mut file, ContinuationPolicy::Strict).await.unwrap();
    assert_eq!(packets.len(), 2);
    assert_eq!(packets[0], b"head");
    assert_eq!(packets[1], whole);
}

#[tokio::test]
async fn packet_spanning_three_pages() {
    let whole = bytes(255 * 3 + 1, 3);
    let pages = [
        Page::new().fragment(&whole[..255]),
        Page::new().continued().fragment(&whole[255..765]),
        Page::new().continued().packet(&whole[765..]).eos(),
    ];
    let mut file = MemoryFile::new(ogg(&pages));

    let mut demux = DemuxState::new(ContinuationPolicy::Strict);
    let mut buf = [0u8; 1024];
    let outcome = demux.next_packet(&mut file, &mut buf).await.unwrap();
    assert_eq!(outcome, PacketOutcome::Done(whole.len()));
    assert_eq!(&buf[..whole.len()], whole.as_slice());
    assert_eq!(demux.pages_read(), 3);
}

#[tokio::test]
async fn lenient_ignores_missing_continuation_flag() {
    let whole = bytes(300, 1);
    let pages = [
        Page::new().fragment(&whole[..255]),
        Page::new().packet(&whole[255..]).eos(),
    ];

    let mut lenient = MemoryFile::new(ogg(&pages));
    let packets = collect(&mut lenient, ContinuationPolicy::Lenient).await.unwrap();
    assert_eq!(packets, vec![whole]);

    let mut strict = MemoryFile::new(ogg(&pages));
    assert_eq!(
        collect(&mut strict, ContinuationPolicy::Strict).await,
        Err(FormatError::BrokenContinuation)
    );
}

#[tokio::test]
async fn strict_rejects_spurious_continuation_flag() {
    let pages = [
        Page::new().packet(b"one"),
        Page::new().continued().packet(b"two").eos(),
    ];
    let mut file = MemoryFile::new(ogg(&pages));
    assert_eq!(
        collect(&mut file, ContinuationPolicy::Strict).await,
        Err(FormatError::BrokenContinuation)
    );
}

#[tokio::test]
async fn zero_segment_pages_are_passed_over() {
    let pages = [
        Page::new().packet(b"first"),
        Page::new(),
        Page::new(),
        Page::new().packet(b"second").eos(),
    ];
    let mut file = MemoryFile::new(ogg(&pages));
    let packets = collect(&mut file, ContinuationPolicy::Lenient).await.unwrap();
    assert_eq!(packets, vec![b"first".to_vec(), b"second".to_vec()]);
}

#[tokio::test]
async fn last_packet_on_eos_page_is_done() {
    let pages = [
        Page::new().packet(b"a"),
        Page::new().packet(b"b").packet(b"c").eos(),
    ];
    let mut file = MemoryFile::new(ogg(&pages));
    let mut demux = DemuxState::new(ContinuationPolicy::Lenient);
    let mut buf = [0u8; 16];

    assert_eq!(demux.next_packet(&mut file, &mut buf).await, Ok(PacketOutcome::Packet(1)));
    // Not last: the EOS page still has a packet after this one.
    assert_eq!(demux.next_packet(&mut file, &mut buf).await, Ok(PacketOutcome::Packet(1)));
    assert_eq!(demux.next_packet(&mut file, &mut buf).await, Ok(PacketOutcome::Done(1)));
    assert_eq!(&buf[..1], b"c");
    assert_eq!(demux.packets_read(), 3);
}

#[tokio::test]
async fn empty_eos_page_ends_stream() {
    let pages = [Page::new().packet(b"only"), Page::new().eos()];
    let mut file = MemoryFile::new(ogg(&pages));
    let mut demux = DemuxState::new(ContinuationPolicy::Lenient);
    let mut buf = [0u8; 16];

    assert_eq!(demux.next_packet(&mut file, &mut buf).await, Ok(PacketOutcome::Packet(4)));
    assert_eq!(demux.next_packet(&mut file, &mut buf).await, Ok(PacketOutcome::End));
}

#[tokio::test]
async fn zero_length_packet_is_rejected() {
    let pages = [Page::new().raw(&[0], &[]).packet(b"after").eos()];
    let mut file = MemoryFile::new(ogg(&pages));
    let mut demux = DemuxState::new(ContinuationPolicy::Lenient);
    let mut buf = [0u8; 16];
    assert_eq!(
        demux.next_packet(&mut file, &mut buf).await,
        Err(FormatError::EmptyPacket)
    );
}

#[tokio::test]
async fn packet_larger_than_buffer_is_rejected() {
    let pages = [Page::new().packet(&bytes(300, 0)).eos()];
    let mut file = MemoryFile::new(ogg(&pages));
    let mut demux = DemuxState::new(ContinuationPolicy::Lenient);
    let mut buf = [0u8; 256];
    assert_eq!(
        demux.next_packet(&mut file, &mut buf).await,
        Err(FormatError::PacketTooLarge)
    );
}

#[tokio::test]
async fn eos_page_ending_mid_packet_is_truncated() {
    let pages = [Page::new().fragment(&bytes(255, 0)).eos()];
    let mut file = MemoryFile::new(ogg(&pages));
    assert_eq!(
        collect(&mut file, ContinuationPolicy::Lenient).await,
        Err(FormatError::Truncated)
    );
}

#[tokio::test]
async fn cut_payload_is_truncated() {
    let mut data = ogg(&[Page::new().packet(&bytes(100, 0)).eos()]);
    data.truncate(data.len() - 10);
    let mut file = MemoryFile::new(data);
    assert_eq!(
        collect(&mut file, ContinuationPolicy::Lenient).await,
        Err(FormatError::Truncated)
    );
}

#[tokio::test]
async fn missing_next_page_is_truncated() {
    // Packet continues but the file ends after the first page.
    let data = ogg(&[Page::new().fragment(&bytes(255, 0))]);
    let mut file = MemoryFile::new(data);
    assert_eq!(
        collect(&mut file, ContinuationPolicy::Lenient).await,
        Err(FormatError::Truncated)
    );
}

#[tokio::test]
async fn garbage_between_pages_is_not_ogg() {
    let mut data = ogg(&[Page::new().packet(b"x")]);
    data.extend_from_slice(b"ID3\x04garbage-garbage-garbage-garbage");
    let mut file = MemoryFile::new(data);
    assert_eq!(
        collect(&mut file, ContinuationPolicy::Lenient).await,
        Err(FormatError::NotOgg)
    );
}

#[tokio::test]
async fn read_failure_is_truncated() {
    let data = ogg(&[Page::new().packet(&bytes(200, 0)).eos()]);
    let mut storage = MemoryStorage::new().with_file("t.opus", data).fail_reads_at(40);
    let mut file = storage.open_file("t.opus").await.unwrap();
    assert_eq!(
        collect(&mut file, ContinuationPolicy::Lenient).await,
        Err(FormatError::Truncated)
    );
}

#[tokio::test]
async fn granule_follows_pages_that_end_packets() {
    let pages = [
        Page::new().packet(b"a").granule(960),
        Page::new().fragment(&bytes(255, 0)).granule(u64::MAX),
        Page::new().continued().packet(b"tail").granule(2880).eos(),
    ];
    let mut file = MemoryFile::new(ogg(&pages));
    let mut demux = DemuxState::new(ContinuationPolicy::Lenient);
    let mut buf = [0u8; 512];

    demux.next_packet(&mut file, &mut buf).await.unwrap();
    assert_eq!(demux.granule_position(), 960);
    demux.next_packet(&mut file, &mut buf).await.unwrap();
    assert_eq!(demux.granule_position(), 2880);
}

proptest! {
    /// Any chunking of reads yields the same packets.
    #[test]
    fn short_reads_do_not_change_packets(
        sizes in prop::collection::vec(1usize..1200, 1..6),
        chunk in 1usize..64,
    ) {
        let pages: Vec<Page> = sizes
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                let page = Page::new().packet(&bytes(n, i as u8));
                if i + 1 == sizes.len() { page.eos() } else { page }
            })
            .collect();
        let mut storage = MemoryStorage::new().with_file("s.opus", ogg(&pages)).with_chunk(chunk);

        let packets = embassy_futures::block_on(async {
            let mut file = storage.open_file("s.opus").await.unwrap();
            collect(&mut file, ContinuationPolicy::Lenient).await
        })
        .unwrap();

        prop_assert_eq!(packets.len(), sizes.len());
        for (i, p) in packets.iter().enumerate() {
            prop_assert_eq!(p, &bytes(sizes[i], i as u8));
        }
    }

    /// A packet split at any 255-byte boundary reassembles exactly.
    #[test]
    fn split_point_does_not_matter(segments in 2usize..12, tail in 0usize..255, cut_seed in any::<usize>()) {
        let total = segments * 255 + tail;
        let cut = 255 * (1 + cut_seed % (segments - 1));
        let whole = bytes(total, 9);
        let pages = [
            Page::new().fragment(&whole[..cut]),
            Page::new().continued().packet(&whole[cut..]).eos(),
        ];
        let mut file = MemoryFile::new(ogg(&pages));

        let packets = embassy_futures::block_on(collect(&mut file, ContinuationPolicy::Strict)).unwrap();
        prop_assert_eq!(packets, vec![whole]);
    }
}
