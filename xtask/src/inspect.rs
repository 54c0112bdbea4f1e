//! xtask inspect: run the playback demuxer over `.opus` files on the host.
//!
//! Each file goes through the same header verifier and packet assembler the
//! firmware uses, so a file that inspects cleanly here will stream on the
//! device. A directory is walked recursively.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use platform::config::TRACK_EXTENSION;
use platform::storage_local::LocalFileStorage;
use platform::Storage;
use playback::ogg::GRANULE_NONE;
use playback::{verify_headers, ContinuationPolicy, DemuxState, OpusStreamInfo};
use walkdir::WalkDir;

/// Opus always decodes at 48 kHz; granule positions count at that rate.
const OPUS_RATE: u64 = 48_000;

/// Demux statistics for one file.
#[derive(Debug)]
pub(crate) struct Report {
    pub info: OpusStreamInfo,
    pub packets: u32,
    pub pages: u32,
    pub payload_bytes: u64,
    pub largest_packet: usize,
    pub final_granule: u64,
}

impl Report {
    /// Playable duration: last granule less pre-skip.
    pub fn duration_ms(&self) -> u64 {
        if self.final_granule == GRANULE_NONE {
            return 0;
        }
        self.final_granule
            .saturating_sub(u64::from(self.info.pre_skip))
            .saturating_mul(1000)
            .checked_div(OPUS_RATE)
            .unwrap_or(0)
    }
}

/// Entry point called from main.rs
pub fn run(path: Option<&Path>, strict: bool, packets: bool) -> Result<()> {
    let root = match path {
        Some(p) => p.to_path_buf(),
        None => std::env::var(platform::config::MUSIC_PATH_ENV)
            .map(PathBuf::from)
            .context("no path given and MUSIC_PATH is not set")?,
    };
    let files = collect_tracks(&root)?;
    println!();
    println!(
        "{}",
        format!("🔎 Inspecting {} file(s) under {}", files.len(), root.display())
            .cyan()
            .bold()
    );
    println!();

    let policy = if strict {
        ContinuationPolicy::Strict
    } else {
        ContinuationPolicy::Lenient
    };
    let mut failures = 0usize;
    for file in &files {
        match embassy_futures::block_on(inspect_file(file, policy, packets)) {
            Ok(report) => print_report(file, &report),
            Err(e) => {
                failures = failures.saturating_add(1);
                eprintln!("{} {}: {e:#}", "  ✗".red().bold(), file.display());
            }
        }
    }

    println!();
    if failures > 0 {
        anyhow::bail!("{failures} of {} file(s) failed", files.len());
    }
    println!("{}", format!("✓ {} file(s) OK", files.len()).green().bold());
    Ok(())
}

/// A single track, or every track under a directory in name order.
pub(crate) fn collect_tracks(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking {}", path.display()))?;
        let is_track = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(TRACK_EXTENSION));
        if entry.file_type().is_file() && is_track {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Verify headers and demux every packet of `path`.
pub(crate) async fn inspect_file(path: &Path, policy: ContinuationPolicy, trace_packets: bool) -> Result<Report> {
    let dir = path.parent().and_then(Path::to_str).unwrap_or(".");
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("file name is not UTF-8")?;
    let mut storage = LocalFileStorage::new(dir);
    let mut file = storage.open_file(name).await.context("open")?;

    let info = verify_headers(&mut file).await.context("stream headers")?;
    tracing::debug!(channels = info.channels, pre_skip = info.pre_skip, "headers verified");

    let mut demux = DemuxState::new(policy);
    let mut buf = vec![0u8; playback::demux::MAX_PACKET_LEN];
    let mut payload_bytes = 0u64;
    let mut largest_packet = 0usize;
    loop {
        let outcome = demux
            .next_packet(&mut file, &mut buf)
            .await
            .with_context(|| format!("packet {}", demux.packets_read()))?;
        if let Some(len) = outcome.len() {
            payload_bytes = payload_bytes.saturating_add(len as u64);
            largest_packet = largest_packet.max(len);
            if trace_packets {
                println!(
                    "    packet {:>6}  {:>5} B  granule {}",
                    demux.packets_read(),
                    len,
                    demux.granule_position()
                );
            }
        }
        if outcome.is_last() {
            break;
        }
    }

    Ok(Report {
        info,
        packets: demux.packets_read(),
        pages: demux.pages_read(),
        payload_bytes,
        largest_packet,
        final_granule: demux.granule_position(),
    })
}

fn print_report(path: &Path, report: &Report) {
    let info = &report.info;
    let ms = report.duration_ms();
    println!("{} {}", "  ✓".green().bold(), path.display().to_string().bold());
    println!(
        "      {} ch, pre-skip {}, source {} Hz, gain {}, vendor \"{}\"",
        info.channels,
        info.pre_skip,
        info.input_sample_rate,
        info.output_gain,
        info.vendor
    );
    for comment in &info.comments {
        println!("      {}", comment.as_str().dimmed());
    }
    if info.comments_dropped > 0 {
        println!("      {}", format!("({} tag(s) not shown)", info.comments_dropped).dimmed());
    }
    println!(
        "      {} packets on {} pages, {} bytes (largest {}), granule {}, {}:{:02}.{:03}",
        report.packets,
        report.pages,
        report.payload_bytes,
        report.largest_packet,
        report.final_granule,
        ms / 60_000,
        (ms / 1000) % 60,
        ms % 1000
    );
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::cast_possible_truncation,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn page(flags: u8, granule: u64, seq: u32, packets: &[&[u8]]) -> Vec<u8> {
        let mut lacing = Vec::new();
        let mut payload = Vec::new();
        for p in packets {
            lacing.extend(std::iter::repeat(255u8).take(p.len() / 255));
            lacing.push((p.len() % 255) as u8);
            payload.extend_from_slice(p);
        }
        let mut out = b"OggS\0".to_vec();
        out.push(flags);
        out.extend_from_slice(&granule.to_le_bytes());
        out.extend_from_slice(&7u32.to_le_bytes());
        out.extend_from_slice(&seq.to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.push(lacing.len() as u8);
        out.extend(lacing);
        out.extend(payload);
        out
    }

    fn track() -> Vec<u8> {
        let mut head = b"OpusHead".to_vec();
        head.extend_from_slice(&[1, 2]);
        head.extend_from_slice(&312u16.to_le_bytes());
        head.extend_from_slice(&44_100u32.to_le_bytes());
        head.extend_from_slice(&[0, 0, 0]);
        let mut tags = b"OpusTags".to_vec();
        tags.extend_from_slice(&3u32.to_le_bytes());
        tags.extend_from_slice(b"enc");
        tags.extend_from_slice(&1u32.to_le_bytes());
        tags.extend_from_slice(&10u32.to_le_bytes());
        tags.extend_from_slice(b"TITLE=Test");

        let mut out = page(0x02, 0, 0, &[&head]);
        out.extend(page(0, 0, 1, &[&tags]));
        out.extend(page(0, 48_312, 2, &[&[1; 100], &[2; 300]]));
        out.extend(page(0x04, 96_312, 3, &[&[3; 50]]));
        out
    }

    #[test]
    fn inspect_reports_stream_totals() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("one.opus");
        fs::write(&path, track()).unwrap();

        let report = embassy_futures::block_on(inspect_file(&path, ContinuationPolicy::Strict, false)).unwrap();
        assert_eq!(report.info.pre_skip, 312);
        assert_eq!(report.info.comment("title"), Some("Test"));
        assert_eq!(report.packets, 3);
        assert_eq!(report.pages, 2);
        assert_eq!(report.payload_bytes, 450);
        assert_eq!(report.largest_packet, 300);
        assert_eq!(report.final_granule, 96_312);
        assert_eq!(report.duration_ms(), 2_000);
    }

    #[test]
    fn inspect_rejects_non_ogg() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("fake.opus");
        fs::write(&path, b"ID3\x03 this is an mp3 renamed to opus").unwrap();
        let err = embassy_futures::block_on(inspect_file(&path, ContinuationPolicy::Lenient, false)).unwrap_err();
        assert!(format!("{err:#}").contains("not an Ogg stream"));
    }

    #[test]
    fn collect_finds_tracks_recursively() {
        let tmp = TempDir::new().unwrap();
        let album = tmp.path().join("Artist").join("Album");
        fs::create_dir_all(&album).unwrap();
        fs::write(album.join("01.opus"), track()).unwrap();
        fs::write(album.join("02.OPUS"), track()).unwrap();
        fs::write(album.join("cover.jpg"), b"jpeg").unwrap();

        let files = collect_tracks(tmp.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("01.opus"));
    }

    #[test]
    fn run_fails_when_any_file_is_bad() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("good.opus"), track()).unwrap();
        fs::write(tmp.path().join("bad.opus"), b"nope").unwrap();
        assert!(run(Some(tmp.path()), false, false).is_err());
    }
}
