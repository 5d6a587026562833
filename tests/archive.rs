use std::sync::Barrier;

use anyhow::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};
use seqarc::{ArcError, Archive, Mode, ParallelWriter, PartEncoder, Trailer, TRAILER_SIZE};

type Parts = Vec<(Vec<u8>, u64)>;

fn random_parts(rng: &mut StdRng, count: usize) -> Parts {
    (0..count)
        .map(|_| {
            let mut data = vec![0u8; rng.random_range(0..512)];
            rng.fill(&mut data[..]);
            (data, rng.random::<u64>())
        })
        .collect()
}

fn drain(archive: &Archive, stream_id: usize) -> Result<Parts> {
    let mut parts = Vec::new();
    let mut buf = Vec::new();
    while let Some(metadata) = archive.get_part(stream_id, &mut buf)? {
        parts.push((buf.clone(), metadata));
    }
    Ok(parts)
}

#[test]
fn random_interleaved_streams_roundtrip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("random.sarc");
    let mut rng = StdRng::seed_from_u64(42);

    let names = ["sequences", "qualities", "headers", "lengths"];
    let expected: Vec<Parts> = names
        .iter()
        .map(|_| {
            let count = rng.random_range(0..40);
            random_parts(&mut rng, count)
        })
        .collect();

    let archive = Archive::create(&path)?;
    let ids = names
        .iter()
        .map(|name| archive.register_stream(name))
        .collect::<seqarc::Result<Vec<_>>>()?;

    // interleave appends across streams in random order
    let mut cursors = vec![0usize; names.len()];
    loop {
        let pending: Vec<usize> = (0..names.len())
            .filter(|&s| cursors[s] < expected[s].len())
            .collect();
        if pending.is_empty() {
            break;
        }
        let s = pending[rng.random_range(0..pending.len())];
        let (data, metadata) = &expected[s][cursors[s]];
        archive.add_part(ids[s], data, *metadata)?;
        cursors[s] += 1;
    }
    for (s, id) in ids.iter().enumerate() {
        let raw: u64 = expected[s].iter().map(|(d, _)| d.len() as u64 * 4).sum();
        archive.set_raw_size(*id, raw)?;
    }
    let written = archive.streams();
    archive.close()?;

    let archive = Archive::load(&path)?;
    assert_eq!(archive.streams(), written);
    for (s, name) in names.iter().enumerate() {
        let id = archive.stream_id(name).expect("stream registered");
        assert_eq!(id, s);
        let data_size: u64 = expected[s].iter().map(|(d, _)| d.len() as u64).sum();
        assert_eq!(archive.stream_packed_data_size(id), data_size);
        assert!(archive.stream_packed_size(id) >= data_size + expected[s].len() as u64);
        assert_eq!(archive.raw_size(id), data_size * 4);
        assert_eq!(drain(&archive, id)?, expected[s]);
    }
    Ok(())
}

#[test]
fn completion_order_does_not_change_read_order() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("order.sarc");

    let archive = Archive::create(&path)?;
    let id = archive.register_stream("reads")?;
    let slots = (0..3)
        .map(|_| archive.add_part_prepare(id))
        .collect::<seqarc::Result<Vec<_>>>()?;

    // complete P3, then P1, then P2
    for &slot in &[slots[2], slots[0], slots[1]] {
        let payload = format!("part-{slot}");
        archive.add_part_complete(id, slot, payload.as_bytes(), slot as u64)?;
    }
    archive.close()?;

    let archive = Archive::load(&path)?;
    let parts = drain(&archive, id)?;
    let expected: Parts = (0..3)
        .map(|i| (format!("part-{i}").into_bytes(), i as u64))
        .collect();
    assert_eq!(parts, expected);
    Ok(())
}

#[test]
fn concurrent_producers_share_one_archive() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("threads.sarc");
    let num_threads = 8;
    let per_thread = 25;

    let archive = Archive::create(&path)?;
    let id = archive.register_stream("reads")?;
    let slots = (0..num_threads * per_thread)
        .map(|_| archive.add_part_prepare(id))
        .collect::<seqarc::Result<Vec<_>>>()?;

    let barrier = Barrier::new(num_threads);
    std::thread::scope(|s| {
        for chunk in slots.chunks(per_thread) {
            let archive = &archive;
            let barrier = &barrier;
            s.spawn(move || {
                barrier.wait();
                // each producer fills its slots back to front
                for &slot in chunk.iter().rev() {
                    let payload = (slot as u32).to_le_bytes();
                    archive
                        .add_part_complete(id, slot, &payload, slot as u64)
                        .unwrap();
                }
            });
        }
    });
    archive.close()?;

    let archive = Archive::load(&path)?;
    let parts = drain(&archive, id)?;
    assert_eq!(parts.len(), slots.len());
    for (i, (data, metadata)) in parts.iter().enumerate() {
        assert_eq!(data, &(i as u32).to_le_bytes());
        assert_eq!(*metadata, i as u64);
    }
    Ok(())
}

#[test]
fn exhausted_stream_keeps_returning_none() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("exhaust.sarc");

    let archive = Archive::create(&path)?;
    let full = archive.register_stream("full")?;
    let empty = archive.register_stream("empty")?;
    archive.add_part(full, b"ACGT", 1)?;
    archive.add_part(full, b"", 2)?;
    archive.close()?;

    let archive = Archive::load(&path)?;
    let mut buf = vec![0xaa; 16];
    assert_eq!(archive.get_part(empty, &mut buf)?, None);
    assert_eq!(archive.get_part(full, &mut buf)?, Some(1));
    assert_eq!(buf, b"ACGT");
    assert_eq!(archive.get_part(full, &mut buf)?, Some(2));
    assert!(buf.is_empty());
    for _ in 0..3 {
        assert_eq!(archive.get_part(full, &mut buf)?, None);
    }
    Ok(())
}

#[test]
fn duplicate_names_resolve_to_first_id() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("dup.sarc");

    let archive = Archive::create(&path)?;
    let first = archive.register_stream("reads")?;
    let second = archive.register_stream("reads")?;
    assert_ne!(first, second);
    archive.add_part(second, b"second", 0)?;
    archive.close()?;

    let archive = Archive::load(&path)?;
    assert_eq!(archive.num_streams(), 2);
    assert_eq!(archive.stream_id("reads"), Some(first));
    assert_eq!(archive.num_parts(first), 0);
    assert_eq!(drain(&archive, second)?, vec![(b"second".to_vec(), 0)]);
    Ok(())
}

#[test]
fn empty_archive_roundtrip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("empty.sarc");

    Archive::create(&path)?.close()?;
    assert_eq!(std::fs::metadata(&path)?.len(), 1 + TRAILER_SIZE as u64);

    let archive = Archive::load(&path)?;
    assert_eq!(archive.num_streams(), 0);
    assert!(archive.streams().is_empty());
    Ok(())
}

#[test]
fn corrupted_trailer_is_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("corrupt.sarc");

    let archive = Archive::create(&path)?;
    let id = archive.register_stream("reads")?;
    archive.add_part(id, b"ACGTACGT", 0)?;
    archive.close()?;
    let pristine = std::fs::read(&path)?;
    let trailer_start = pristine.len() - TRAILER_SIZE;

    // footer offset pointing past the trailer
    let mut bytes = pristine.clone();
    let trailer = Trailer::new(u64::MAX);
    bytes[trailer_start..].copy_from_slice(trailer.as_bytes());
    std::fs::write(&path, &bytes)?;
    assert!(matches!(
        Archive::load(&path),
        Err(ArcError::FooterOutOfRange { .. })
    ));

    // bad version
    let mut bytes = pristine.clone();
    bytes[trailer_start + 12] ^= 0xff;
    std::fs::write(&path, &bytes)?;
    assert!(matches!(
        Archive::load(&path),
        Err(ArcError::InvalidVersion { .. })
    ));

    // truncated file
    std::fs::write(&path, &pristine[..TRAILER_SIZE - 1])?;
    let archive = Archive::new(Mode::Read);
    assert!(archive.open(&path).is_err());
    assert!(!archive.is_open());
    Ok(())
}

/// Encodes each chunk as its run-length pairs.
#[derive(Clone)]
struct RunLength;
impl PartEncoder for RunLength {
    fn encode(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> seqarc::Result<u64> {
        let mut iter = chunk.iter().peekable();
        while let Some(&byte) = iter.next() {
            let mut run = 1u8;
            while run < u8::MAX && iter.peek() == Some(&&byte) {
                iter.next();
                run += 1;
            }
            out.extend_from_slice(&[run, byte]);
        }
        Ok(chunk.len() as u64)
    }
}

fn run_length_decode(packed: &[u8]) -> Vec<u8> {
    packed
        .chunks_exact(2)
        .flat_map(|pair| std::iter::repeat_n(pair[1], pair[0] as usize))
        .collect()
}

#[test]
fn parallel_encoding_alongside_single_shot_parts() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("mixed.sarc");
    let mut rng = StdRng::seed_from_u64(7);

    let chunks: Vec<Vec<u8>> = (0..64)
        .map(|_| {
            let len = rng.random_range(1..300);
            (0..len).map(|_| b"ACGT"[rng.random_range(0..4)]).collect()
        })
        .collect();

    let archive = Archive::create(&path)?;
    let seqs = archive.register_stream("sequences")?;
    let meta = archive.register_stream("meta")?;
    archive.add_part(meta, b"header", 0)?;
    archive.add_parts_parallel(seqs, &chunks, RunLength, 0)?;
    archive.add_part(meta, b"tail", 1)?;
    let raw: u64 = chunks.iter().map(|c| c.len() as u64).sum();
    archive.set_raw_size(seqs, raw)?;
    archive.close()?;

    let archive = Archive::load(&path)?;
    assert_eq!(archive.raw_size(seqs), raw);
    let parts = drain(&archive, seqs)?;
    assert_eq!(parts.len(), chunks.len());
    for ((packed, metadata), chunk) in parts.iter().zip(&chunks) {
        assert_eq!(*metadata, chunk.len() as u64);
        assert_eq!(&run_length_decode(packed), chunk);
    }
    assert_eq!(
        drain(&archive, meta)?,
        vec![(b"header".to_vec(), 0), (b"tail".to_vec(), 1)]
    );
    Ok(())
}

/// Rejects any chunk equal to `b"bad"`.
#[derive(Clone)]
struct Strict;
impl PartEncoder for Strict {
    fn encode(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> seqarc::Result<u64> {
        if chunk == b"bad" {
            let err = std::io::Error::new(std::io::ErrorKind::InvalidData, "codec");
            return Err(seqarc::IntoArcError::into_arc_error(err));
        }
        out.extend_from_slice(chunk);
        Ok(1)
    }
}

#[test]
fn failed_parallel_write_keeps_completed_parts_readable() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("recover.sarc");
    let chunks: Vec<&[u8]> = vec![b"a", b"bad", b"c", b"d"];

    {
        let archive = Archive::create(&path)?;
        let reads = archive.register_stream("reads")?;
        let other = archive.register_stream("other")?;
        archive.add_part(reads, b"good", 7)?;
        archive.add_part(other, b"side", 3)?;

        let err = archive
            .add_parts_parallel(reads, &chunks, Strict, 2)
            .expect_err("encoder rejects a chunk");
        let ArcError::PartsAbandoned { stream, parts, .. } = err else {
            panic!("expected abandoned parts");
        };
        assert_eq!(stream, reads);
        assert!(parts.contains(&2));
        assert!(parts.iter().all(|&p| (1..=4).contains(&p)));
        // dropped without an explicit close
    }

    let archive = Archive::load(&path)?;
    let reads = archive.stream_id("reads").expect("stream registered");
    let other = archive.stream_id("other").expect("stream registered");
    assert_eq!(archive.num_parts(reads), 5);
    let parts = drain(&archive, reads)?;
    assert_eq!(parts[0], (b"good".to_vec(), 7));
    assert_eq!(parts[2], (Vec::new(), 0));
    assert_eq!(drain(&archive, other)?, vec![(b"side".to_vec(), 3)]);
    Ok(())
}
