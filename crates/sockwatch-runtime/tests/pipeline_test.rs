//! End-to-end tests for the sampling pipeline.
//!
//! A fake procfs tree is collected through the sampler while recording, the
//! session is replayed through a second sampler, and both streams are
//! compared:
//! 1. Live collection over every family and the target's descriptors
//! 2. Recording through the sampler, including pauses and force refreshes
//! 3. Replay in order, then exhaustion
//! 4. Corrupted sessions rejected on open

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::fs;
use std::os::unix::fs::symlink;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc;

use sockwatch_common::config::{ErrorPolicy, MonitorConfig, ReplayPacing, SourceMode};
use sockwatch_common::error::SockwatchError;
use sockwatch_common::types::Protocol;
use sockwatch_runtime::sampler::{Sampler, TickOutcome};
use sockwatch_runtime::session::Player;
use sockwatch_runtime::snapshot::Sample;
use sockwatch_runtime::source::{SourceKind, build_source};

const TARGET_PID: u32 = 4242;

fn write_procfs(root: &Path) {
    let net = root.join("net");
    fs::create_dir_all(&net).unwrap();
    let inet_header = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode\n";
    fs::write(
        net.join("tcp"),
        format!(
            "{inet_header}\
             0: 0100007F:13AD 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 1001 1 0000000000000000 100 0 0 10 0\n\
             1: 0100007F:A2C4 0100007F:13AD 01 00000000:00000000 00:00000000 00000000  1000        0 1002 1 0000000000000000 20 4 30 10 -1\n"
        ),
    )
    .unwrap();
    fs::write(
        net.join("tcp6"),
        format!(
            "{inet_header}\
             0: 00000000000000000000000000000000:0016 00000000000000000000000000000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 1003 1\n"
        ),
    )
    .unwrap();
    fs::write(
        net.join("udp"),
        format!(
            "{inet_header}\
             0: 00000000:0044 00000000:0000 07 00000000:00000000 00:00000000 00000000     0        0 1004 2 0000000000000000 0\n"
        ),
    )
    .unwrap();
    fs::write(net.join("udp6"), inet_header).unwrap();
    fs::write(
        net.join("unix"),
        "Num       RefCount Protocol Flags    Type St Inode Path\n\
         0000000000000000: 00000002 00000000 00010000 0001 01 1005 /run/app.sock\n\
         0000000000000000: 00000003 00000000 00000000 0001 03 1006\n",
    )
    .unwrap();
    fs::write(
        net.join("netlink"),
        "sk               Eth Pid        Groups   Rmem     Wmem     Dump  Locks    Drops    Inode\n\
         0000000000000000 0   4242       00000111 0        0        0     2        0        1007\n",
    )
    .unwrap();

    let proc_dir = root.join(TARGET_PID.to_string());
    fs::create_dir_all(proc_dir.join("fd")).unwrap();
    fs::write(proc_dir.join("comm"), "app\n").unwrap();
    fs::write(proc_dir.join("cmdline"), b"app\0--serve\0").unwrap();
    for (fd, inode) in [(3, 1001), (4, 1005), (5, 1007)] {
        symlink(format!("socket:[{inode}]"), proc_dir.join("fd").join(fd.to_string())).unwrap();
    }
    symlink("/dev/null", proc_dir.join("fd").join("0")).unwrap();
}

fn config(root: &Path, mode: SourceMode) -> MonitorConfig {
    MonitorConfig {
        procfs_root: root.to_path_buf(),
        mode,
        ..MonitorConfig::default()
    }
}

fn delivered(outcome: TickOutcome) -> Arc<Sample> {
    match outcome {
        TickOutcome::Delivered(sample) => sample,
        other => panic!("expected a delivered sample, got {other:?}"),
    }
}

// ── Live collection ──────────────────────────────────────────────────

#[test]
fn live_sample_covers_every_family_and_the_target() {
    let dir = tempfile::tempdir().unwrap();
    write_procfs(dir.path());

    let source = build_source(&config(dir.path(), SourceMode::Live), Some(TARGET_PID)).unwrap();
    let sampler = Sampler::new(source, ErrorPolicy::Terminate);
    let sample = delivered(sampler.force_refresh().unwrap());

    let counts = sample.snapshot.connections.count_by_protocol();
    assert_eq!(counts[&Protocol::Tcp], 2);
    assert_eq!(counts[&Protocol::Tcp6], 1);
    assert_eq!(counts[&Protocol::Udp], 1);
    assert!(!counts.contains_key(&Protocol::Udp6));
    assert_eq!(counts[&Protocol::Unix], 2);
    assert_eq!(counts[&Protocol::Netlink], 1);

    let listener = sample.snapshot.connections.lookup(1001).unwrap();
    assert_eq!(listener.local.unwrap().to_string(), "127.0.0.1:5037");
    assert_eq!(listener.state_label(), "LISTEN");

    let target: Vec<u64> = sample
        .snapshot
        .target_connections()
        .iter()
        .map(|r| r.inode)
        .collect();
    assert_eq!(target, vec![1001, 1005, 1007]);
}

#[test]
fn malformed_table_fails_the_collection() {
    let dir = tempfile::tempdir().unwrap();
    write_procfs(dir.path());
    fs::write(dir.path().join("net").join("udp"), "header\n0: 00000000:0044\n").unwrap();

    let source = build_source(&config(dir.path(), SourceMode::Live), None).unwrap();
    let sampler = Sampler::new(source, ErrorPolicy::Terminate);
    let err = sampler.tick().unwrap_err();
    assert!(matches!(err, SockwatchError::MalformedLine { protocol: Protocol::Udp, .. }));
    assert!(sampler.latest().is_none());

    let source = build_source(&config(dir.path(), SourceMode::Live), None).unwrap();
    let lenient = Sampler::new(source, ErrorPolicy::SkipTick);
    assert_eq!(lenient.tick().unwrap(), TickOutcome::Skipped);
}

// ── Record and replay ────────────────────────────────────────────────

#[test]
fn recorded_session_replays_identically() {
    let dir = tempfile::tempdir().unwrap();
    write_procfs(dir.path());
    let session = dir.path().join("capture.swrec");

    let source = build_source(
        &config(dir.path(), SourceMode::Record(session.clone())),
        Some(TARGET_PID),
    )
    .unwrap();
    let recorder = Sampler::new(source, ErrorPolicy::Terminate);
    assert_eq!(recorder.source_kind(), SourceKind::Recording);
    let (tx, rx) = mpsc::channel::<Arc<Sample>>();
    recorder.register(tx);

    let _ = delivered(recorder.tick().unwrap());
    recorder.pause();
    assert_eq!(recorder.tick().unwrap(), TickOutcome::Paused);
    let _ = delivered(recorder.force_refresh().unwrap());
    recorder.resume();
    for _ in 0..3 {
        let _ = delivered(recorder.tick().unwrap());
    }
    recorder.finish().unwrap();
    let recorded: Vec<Sample> = rx.try_iter().map(|s| (*s).clone()).collect();
    assert_eq!(recorded.len(), 5);

    let player = Player::open(&session).unwrap();
    assert_eq!(player.len(), 5);
    assert_eq!(player.header().target_pid, Some(TARGET_PID));

    let mut replay_config = config(dir.path(), SourceMode::Replay(session));
    replay_config.pacing = ReplayPacing::PerTick;
    let replayer = Sampler::new(
        build_source(&replay_config, None).unwrap(),
        ErrorPolicy::Terminate,
    );
    let mut replayed = Vec::new();
    loop {
        match replayer.tick().unwrap() {
            TickOutcome::Delivered(sample) => replayed.push((*sample).clone()),
            TickOutcome::Exhausted => break,
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert_eq!(replayed, recorded);
    assert!(replayer.is_exhausted());
}

#[test]
fn unfinished_recording_is_rejected_on_replay() {
    let dir = tempfile::tempdir().unwrap();
    write_procfs(dir.path());
    let session = dir.path().join("cut.swrec");

    {
        let source =
            build_source(&config(dir.path(), SourceMode::Record(session.clone())), None).unwrap();
        let sampler = Sampler::new(source, ErrorPolicy::Terminate);
        let _ = delivered(sampler.tick().unwrap());
    }

    let err = Player::open(&session).unwrap_err();
    assert!(matches!(err, SockwatchError::InvalidSession { .. }));
}

#[test]
fn replay_of_missing_file_fails_at_startup() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.swrec");
    let result = build_source(&config(dir.path(), SourceMode::Replay(missing)), None);
    assert!(matches!(result, Err(SockwatchError::Io { .. })));
}
