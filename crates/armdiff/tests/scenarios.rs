//! Concrete entries checked against hand-computed results.

use std::fs;

use armdiff::adapter::Adapter;
use armdiff::config::{HEAP_BASE, HEAP_POINTER_OFFSET, HEAP_REGION};
use armdiff::{Corpus, CorpusError, DifferentialRunner, RunOutcome};

mod support;

#[test]
fn test_ldr_reads_the_heap_word_at_r1() {
    let corpus = support::single(b"\x08\x68", "ldr r0, [r1]");
    let (mut reference, mut subject) = support::adapters();
    reference.load_code(&corpus.code()).unwrap();
    subject.load_code(&corpus.code()).unwrap();

    let input = support::template();
    let expected_r1 = (HEAP_BASE + HEAP_POINTER_OFFSET) as u32;
    for output in [
        support::step(&mut reference, &input, 6),
        support::step(&mut subject, &input, 6),
    ] {
        assert_eq!(output.register("r0"), Some(0x2b2a_2928));
        assert_eq!(output.register("r1"), Some(expected_r1));
        assert_eq!(output.pc(), input.pc() + 2);
        assert_eq!(output.region(HEAP_REGION), input.region(HEAP_REGION));
    }
}

#[test]
fn test_post_indexed_str_writes_then_bumps_r1() {
    let corpus = support::single(b"\x41\xf8\x04\x0b", "str r0, [r1], #0x4");
    let (mut reference, mut subject) = support::adapters();
    reference.load_code(&corpus.code()).unwrap();
    subject.load_code(&corpus.code()).unwrap();

    let input = support::template();
    let offset = HEAP_POINTER_OFFSET as usize;
    for output in [
        support::step(&mut reference, &input, 8),
        support::step(&mut subject, &input, 8),
    ] {
        let heap = output.region(HEAP_REGION).unwrap().bytes();
        assert_eq!(&heap[offset..offset + 4], &[0xef, 0xbe, 0xad, 0xde]);
        assert_eq!(heap[offset + 4], input.region(HEAP_REGION).unwrap().bytes()[offset + 4]);
        assert_eq!(
            output.register("r1"),
            Some((HEAP_BASE + HEAP_POINTER_OFFSET + 4) as u32)
        );
        assert_eq!(output.pc(), input.pc() + 4);
    }
}

#[test]
fn test_corpus_file_runs_like_a_builtin() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.txt");
    fs::write(
        &path,
        concat!(
            "# two notations\n",
            "08 68 | ldr r0, [r1]\n",
            "\n",
            "(b\"\\x41\\xf8\\x04\\x0b\", \"str r0, [r1], #0x4\"),\n",
        ),
    )
    .unwrap();

    let corpus = Corpus::from_file(&path).unwrap();
    assert_eq!(corpus.name(), "mixed");
    assert_eq!(corpus.len(), 2);
    assert_eq!(corpus.code(), vec![0x08, 0x68, 0x41, 0xf8, 0x04, 0x0b]);

    let (mut reference, mut subject) = support::adapters();
    let outcome = DifferentialRunner::new(&mut reference, &mut subject, support::template())
        .run(&corpus)
        .unwrap();
    let RunOutcome::AllPassed(stats) = outcome else {
        panic!("expected both entries to pass");
    };
    assert_eq!(stats.passed, 2);
}

#[test]
fn test_missing_corpus_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Corpus::from_file(&dir.path().join("absent.txt")).unwrap_err();
    assert!(matches!(err, CorpusError::Io { .. }));
}

#[test]
fn test_unknown_builtin() {
    let err = Corpus::builtin("thumb-vfp").unwrap_err();
    assert!(matches!(err, CorpusError::Unknown(name) if name == "thumb-vfp"));
}
