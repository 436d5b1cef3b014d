use std::path::Path;

use crate::error::Error;
use crate::sim::SimBackend;
use crate::submit::{ComputePhase, ExecutionBackend, HostRegion, StageRequest};

#[test]
fn test_transfer_round_trip() {
    let backend = SimBackend::new();
    let dev = backend.alloc_device(8).unwrap();

    let input = HostRegion::new(8);
    input.fill_from(&[1, 2, 3]).unwrap();
    let output = HostRegion::new(8);

    let t_in = backend.submit(StageRequest::TransferIn { src: input, dst: dev }, &[]).unwrap();
    let t_out = backend
        .submit(StageRequest::TransferOut { src: dev, dst: output.clone() }, &[t_in])
        .unwrap();
    t_out.wait().unwrap();

    assert_eq!(output.read_prefix(8).unwrap(), vec![1, 2, 3, 0, 0, 0, 0, 0]);
}

#[test]
fn test_two_phase_pass_is_identity() {
    let backend = SimBackend::new();
    let input = backend.alloc_device(4).unwrap();
    let intermediate = backend.alloc_device(4).unwrap();
    let output = backend.alloc_device(4).unwrap();

    let host_in = HostRegion::new(4);
    host_in.fill_from(&[7, 8, 9, 10]).unwrap();
    let host_out = HostRegion::new(4);

    let t_in = backend.submit(StageRequest::TransferIn { src: host_in, dst: input }, &[]).unwrap();
    let p1 = backend
        .submit(
            StageRequest::Compute { phase: ComputePhase::Phase1, input, intermediate, output, row_size: 2 },
            &[t_in],
        )
        .unwrap();
    let p2 = backend
        .submit(
            StageRequest::Compute { phase: ComputePhase::Phase2, input, intermediate, output, row_size: 2 },
            &[p1],
        )
        .unwrap();
    let t_out = backend
        .submit(StageRequest::TransferOut { src: output, dst: host_out.clone() }, &[p2])
        .unwrap();
    t_out.wait().unwrap();

    assert_eq!(host_out.read_prefix(4).unwrap(), vec![7, 8, 9, 10]);
}

#[test]
fn test_unknown_buffer_fails_stage() {
    let backend = SimBackend::new();
    let dev = backend.alloc_device(4).unwrap();
    drop(backend);

    // A fresh backend has no knowledge of the old arena's ids.
    let backend = SimBackend::new();
    let host = HostRegion::new(4);
    let token = backend.submit(StageRequest::TransferOut { src: dev, dst: host }, &[]).unwrap();
    assert!(matches!(token.wait(), Err(Error::StageFailed { .. })));
}

#[test]
fn test_dependency_failure_propagates() {
    let backend = SimBackend::new();
    let missing = {
        let other = SimBackend::new();
        other.alloc_device(4).unwrap()
    };
    let host = HostRegion::new(4);

    let bad = backend.submit(StageRequest::TransferOut { src: missing, dst: host.clone() }, &[]).unwrap();
    let dependent = backend.submit(StageRequest::CoreLaunch { row_size: 4 }, &[bad]).unwrap();

    match dependent.wait() {
        Err(Error::StageFailed { reason }) => assert!(reason.contains("dependency failed")),
        other => panic!("expected StageFailed, got {other:?}"),
    }
}

#[test]
fn test_region_size_mismatch_fails_stage() {
    let backend = SimBackend::new();
    let dev = backend.alloc_device(8).unwrap();
    let short_host = HostRegion::new(4);

    let token = backend.submit(StageRequest::TransferIn { src: short_host, dst: dev }, &[]).unwrap();
    assert!(matches!(token.wait(), Err(Error::StageFailed { .. })));
}

#[test]
fn test_stream_produces_requested_words() {
    let backend = SimBackend::new();
    let out = backend.stream(&[0xdead_beef, 0x1234_5678], 48).unwrap();
    assert_eq!(out.len(), 48);
}

#[test]
fn test_load_program_records_path() {
    let backend = SimBackend::new();
    backend.load_program(Path::new("ntt.xclbin")).unwrap();
    assert!(format!("{backend:?}").contains("ntt.xclbin"));
}

#[test]
fn test_host_region_fill_rejects_overflow() {
    let region = HostRegion::new(2);
    assert!(matches!(region.fill_from(&[1, 2, 3]), Err(Error::RegionSize { expected: 2, actual: 3 })));
}

#[test]
fn test_host_region_fill_zeroes_tail() {
    let region = HostRegion::new(4);
    region.fill_from(&[9, 9, 9, 9]).unwrap();
    region.fill_from(&[5]).unwrap();
    assert_eq!(region.read_prefix(4).unwrap(), vec![5, 0, 0, 0]);
}
