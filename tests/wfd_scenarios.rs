//! End-to-end scenarios that cross module boundaries, grounded in the
//! teacher's own cross-module integration test (`tests/repro_sctp.rs`): one
//! test per named scenario, each driving the public API the way a real
//! caller would rather than reaching into private state.
use wfd::config::RetransmitMode;
use wfd::rtcp::generic_nack::GenericNack;
use wfd::rtp_session::Sender;
use wfd::rtp_session::seq_track::{SeqOutcome, SeqTracker};
use wfd::rtsp::{Message, SourceSession};
use wfd::ts::config::{FIRST_ES_PID, PID_PAT, PID_PMT, STREAM_TYPE_AAC_ADTS, STREAM_TYPE_H264, TS_PACKET_SIZE};
use wfd::ts::{Codec, TsPacketizer};
use wfd::ts::config::{EMIT_PAT_AND_PMT, EMIT_PCR};
use wfd::rtsp::wfd as wfd_params;

fn pid_of(packet: &[u8]) -> u16 {
    u16::from_be_bytes([packet[1] & 0x1F, packet[2]])
}

#[test]
fn s1_sequence_probation() {
    let (mut tracker, out) = SeqTracker::new(100);
    assert_eq!(out, SeqOutcome::Accept { extended_seq: 100 });

    let out = tracker.update_seq(101);
    assert_eq!(out, SeqOutcome::Accept { extended_seq: 101 });
    assert_eq!(tracker.received(), 1);

    let out = tracker.update_seq(102);
    assert_eq!(out, SeqOutcome::Accept { extended_seq: 102 });
    assert_eq!(tracker.received(), 2);
    assert_eq!(tracker.extended_max_seq(), 102);
}

#[test]
fn s2_sequence_wrap() {
    let (mut tracker, _) = SeqTracker::new(65534);
    tracker.update_seq(65535);
    assert_eq!(tracker.update_seq(0), SeqOutcome::Accept { extended_seq: 65536 });
    let out = tracker.update_seq(1);
    assert_eq!(out, SeqOutcome::Accept { extended_seq: 65537 });
    assert_eq!(tracker.extended_max_seq(), 65537);
}

#[test]
fn s3_large_forward_jump_then_resync() {
    let (mut tracker, _) = SeqTracker::new(99);
    tracker.update_seq(100);

    assert_eq!(tracker.update_seq(40000), SeqOutcome::Reject);
    assert_eq!(tracker.update_seq(40000), SeqOutcome::Reject);

    let out = tracker.update_seq(40001);
    assert_eq!(out, SeqOutcome::Accept { extended_seq: 40001 });
    assert_eq!(tracker.base_seq(), 40001);
}

#[test]
fn s4_ts_packetizer_pat_pmt_pcr() {
    let mut packetizer = TsPacketizer::new();
    let video = packetizer.add_track(Codec::H264, false).unwrap();
    let _audio = packetizer.add_track(Codec::AacAdts, false).unwrap();
    assert_eq!(packetizer.pid_for_track(video).unwrap(), FIRST_ES_PID);

    let au = vec![0x11u8; 3000];
    let ts_bytes = packetizer
        .packetize(video, &au, 9000, true, EMIT_PAT_AND_PMT | EMIT_PCR, None, None)
        .unwrap();

    assert_eq!(ts_bytes.len() % TS_PACKET_SIZE, 0);
    let packets: Vec<&[u8]> = ts_bytes.chunks(TS_PACKET_SIZE).collect();

    assert_eq!(pid_of(packets[0]), PID_PAT);
    assert_eq!(pid_of(packets[1]), PID_PMT);
    assert!(packets[1].iter().any(|&b| b == STREAM_TYPE_H264));
    assert!(packets[1].iter().any(|&b| b == STREAM_TYPE_AAC_ADTS));

    assert_eq!(pid_of(packets[2]), FIRST_ES_PID);
    assert_eq!(packets[2][1] & 0x40, 0x40, "PUSI set on first ES packet");
    for p in &packets[3..] {
        assert_eq!(pid_of(p), FIRST_ES_PID);
        assert_eq!(p[1] & 0x40, 0, "PUSI clear on continuation packets");
    }
    assert_eq!(packets.last().unwrap().len(), TS_PACKET_SIZE);
}

#[test]
fn s5_rtp_packing_splits_burst_with_shared_timestamp() {
    let mut sender = Sender::new(0xdead_beef, 33, RetransmitMode::SameChannel);
    let burst = vec![0x47u8; 10 * TS_PACKET_SIZE]; // 1880 bytes
    let packets = sender.send_ts_burst(&burst).unwrap();

    assert_eq!(packets.len(), 2);
    assert_eq!(packets[0].payload.len(), 7 * TS_PACKET_SIZE); // 12 + 7*188 = 1328 on the wire
    assert_eq!(packets[1].payload.len(), 3 * TS_PACKET_SIZE);
    assert_eq!(packets[1].header.sequence_number, packets[0].header.sequence_number + 1);
    assert_eq!(packets[0].header.timestamp, packets[1].header.timestamp);
}

#[test]
fn s6_nack_to_retransmit_in_order_then_unknown_seq_is_a_noop() {
    let mut sender = Sender::new(0xdead_beef, 33, RetransmitMode::SameChannel);
    for i in 0..10u32 {
        sender.package(1000 + i, false, vec![i as u8]).unwrap();
    }

    let nack = GenericNack::new(0x1234, 0xdead_beef, vec![(3, 0b0000_0000_0000_0110)]);
    let resolved = sender.handle_nack(&nack);
    let seqs: Vec<u16> = resolved.iter().map(|(s, _, _)| *s).collect();
    assert_eq!(seqs, vec![3, 5, 6]);

    let far_nack = GenericNack::new(0x1234, 0xdead_beef, vec![(200, 0)]);
    assert!(sender.handle_nack(&far_nack).is_empty());
}

#[test]
fn s7_rtsp_m_sequence_drives_source_to_awaiting_play() {
    let mut source = SourceSession::new("rtsp://localhost/wfd1.0");

    let m1 = source.start();
    let mut m1_resp = Message::response(200, "OK");
    m1_resp.set_header("CSeq", m1.find_i32("cseq").unwrap().to_string());
    let m3 = source.on_response(&m1_resp).unwrap().unwrap();
    assert_eq!(m3.method(), Some("GET_PARAMETER"));

    let mut m3_resp = Message::response(200, "OK");
    m3_resp.set_header("CSeq", m3.find_i32("cseq").unwrap().to_string());
    m3_resp.set_body(
        wfd_params::build_parameters(&[(
            wfd_params::WFD_CLIENT_RTP_PORTS,
            wfd_params::format_client_rtp_ports(19000),
        )])
        .into_bytes(),
    );
    let m4 = source.on_response(&m3_resp).unwrap().unwrap();
    assert_eq!(m4.method(), Some("SET_PARAMETER"));

    let mut m4_resp = Message::response(200, "OK");
    m4_resp.set_header("CSeq", m4.find_i32("cseq").unwrap().to_string());
    assert!(source.on_response(&m4_resp).unwrap().is_none());

    let mut m6 = Message::request("SETUP", "rtsp://localhost/wfd1.0/video");
    m6.set_header("CSeq", "5");
    m6.set_header("Transport", "RTP/AVP/UDP;unicast;client_port=19000-19001");
    let setup_resp = source.on_request(&m6).unwrap();

    assert_eq!(setup_resp.get_status_code(), Some(200));
    assert!(setup_resp.find_string("session").is_some());
    assert!(source.server_ports.is_some());
}
